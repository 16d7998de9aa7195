//! PCF AM Policy Control Consumer

use crate::consumer::{PcfAmPolicyClient, SbiReply};
use crate::context::{EtafContext, UeRef};
use crate::error::{ConsumerError, ConsumerResult};
use crate::models::{AccessType, NfType, PolicyAssociationRequest, RequestTrigger};

/// Create the UE's AM policy association
///
/// On success the association, its resource URI and ID (last path segment
/// of the URI) and the location change trigger flag are stored on the UE.
pub async fn am_policy_control_create<C: PcfAmPolicyClient>(
    client: &C,
    ctx: &EtafContext,
    ue: &UeRef,
    an_type: AccessType,
) -> ConsumerResult {
    let guami = ctx.config().served_guami_list.first().cloned();
    let (pcf_uri, request) = {
        let ue = ue.read();
        let pcf_uri = ue
            .pcf_uri
            .clone()
            .ok_or(ConsumerError::NoInstance(NfType::Pcf))?;
        let supi = ue.supi.clone().ok_or(ConsumerError::NoSupi)?;
        let request = PolicyAssociationRequest {
            notification_uri: format!("{}/netaf-callback/v1/am-policy/", ctx.ipv4_uri()),
            supi,
            gpsi: ue.gpsi.clone(),
            access_type: Some(an_type),
            pei: ue.pei.clone(),
            user_loc: Some(ue.location.clone()),
            serving_plmn: Some(ue.plmn_id.clone()),
            rat_type: ue.rat_type,
            guami,
            supp_feat: String::new(),
        };
        (pcf_uri, request)
    };

    match client.create(&pcf_uri, &request).await? {
        SbiReply::Success(created) => {
            let mut ue = ue.write();
            let association_id = created
                .location
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();
            ue.request_trigger_location_change = created
                .association
                .triggers
                .contains(&RequestTrigger::LocCh);
            ue.policy_association_id = Some(association_id);
            ue.am_policy_uri = Some(created.location);
            ue.am_policy_association = Some(created.association);
            log::debug!(
                "[{}] AM policy association created ({})",
                ue.log_id(),
                ue.am_policy_uri.as_deref().unwrap_or_default()
            );
            Ok(None)
        }
        SbiReply::Problem(problem) => {
            log::warn!(
                "[{}] AM policy association create rejected ({})",
                request.supi,
                problem.status
            );
            Ok(Some(problem))
        }
    }
}

/// Delete the UE's AM policy association; drops it locally on success
pub async fn am_policy_control_delete<C: PcfAmPolicyClient>(
    client: &C,
    ue: &UeRef,
) -> ConsumerResult {
    let (pcf_uri, association_id) = {
        let ue = ue.read();
        let pcf_uri = ue
            .pcf_uri
            .clone()
            .ok_or(ConsumerError::NoInstance(NfType::Pcf))?;
        let association_id = match ue.policy_association_id.clone() {
            Some(id) => id,
            None => {
                log::debug!("[{}] No AM policy association to delete", ue.log_id());
                return Ok(None);
            }
        };
        (pcf_uri, association_id)
    };

    match client.delete(&pcf_uri, &association_id).await? {
        SbiReply::Success(()) => {
            ue.write().remove_am_policy_association();
            Ok(None)
        }
        SbiReply::Problem(problem) => Ok(Some(problem)),
    }
}

//! UE Context Transfer
//!
//! Folding a UE context received from a peer instance into a local UE, and
//! building the outbound transfer payloads.
//!
//! The merge is additive: an absent, empty or zero field in the payload
//! leaves the local value alone. A UE security capability that fails to
//! decode aborts the merge; fields merged before it stay applied.

use crate::error::ContextResult;
use crate::models::{
    AccessAndMobilitySubscriptionData, AccessType, AllowedSnssai, AmPolicyReqTrigger,
    N2InfoContent, N2SmInformation, NgApCause, NgRanTargetId, PolicyAssociation, RefToBinaryData,
    RequestTrigger, UeContext, UeContextCreateData,
};
use crate::security::{ciphering_algorithm_code, integrity_algorithm_code, NasCount, UeSecurityCapability};
use crate::ue::{EtafUe, SmContext};

// ============================================================================
// Policy Trigger Tables
// ============================================================================

/// Transfer-payload trigger to policy-association trigger
pub const AM_POLICY_TRIGGER_TABLE: [(AmPolicyReqTrigger, RequestTrigger); 4] = [
    (AmPolicyReqTrigger::LocationChange, RequestTrigger::LocCh),
    (AmPolicyReqTrigger::PraChange, RequestTrigger::PraCh),
    (AmPolicyReqTrigger::SariChange, RequestTrigger::ServAreaCh),
    (AmPolicyReqTrigger::RfspIndexChange, RequestTrigger::RfspCh),
];

/// Local equivalent of a transfer-payload trigger; unmapped triggers yield `None`
pub fn request_trigger_from_am_policy(trigger: AmPolicyReqTrigger) -> Option<RequestTrigger> {
    AM_POLICY_TRIGGER_TABLE
        .iter()
        .find(|(am, _)| *am == trigger)
        .map(|(_, local)| *local)
}

/// Transfer-payload equivalent of a local trigger
pub fn am_policy_trigger_from_request(trigger: RequestTrigger) -> Option<AmPolicyReqTrigger> {
    AM_POLICY_TRIGGER_TABLE
        .iter()
        .find(|(_, local)| *local == trigger)
        .map(|(am, _)| *am)
}

fn am_data(ue: &mut EtafUe) -> &mut AccessAndMobilitySubscriptionData {
    ue.access_and_mobility_subscription_data
        .get_or_insert_with(Default::default)
}

// ============================================================================
// Inbound Merge
// ============================================================================

/// Merge a peer's UE context into `ue`
///
/// A SUPI is only taken over when the UE has none yet (or the same one);
/// indexing the registry under a newly learned SUPI is the caller's job.
pub fn merge_from_ue_context_model(ue: &mut EtafUe, model: &UeContext) -> ContextResult<()> {
    if !model.supi.is_empty() {
        match ue.supi.as_deref() {
            Some(local) if local != model.supi => log::warn!(
                "[{}] Ignoring SUPI [{}] from peer context",
                local,
                model.supi
            ),
            _ => {
                ue.supi = Some(model.supi.clone());
                ue.unauthenticated_supi = model.supi_unauth_ind;
            }
        }
    }
    if !model.pei.is_empty() {
        ue.pei = Some(model.pei.clone());
    }
    if !model.udm_group_id.is_empty() {
        ue.udm_group_id = Some(model.udm_group_id.clone());
    }
    if !model.ausf_group_id.is_empty() {
        ue.ausf_group_id = Some(model.ausf_group_id.clone());
    }
    if !model.routing_indicator.is_empty() {
        ue.routing_indicator = Some(model.routing_indicator.clone());
    }

    // Access and mobility subscription
    if let Some(ambr) = &model.sub_ue_ambr {
        am_data(ue).subscribed_ue_ambr = Some(ambr.clone());
    }
    if model.sub_rfsp != 0 {
        am_data(ue).rfsp_index = model.sub_rfsp;
    }
    if !model.restricted_rat_list.is_empty() {
        am_data(ue).rat_restrictions = model.restricted_rat_list.clone();
    }
    if !model.forbidden_area_list.is_empty() {
        am_data(ue).forbidden_areas = model.forbidden_area_list.clone();
    }
    if let Some(restriction) = &model.service_area_restriction {
        am_data(ue).service_area_restriction = Some(restriction.clone());
    }

    // Policy
    if !model.pcf_id.is_empty() {
        ue.pcf_id = Some(model.pcf_id.clone());
    }
    if !model.pcf_am_policy_uri.is_empty() {
        ue.am_policy_uri = Some(model.pcf_am_policy_uri.clone());
    }
    if !model.am_policy_req_trigger_list.is_empty() {
        let association = ue
            .am_policy_association
            .get_or_insert_with(PolicyAssociation::default);
        association.triggers.extend(
            model
                .am_policy_req_trigger_list
                .iter()
                .filter_map(|t| request_trigger_from_am_policy(*t)),
        );
    }

    // Sessions
    for pdu_session_context in &model.session_context_list {
        ue.store_sm_context(SmContext::new(pdu_session_context.clone()));
    }

    // Mobility management contexts
    for mm_context in &model.mm_context_list {
        if mm_context.access_type == AccessType::ThreeGppAccess {
            if let Some(mode) = &mm_context.nas_security_mode {
                ue.security.integrity_alg = integrity_algorithm_code(mode.integrity_algorithm);
                ue.security.ciphering_alg = ciphering_algorithm_code(mode.ciphering_algorithm);

                if mm_context.nas_downlink_count != 0 {
                    ue.security.dl_count = NasCount::from_packed(mm_context.nas_downlink_count as u32);
                }
                if mm_context.nas_uplink_count != 0 {
                    ue.security.ul_count = NasCount::from_packed(mm_context.nas_uplink_count as u32);
                }

                if !mm_context.ue_security_capability.is_empty() {
                    let capability =
                        match UeSecurityCapability::from_base64(&mm_context.ue_security_capability) {
                            Ok(capability) => capability,
                            Err(e) => {
                                log::error!(
                                    "[{}] UE security capability decode failed: {}",
                                    ue.log_id(),
                                    e
                                );
                                return Err(e.into());
                            }
                        };
                    ue.security.ue_security_capability = capability;
                }
            }
        }

        ue.allowed_nssai[mm_context.access_type].extend(mm_context.allowed_nssai.iter().map(
            |snssai| AllowedSnssai {
                allowed_snssai: snssai.clone(),
                ..Default::default()
            },
        ));
    }

    if let Some(trace_data) = &model.trace_data {
        ue.trace_data = Some(trace_data.clone());
    }

    log::debug!("[{}] UE context merged from transfer payload", ue.log_id());
    Ok(())
}

// ============================================================================
// Outbound Payloads
// ============================================================================

/// Build the transfer payload describing `ue`
pub fn build_ue_context_model(ue: &EtafUe) -> UeContext {
    let mut model = UeContext {
        supi: ue.supi.clone().unwrap_or_default(),
        supi_unauth_ind: ue.unauthenticated_supi,
        gpsi_list: ue.gpsi.iter().cloned().collect(),
        pei: ue.pei.clone().unwrap_or_default(),
        udm_group_id: ue.udm_group_id.clone().unwrap_or_default(),
        ausf_group_id: ue.ausf_group_id.clone().unwrap_or_default(),
        routing_indicator: ue.routing_indicator.clone().unwrap_or_default(),
        pcf_id: ue.pcf_id.clone().unwrap_or_default(),
        pcf_am_policy_uri: ue.am_policy_uri.clone().unwrap_or_default(),
        trace_data: ue.trace_data.clone(),
        ..Default::default()
    };

    if let Some(data) = &ue.access_and_mobility_subscription_data {
        model.sub_ue_ambr = data.subscribed_ue_ambr.clone();
        model.sub_rfsp = data.rfsp_index;
    }

    if let Some(association) = &ue.am_policy_association {
        model.am_policy_req_trigger_list = association
            .triggers
            .iter()
            .filter_map(|t| am_policy_trigger_from_request(*t))
            .collect();
    }

    model
}

/// Build the UE context create request for a handover towards a peer
pub fn build_ue_context_create_data(
    ue: &EtafUe,
    target_id: NgRanTargetId,
    source_to_target_data: N2InfoContent,
    pdu_session_list: Vec<N2SmInformation>,
    n2_notify_uri: &str,
    ngap_cause: Option<NgApCause>,
) -> UeContextCreateData {
    UeContextCreateData {
        ue_context: build_ue_context_model(ue),
        target_id,
        source_to_target_data,
        pdu_session_list,
        n2_notify_uri: n2_notify_uri.to_string(),
        ue_radio_capability: ue
            .ue_radio_capability
            .as_ref()
            .filter(|capability| !capability.is_empty())
            .map(|capability| N2InfoContent {
                ngap_message_type: None,
                ngap_data: RefToBinaryData {
                    content_id: capability.clone(),
                },
            }),
        ngap_cause,
        supported_features: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContextError;
    use crate::models::{
        Ambr, CipheringAlgorithm, IntegrityAlgorithm, MmContext, NasSecurityMode,
        PduSessionContext, Snssai, TraceData,
    };
    use crate::security::{ALG_CIPHERING_128_NEA2, ALG_INTEGRITY_128_NIA2};

    fn mm_context(access_type: AccessType) -> MmContext {
        MmContext {
            access_type,
            nas_security_mode: Some(NasSecurityMode {
                integrity_algorithm: IntegrityAlgorithm::Nia2,
                ciphering_algorithm: CipheringAlgorithm::Nea2,
            }),
            nas_downlink_count: 0x0001_0203,
            nas_uplink_count: 0,
            ue_security_capability: "4ADgAA==".to_string(),
            allowed_nssai: vec![Snssai::new(1, Some("010203"))],
        }
    }

    fn session(id: i32, dnn: &str) -> PduSessionContext {
        PduSessionContext {
            pdu_session_id: id,
            sm_context_ref: format!("urn:uuid:{}", id),
            s_nssai: Snssai::new(1, None),
            dnn: dnn.to_string(),
            access_type: AccessType::ThreeGppAccess,
            hsmf_id: None,
            vsmf_id: None,
            ns_instance: None,
        }
    }

    #[test]
    fn test_merge_location_change_trigger_creates_association() {
        let mut ue = EtafUe::new();
        let model = UeContext {
            am_policy_req_trigger_list: vec![AmPolicyReqTrigger::LocationChange],
            ..Default::default()
        };

        merge_from_ue_context_model(&mut ue, &model).unwrap();
        let association = ue.am_policy_association.unwrap();
        assert_eq!(association.triggers, vec![RequestTrigger::LocCh]);
    }

    #[test]
    fn test_merge_drops_unmapped_trigger() {
        let mut ue = EtafUe::new();
        let model = UeContext {
            am_policy_req_trigger_list: vec![
                AmPolicyReqTrigger::AllowedNssaiChange,
                AmPolicyReqTrigger::SariChange,
            ],
            ..Default::default()
        };
        merge_from_ue_context_model(&mut ue, &model).unwrap();
        assert_eq!(
            ue.am_policy_association.unwrap().triggers,
            vec![RequestTrigger::ServAreaCh]
        );
    }

    #[test]
    fn test_merge_absent_fields_keep_local_values() {
        let mut ue = EtafUe::new();
        ue.pei = Some("imeisv-1".to_string());
        ue.pcf_id = Some("pcf-1".to_string());
        ue.supi = Some("imsi-001010000000001".to_string());
        ue.unauthenticated_supi = false;

        merge_from_ue_context_model(&mut ue, &UeContext::default()).unwrap();
        assert_eq!(ue.pei.as_deref(), Some("imeisv-1"));
        assert_eq!(ue.pcf_id.as_deref(), Some("pcf-1"));
        assert_eq!(ue.supi.as_deref(), Some("imsi-001010000000001"));
        assert!(!ue.unauthenticated_supi);
        assert!(ue.access_and_mobility_subscription_data.is_none());
        assert!(ue.am_policy_association.is_none());
    }

    #[test]
    fn test_merge_present_fields_overwrite() {
        let mut ue = EtafUe::new();
        ue.pei = Some("imeisv-1".to_string());
        let model = UeContext {
            supi: "imsi-001010000000002".to_string(),
            supi_unauth_ind: false,
            pei: "imeisv-2".to_string(),
            routing_indicator: "0000".to_string(),
            sub_ue_ambr: Some(Ambr {
                uplink: "1 Gbps".to_string(),
                downlink: "2 Gbps".to_string(),
            }),
            sub_rfsp: 3,
            pcf_am_policy_uri: "http://pcf/npcf-am-policy-control/v1/policies/1".to_string(),
            trace_data: Some(TraceData::default()),
            ..Default::default()
        };

        merge_from_ue_context_model(&mut ue, &model).unwrap();
        assert_eq!(ue.supi.as_deref(), Some("imsi-001010000000002"));
        assert!(!ue.unauthenticated_supi);
        assert_eq!(ue.pei.as_deref(), Some("imeisv-2"));
        assert_eq!(ue.routing_indicator.as_deref(), Some("0000"));
        let data = ue.access_and_mobility_subscription_data.as_ref().unwrap();
        assert_eq!(data.rfsp_index, 3);
        assert_eq!(data.subscribed_ue_ambr.as_ref().unwrap().downlink, "2 Gbps");
        assert!(ue.am_policy_uri.is_some());
        assert!(ue.trace_data.is_some());
    }

    #[test]
    fn test_merge_keeps_conflicting_local_supi() {
        let mut ue = EtafUe::new();
        ue.supi = Some("imsi-001010000000001".to_string());
        ue.unauthenticated_supi = false;
        let model = UeContext {
            supi: "imsi-001010000000002".to_string(),
            supi_unauth_ind: true,
            pei: "imeisv-2".to_string(),
            ..Default::default()
        };

        merge_from_ue_context_model(&mut ue, &model).unwrap();
        assert_eq!(ue.supi.as_deref(), Some("imsi-001010000000001"));
        assert!(!ue.unauthenticated_supi);
        assert_eq!(ue.pei.as_deref(), Some("imeisv-2"));
    }

    #[test]
    fn test_merge_sessions_replace_by_id() {
        let mut ue = EtafUe::new();
        ue.store_sm_context(SmContext::new(session(5, "old")));
        let model = UeContext {
            session_context_list: vec![session(5, "internet"), session(6, "ims")],
            ..Default::default()
        };

        merge_from_ue_context_model(&mut ue, &model).unwrap();
        assert_eq!(ue.sm_context_list.len(), 2);
        assert_eq!(
            ue.sm_context_find_by_pdu_session_id(5)
                .unwrap()
                .pdu_session_context
                .dnn,
            "internet"
        );
    }

    #[test]
    fn test_merge_3gpp_security_mode() {
        let mut ue = EtafUe::new();
        let model = UeContext {
            mm_context_list: vec![mm_context(AccessType::ThreeGppAccess)],
            ..Default::default()
        };

        merge_from_ue_context_model(&mut ue, &model).unwrap();
        assert_eq!(ue.security.integrity_alg, ALG_INTEGRITY_128_NIA2);
        assert_eq!(ue.security.ciphering_alg, ALG_CIPHERING_128_NEA2);
        assert_eq!(ue.security.dl_count.overflow, 0x0102);
        assert_eq!(ue.security.dl_count.sqn, 0x03);
        // Zero count leaves the local value
        assert_eq!(ue.security.ul_count, NasCount::default());
        assert_eq!(ue.security.ue_security_capability.buffer, vec![0xe0, 0x00, 0xe0, 0x00]);
        assert_eq!(ue.allowed_nssai[AccessType::ThreeGppAccess].len(), 1);
    }

    #[test]
    fn test_merge_non_3gpp_only_takes_allowed_nssai() {
        let mut ue = EtafUe::new();
        let model = UeContext {
            mm_context_list: vec![mm_context(AccessType::NonThreeGppAccess)],
            ..Default::default()
        };

        merge_from_ue_context_model(&mut ue, &model).unwrap();
        assert_eq!(ue.security.integrity_alg, 0);
        assert!(ue.security.ue_security_capability.is_empty());
        assert_eq!(ue.allowed_nssai[AccessType::NonThreeGppAccess].len(), 1);
        assert!(ue.allowed_nssai[AccessType::ThreeGppAccess].is_empty());
    }

    #[test]
    fn test_merge_bad_capability_leaves_partial_merge() {
        let mut ue = EtafUe::new();
        let mut bad = mm_context(AccessType::ThreeGppAccess);
        bad.ue_security_capability = "not base64!".to_string();
        let model = UeContext {
            pei: "imeisv-2".to_string(),
            mm_context_list: vec![bad],
            trace_data: Some(TraceData::default()),
            ..Default::default()
        };

        let err = merge_from_ue_context_model(&mut ue, &model).unwrap_err();
        assert!(matches!(err, ContextError::SecurityCapabilityDecode(_)));
        // Applied before the failure
        assert_eq!(ue.pei.as_deref(), Some("imeisv-2"));
        assert_eq!(ue.security.integrity_alg, ALG_INTEGRITY_128_NIA2);
        // Not reached
        assert!(ue.allowed_nssai[AccessType::ThreeGppAccess].is_empty());
        assert!(ue.trace_data.is_none());
    }

    #[test]
    fn test_build_ue_context_model() {
        let mut ue = EtafUe::new();
        ue.supi = Some("imsi-001010000000001".to_string());
        ue.unauthenticated_supi = false;
        ue.gpsi = Some("msisdn-0900000000".to_string());
        ue.access_and_mobility_subscription_data = Some(AccessAndMobilitySubscriptionData {
            rfsp_index: 7,
            ..Default::default()
        });
        ue.am_policy_association = Some(PolicyAssociation {
            triggers: vec![RequestTrigger::LocCh, RequestTrigger::UeAmbrCh],
            ..Default::default()
        });

        let model = build_ue_context_model(&ue);
        assert_eq!(model.supi, "imsi-001010000000001");
        assert!(!model.supi_unauth_ind);
        assert_eq!(model.gpsi_list, vec!["msisdn-0900000000".to_string()]);
        assert!(model.pei.is_empty());
        assert_eq!(model.sub_rfsp, 7);
        assert_eq!(
            model.am_policy_req_trigger_list,
            vec![AmPolicyReqTrigger::LocationChange]
        );
    }

    #[test]
    fn test_build_then_merge_preserves_triggers() {
        let mut source = EtafUe::new();
        source.am_policy_association = Some(PolicyAssociation {
            triggers: vec![RequestTrigger::PraCh, RequestTrigger::RfspCh],
            ..Default::default()
        });
        let mut target = EtafUe::new();
        merge_from_ue_context_model(&mut target, &build_ue_context_model(&source)).unwrap();
        assert_eq!(
            target.am_policy_association.unwrap().triggers,
            vec![RequestTrigger::PraCh, RequestTrigger::RfspCh]
        );
    }

    #[test]
    fn test_build_ue_context_create_data() {
        let mut ue = EtafUe::new();
        ue.ue_radio_capability = Some("radio-cap".to_string());
        let cause = NgApCause { group: 0, value: 16 };

        let data = build_ue_context_create_data(
            &ue,
            NgRanTargetId::default(),
            N2InfoContent::default(),
            Vec::new(),
            "http://etaf/notify",
            Some(cause),
        );
        assert_eq!(data.n2_notify_uri, "http://etaf/notify");
        assert_eq!(
            data.ue_radio_capability.unwrap().ngap_data.content_id,
            "radio-cap"
        );
        assert_eq!(data.ngap_cause, Some(cause));

        ue.ue_radio_capability = None;
        let data = build_ue_context_create_data(
            &ue,
            NgRanTargetId::default(),
            N2InfoContent::default(),
            Vec::new(),
            "",
            None,
        );
        assert!(data.ue_radio_capability.is_none());
    }

    #[test]
    fn test_trigger_tables_invert() {
        for (am, local) in AM_POLICY_TRIGGER_TABLE {
            assert_eq!(request_trigger_from_am_policy(am), Some(local));
            assert_eq!(am_policy_trigger_from_request(local), Some(am));
        }
        assert_eq!(am_policy_trigger_from_request(RequestTrigger::SmfSelectCh), None);
    }
}

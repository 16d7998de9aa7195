//! OAM Registered UE Context Query

use serde::{Deserialize, Serialize};

use crate::context::{EtafContext, UeRef};
use crate::models::{AccessType, CmState, ProblemDetails};
use crate::ue::SmContext;

/// PDU session summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PduSessionInfo {
    pub pdu_session_id: String,
    pub sm_context_ref: String,
    pub sst: String,
    pub sd: String,
    pub dnn: String,
}

/// One registered access of a UE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UeContextInfo {
    pub access_type: AccessType,
    pub supi: String,
    pub guti: String,
    pub mcc: String,
    pub mnc: String,
    pub tac: String,
    pub pdu_sessions: Vec<PduSessionInfo>,
    pub cm_state: CmState,
}

fn build_ue_context_info(ue: &UeRef, an_type: AccessType) -> Option<UeContextInfo> {
    let ue = ue.read();
    if !ue.is_registered(an_type) {
        return None;
    }

    let mut sm_contexts: Vec<&SmContext> = ue
        .sm_context_list
        .values()
        .filter(|sm_context| sm_context.access_type() == an_type)
        .collect();
    sm_contexts.sort_by_key(|sm_context| sm_context.pdu_session_id());

    let pdu_sessions: Vec<PduSessionInfo> = sm_contexts
        .into_iter()
        .map(|sm_context| {
            let ctx = &sm_context.pdu_session_context;
            PduSessionInfo {
                pdu_session_id: ctx.pdu_session_id.to_string(),
                sm_context_ref: ctx.sm_context_ref.clone(),
                sst: ctx.s_nssai.sst.to_string(),
                sd: ctx.s_nssai.sd.clone().unwrap_or_default(),
                dnn: ctx.dnn.clone(),
            }
        })
        .collect();

    Some(UeContextInfo {
        access_type: an_type,
        supi: ue.supi.clone().unwrap_or_default(),
        guti: ue.guti.clone(),
        mcc: ue.tai.plmn_id.mcc.clone(),
        mnc: ue.tai.plmn_id.mnc.clone(),
        tac: ue.tai.tac.clone(),
        pdu_sessions,
        cm_state: if ue.cm_connect(an_type) {
            CmState::Connected
        } else {
            CmState::Idle
        },
    })
}

fn ue_context_infos(ue: &UeRef) -> impl Iterator<Item = UeContextInfo> + '_ {
    AccessType::ALL
        .into_iter()
        .filter_map(move |an_type| build_ue_context_info(ue, an_type))
}

/// Registered UE contexts, all of them or only the one with `supi`
///
/// An unknown SUPI yields a 404 problem with cause `CONTEXT_NOT_FOUND`.
pub fn registered_ue_contexts(
    ctx: &EtafContext,
    supi: Option<&str>,
) -> Result<Vec<UeContextInfo>, ProblemDetails> {
    log::info!("[OAM] Handle Registered UE Context");

    match supi.filter(|s| !s.is_empty()) {
        Some(supi) => {
            let ue = ctx
                .etaf_ue_find_by_supi(supi)
                .ok_or_else(|| ProblemDetails::new(404, "CONTEXT_NOT_FOUND"))?;
            Ok(ue_context_infos(&ue).collect())
        }
        None => Ok(ctx
            .etaf_ue_list()
            .iter()
            .flat_map(ue_context_infos)
            .collect()),
    }
}

//! ETAF UE Context
//!
//! Per-terminal aggregate: identities, location, per-access-type GMM state and
//! RAN UE link, session contexts, subscription and policy snapshots pulled
//! from sibling NFs, NAS security context and procedure timers.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::context::{RanUeRef, UeRef};
use crate::error::{ContextError, ContextResult};
use crate::gmm_sm::{GmmEvent, GmmFsm, GmmFsmResult, GmmState};
use crate::models::{
    AccessAndMobilitySubscriptionData, AccessType, AllowedSnssai, CmInfo, CmState, NfProfile,
    NgApCause, NsiInformation, PduSessionContext, PlmnId, PolicyAssociation, RatType,
    SmfSelectionSubscriptionData, Snssai, SubscribedSnssai, Tai, TraceData, UeContextInSmfData,
    UserLocation,
};
use crate::security::{NasCount, UeSecurityCapability, NAS_KSI_NO_KEY_IS_AVAILABLE};
use crate::timer::UeTimers;

// ============================================================================
// Per-Access-Type Storage
// ============================================================================

/// One value per access type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessMap<T> {
    three_gpp: T,
    non_three_gpp: T,
}

impl<T> AccessMap<T> {
    pub fn new(three_gpp: T, non_three_gpp: T) -> Self {
        Self {
            three_gpp,
            non_three_gpp,
        }
    }

    pub fn get(&self, an_type: AccessType) -> &T {
        match an_type {
            AccessType::ThreeGppAccess => &self.three_gpp,
            AccessType::NonThreeGppAccess => &self.non_three_gpp,
        }
    }

    pub fn get_mut(&mut self, an_type: AccessType) -> &mut T {
        match an_type {
            AccessType::ThreeGppAccess => &mut self.three_gpp,
            AccessType::NonThreeGppAccess => &mut self.non_three_gpp,
        }
    }

    /// Iterate in 3GPP, non-3GPP order
    pub fn iter(&self) -> impl Iterator<Item = (AccessType, &T)> {
        AccessType::ALL.into_iter().map(move |an| (an, self.get(an)))
    }
}

impl<T> Index<AccessType> for AccessMap<T> {
    type Output = T;

    fn index(&self, an_type: AccessType) -> &T {
        self.get(an_type)
    }
}

impl<T> IndexMut<AccessType> for AccessMap<T> {
    fn index_mut(&mut self, an_type: AccessType) -> &mut T {
        self.get_mut(an_type)
    }
}

// ============================================================================
// UE Sub-Structures
// ============================================================================

/// Procedure in progress on one access type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnGoingProcedure {
    #[default]
    Nothing,
    Paging,
    N2Handover,
    Registration,
    Deregistration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OnGoing {
    pub procedure: OnGoingProcedure,
    /// Paging policy indicator
    pub ppi: i32,
}

/// NAS key set identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NgKsi {
    /// Type of security context flag
    pub tsc: u8,
    pub ksi: u8,
}

impl Default for NgKsi {
    fn default() -> Self {
        Self {
            tsc: 0,
            ksi: NAS_KSI_NO_KEY_IS_AVAILABLE,
        }
    }
}

/// NAS security context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NasSecurityContext {
    /// A security context has been established
    pub security_context_available: bool,
    /// Last integrity check failed
    pub mac_failed: bool,
    pub ng_ksi: NgKsi,
    pub ue_security_capability: UeSecurityCapability,
    pub abba: Vec<u8>,
    pub kseaf: Vec<u8>,
    pub ketaf: Vec<u8>,
    pub knas_int: Vec<u8>,
    pub knas_enc: Vec<u8>,
    pub kgnb: Vec<u8>,
    pub kn3iwf: Vec<u8>,
    pub nh: Vec<u8>,
    /// Next hop chaining counter
    pub ncc: u8,
    pub ul_count: NasCount,
    pub dl_count: NasCount,
    pub ciphering_alg: u8,
    pub integrity_alg: u8,
}

/// Per-procedure scratch of an ongoing registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRequestData {
    /// Stored registration request NAS PDU
    pub registration_request: Option<Vec<u8>>,
    pub registration_type_5gs: u8,
    pub identity_type_used_for_registration: u8,
    pub auth_failure_cause_synch_failure_times: u32,
    pub serving_etaf_changed: bool,
    pub registration_accept_for_non3gpp_access: Option<Vec<u8>>,
    pub retransmission_of_initial_nas_msg: bool,
}

/// Session management context of one PDU session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmContext {
    pub pdu_session_context: PduSessionContext,
    /// SMF SM context resource URI
    pub sm_context_uri: Option<String>,
}

impl SmContext {
    pub fn new(pdu_session_context: PduSessionContext) -> Self {
        Self {
            pdu_session_context,
            sm_context_uri: None,
        }
    }

    pub fn pdu_session_id(&self) -> i32 {
        self.pdu_session_context.pdu_session_id
    }

    pub fn access_type(&self) -> AccessType {
        self.pdu_session_context.access_type
    }
}

// ============================================================================
// EtafUe - ETAF UE Context
// ============================================================================

/// ETAF UE context
#[derive(Debug)]
pub struct EtafUe {
    // GMM state
    /// Registration state per access type
    pub state: AccessMap<GmmFsm>,
    /// Procedure in progress per access type
    pub on_going: AccessMap<OnGoing>,
    /// Registration scratch data
    pub registration: RegistrationRequestData,
    pub deregistration_target_access_type: Option<AccessType>,

    // Identities
    pub plmn_id: PlmnId,
    pub suci: Option<String>,
    pub supi: Option<String>,
    /// SUPI the registry indexes this UE under
    pub(crate) indexed_supi: Option<String>,
    /// SUPI not yet confirmed by authentication
    pub unauthenticated_supi: bool,
    pub gpsi: Option<String>,
    pub pei: Option<String>,
    /// 5G-TMSI, pool key of the UE
    pub tmsi: i32,
    /// 5G-GUTI string
    pub guti: String,
    pub group_id: Option<String>,
    pub routing_indicator: Option<String>,

    // Location
    pub rat_type: Option<RatType>,
    pub location: UserLocation,
    pub tai: Tai,
    pub location_changed: bool,
    pub last_visited_registered_tai: Option<Tai>,
    pub time_zone: Option<String>,

    // UDM
    pub udm_id: Option<String>,
    pub udm_group_id: Option<String>,
    pub nudm_uecm_uri: Option<String>,
    pub nudm_sdm_uri: Option<String>,
    pub sdm_subscription_id: Option<String>,
    pub context_valid: bool,
    pub access_and_mobility_subscription_data: Option<AccessAndMobilitySubscriptionData>,
    pub smf_selection_data: Option<SmfSelectionSubscriptionData>,
    pub ue_context_in_smf_data: Option<UeContextInSmfData>,
    pub trace_data: Option<TraceData>,
    pub subscribed_nssai: Vec<SubscribedSnssai>,

    // AUSF
    pub ausf_group_id: Option<String>,
    pub ausf_id: Option<String>,
    pub ausf_uri: Option<String>,

    // PCF
    pub pcf_id: Option<String>,
    pub pcf_uri: Option<String>,
    pub policy_association_id: Option<String>,
    pub am_policy_uri: Option<String>,
    pub am_policy_association: Option<PolicyAssociation>,
    pub request_trigger_location_change: bool,

    // NSSF
    pub nssf_id: Option<String>,
    pub nssf_uri: Option<String>,
    pub configured_nssai: Vec<Snssai>,
    pub allowed_nssai: AccessMap<Vec<AllowedSnssai>>,
    pub network_slicing_subscription_changed: bool,

    // Peer ETAF (context transfer target)
    pub target_etaf_profile: Option<NfProfile>,
    pub target_etaf_uri: Option<String>,
    pub handover_notify_uri: Option<String>,

    // Registration area
    pub registration_area: AccessMap<Vec<Tai>>,

    // Sessions
    pub sm_context_list: HashMap<i32, SmContext>,

    // RAN links
    /// Attached RAN UE per access type
    pub ran_ue: AccessMap<Option<RanUeRef>>,
    pub ue_radio_capability: Option<String>,
    pub release_cause: AccessMap<Option<NgApCause>>,

    // Security
    pub security: NasSecurityContext,

    // Timers
    pub timers: UeTimers,
}

impl Default for EtafUe {
    fn default() -> Self {
        Self::new()
    }
}

impl EtafUe {
    /// Fresh UE: DEREGISTERED on both access types, SUPI unauthenticated
    pub fn new() -> Self {
        Self {
            state: AccessMap::new(
                GmmFsm::new(AccessType::ThreeGppAccess),
                GmmFsm::new(AccessType::NonThreeGppAccess),
            ),
            on_going: AccessMap::default(),
            registration: RegistrationRequestData::default(),
            deregistration_target_access_type: None,
            plmn_id: PlmnId::default(),
            suci: None,
            supi: None,
            indexed_supi: None,
            unauthenticated_supi: true,
            gpsi: None,
            pei: None,
            tmsi: 0,
            guti: String::new(),
            group_id: None,
            routing_indicator: None,
            rat_type: None,
            location: UserLocation::default(),
            tai: Tai::default(),
            location_changed: false,
            last_visited_registered_tai: None,
            time_zone: None,
            udm_id: None,
            udm_group_id: None,
            nudm_uecm_uri: None,
            nudm_sdm_uri: None,
            sdm_subscription_id: None,
            context_valid: false,
            access_and_mobility_subscription_data: None,
            smf_selection_data: None,
            ue_context_in_smf_data: None,
            trace_data: None,
            subscribed_nssai: Vec::new(),
            ausf_group_id: None,
            ausf_id: None,
            ausf_uri: None,
            pcf_id: None,
            pcf_uri: None,
            policy_association_id: None,
            am_policy_uri: None,
            am_policy_association: None,
            request_trigger_location_change: false,
            nssf_id: None,
            nssf_uri: None,
            configured_nssai: Vec::new(),
            allowed_nssai: AccessMap::default(),
            network_slicing_subscription_changed: false,
            target_etaf_profile: None,
            target_etaf_uri: None,
            handover_notify_uri: None,
            registration_area: AccessMap::default(),
            sm_context_list: HashMap::new(),
            ran_ue: AccessMap::default(),
            ue_radio_capability: None,
            release_cause: AccessMap::default(),
            security: NasSecurityContext::default(),
            timers: UeTimers::default(),
        }
    }

    /// Identifier used in log lines: SUPI when known, GUTI otherwise
    pub fn log_id(&self) -> &str {
        self.supi.as_deref().unwrap_or(&self.guti)
    }

    // ------------------------------------------------------------------------
    // Connection management
    // ------------------------------------------------------------------------

    /// CM-CONNECTED: a RAN UE is attached for the access type
    pub fn cm_connect(&self, an_type: AccessType) -> bool {
        self.ran_ue[an_type].is_some()
    }

    /// CM-IDLE: no RAN UE is attached for the access type
    pub fn cm_idle(&self, an_type: AccessType) -> bool {
        !self.cm_connect(an_type)
    }

    /// Attached RAN UE for the access type
    pub fn ran_ue(&self, an_type: AccessType) -> Option<RanUeRef> {
        self.ran_ue[an_type].clone()
    }

    /// Clear the link reference only; the RAN UE itself is left alone
    pub fn detach_ran_ue(&mut self, an_type: AccessType) {
        if self.ran_ue[an_type].take().is_some() {
            log::debug!("[{}] RAN UE detached ({})", self.log_id(), an_type);
        }
    }

    /// Access type of an attached link, 3GPP first
    pub fn get_an_type(&self) -> Option<AccessType> {
        AccessType::ALL
            .into_iter()
            .find(|an| self.ran_ue[*an].is_some())
    }

    /// CM state per access type
    pub fn get_cm_info(&self) -> Vec<CmInfo> {
        AccessType::ALL
            .into_iter()
            .map(|an| CmInfo {
                cm_state: if self.cm_connect(an) {
                    CmState::Connected
                } else {
                    CmState::Idle
                },
                access_type: an,
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // GMM state
    // ------------------------------------------------------------------------

    pub fn gmm_state(&self, an_type: AccessType) -> GmmState {
        self.state[an_type].state()
    }

    pub fn is_registered(&self, an_type: AccessType) -> bool {
        self.state[an_type].is_registered()
    }

    /// Transition the access type's FSM, guarded by the security context
    pub fn gmm_transition(&mut self, an_type: AccessType, to: GmmState) -> ContextResult<()> {
        let valid = self.security_context_is_valid();
        self.state[an_type].transition(to, valid)
    }

    /// Dispatch a procedure event to the access type's FSM
    pub fn gmm_dispatch(&mut self, an_type: AccessType, event: GmmEvent) -> GmmFsmResult {
        let valid = self.security_context_is_valid();
        self.state[an_type].dispatch(event, valid)
    }

    /// Security context present, key available and integrity not failed
    pub fn security_context_is_valid(&self) -> bool {
        self.security.security_context_available
            && self.security.ng_ksi.ksi != NAS_KSI_NO_KEY_IS_AVAILABLE
            && !self.security.mac_failed
    }

    // ------------------------------------------------------------------------
    // Registration scratch
    // ------------------------------------------------------------------------

    /// Reset the per-procedure registration data and the link's UE context
    /// request flag; requires a RAN UE attached for the access type
    pub fn clear_registration_request_data(&mut self, an_type: AccessType) -> ContextResult<()> {
        let ran_ue = self.ran_ue[an_type]
            .clone()
            .ok_or(ContextError::RanUeNotAttached(an_type))?;

        self.registration = RegistrationRequestData::default();
        ran_ue.write().ue_context_request = false;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Slice and area predicates
    // ------------------------------------------------------------------------

    pub fn in_allowed_nssai(&self, snssai: &Snssai, an_type: AccessType) -> bool {
        self.allowed_nssai[an_type]
            .iter()
            .any(|allowed| &allowed.allowed_snssai == snssai)
    }

    pub fn in_subscribed_nssai(&self, snssai: &Snssai) -> bool {
        self.subscribed_nssai
            .iter()
            .any(|subscribed| &subscribed.subscribed_snssai == snssai)
    }

    /// First NSI information of the matching allowed slice
    pub fn nsi_information_from_snssai(
        &self,
        an_type: AccessType,
        snssai: &Snssai,
    ) -> Option<NsiInformation> {
        self.allowed_nssai[an_type]
            .iter()
            .find(|allowed| &allowed.allowed_snssai == snssai)
            .and_then(|allowed| allowed.nsi_information_list.first().cloned())
    }

    /// Every TAI of `tai_list` is in the registration area of the access type
    pub fn tai_list_in_registration_area(&self, tai_list: &[Tai], an_type: AccessType) -> bool {
        let area = &self.registration_area[an_type];
        tai_list.iter().all(|tai| area.contains(tai))
    }

    /// Whether any subscribed slice allows every DNN ("*")
    pub fn has_wildcard_subscribed_dnn(&self) -> bool {
        self.smf_selection_data.as_ref().is_some_and(|data| {
            data.subscribed_snssai_infos
                .values()
                .flat_map(|info| info.dnn_infos.iter())
                .any(|dnn_info| dnn_info.dnn == "*")
        })
    }

    // ------------------------------------------------------------------------
    // Sessions and policy
    // ------------------------------------------------------------------------

    pub fn sm_context_find_by_pdu_session_id(&self, pdu_session_id: i32) -> Option<&SmContext> {
        self.sm_context_list.get(&pdu_session_id)
    }

    /// Store an SM context, replacing any entry with the same PDU session ID
    pub fn store_sm_context(&mut self, sm_context: SmContext) {
        self.sm_context_list
            .insert(sm_context.pdu_session_id(), sm_context);
    }

    pub fn remove_am_policy_association(&mut self) {
        self.am_policy_association = None;
        self.policy_association_id = None;
    }
}

// ============================================================================
// Link Attachment
// ============================================================================

impl UeRef {
    /// Attach `ran_ue` for its RAN's access type and point it back at this UE
    ///
    /// A link already attached for that access type is overwritten, not
    /// removed.
    pub fn attach_ran_ue(&self, ran_ue: &RanUeRef) -> ContextResult<()> {
        let etaf_ue_ngap_id = ran_ue.etaf_ue_ngap_id();
        let an_type = ran_ue
            .an_type()
            .ok_or(ContextError::RanGone(etaf_ue_ngap_id))?;

        {
            let mut ue = self.write();
            if let Some(previous) = ue.ran_ue[an_type].as_ref() {
                if !previous.ptr_eq(ran_ue) {
                    log::warn!(
                        "[{}] RAN UE for {} overwritten by etaf_ue_ngap_id={}",
                        ue.log_id(),
                        an_type,
                        etaf_ue_ngap_id
                    );
                }
            }
            ue.ran_ue[an_type] = Some(ran_ue.clone());
            log::debug!(
                "[{}] RAN UE attached ({}, etaf_ue_ngap_id={})",
                ue.log_id(),
                an_type,
                etaf_ue_ngap_id
            );
        }
        ran_ue.write().etaf_ue = self.downgrade();
        Ok(())
    }
}

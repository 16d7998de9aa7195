//! SBI Data Models
//!
//! JSON data types exchanged with sibling NFs (NRF, UDM, PCF) and with peer
//! ETAF instances during context transfer. Field names follow the 3GPP
//! OpenAPI camelCase convention.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Common Types
// ============================================================================

/// Access type of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    #[serde(rename = "3GPP_ACCESS")]
    ThreeGppAccess,
    #[serde(rename = "NON_3GPP_ACCESS")]
    NonThreeGppAccess,
}

impl AccessType {
    /// Both access types, 3GPP first
    pub const ALL: [AccessType; 2] = [AccessType::ThreeGppAccess, AccessType::NonThreeGppAccess];

    /// OpenAPI enumeration value
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::ThreeGppAccess => "3GPP_ACCESS",
            AccessType::NonThreeGppAccess => "NON_3GPP_ACCESS",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NF type (subset used by this NF)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfType {
    Nrf,
    Udm,
    Amf,
    Ausf,
    Pcf,
    Nssf,
    Smf,
    Etaf,
}

impl fmt::Display for NfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NfType::Nrf => "NRF",
            NfType::Udm => "UDM",
            NfType::Amf => "AMF",
            NfType::Ausf => "AUSF",
            NfType::Pcf => "PCF",
            NfType::Nssf => "NSSF",
            NfType::Smf => "SMF",
            NfType::Etaf => "ETAF",
        };
        f.write_str(name)
    }
}

/// Radio access technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatType {
    Nr,
    Eutra,
    Wlan,
    Virtual,
}

/// PLMN identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlmnId {
    pub mcc: String,
    pub mnc: String,
}

impl PlmnId {
    pub fn new(mcc: &str, mnc: &str) -> Self {
        Self {
            mcc: mcc.to_string(),
            mnc: mnc.to_string(),
        }
    }
}

/// Tracking area identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tai {
    pub plmn_id: PlmnId,
    /// Hex-encoded TAC, e.g. "000001"
    pub tac: String,
}

/// Globally unique AMF/ETAF identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guami {
    pub plmn_id: PlmnId,
    /// Hex-encoded region/set/pointer, e.g. "cafe00"
    pub amf_id: String,
}

/// Single network slice selection assistance information
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snssai {
    pub sst: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
}

impl Snssai {
    pub fn new(sst: i32, sd: Option<&str>) -> Self {
        Self {
            sst,
            sd: sd.map(str::to_string),
        }
    }
}

/// Aggregate maximum bit rate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ambr {
    pub uplink: String,
    pub downlink: String,
}

/// Set of tracking areas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tacs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestrictionType {
    AllowedAreas,
    NotAllowedAreas,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAreaRestriction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction_type: Option<RestrictionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub areas: Vec<Area>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_num_of_tas: Option<i32>,
}

/// Problem details returned by SBI peers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ProblemDetails {
    /// Problem with status and cause only
    pub fn new(status: u16, cause: &str) -> Self {
        Self {
            status,
            cause: Some(cause.to_string()),
            ..Default::default()
        }
    }
}

// ============================================================================
// Location
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ncgi {
    pub plmn_id: PlmnId,
    pub nr_cell_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NrLocation {
    pub tai: Tai,
    pub ncgi: Ncgi,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ue_location_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N3gaLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n3gpp_tai: Option<Tai>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ue_ipv4_addr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nr_location: Option<NrLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n3ga_location: Option<N3gaLocation>,
}

// ============================================================================
// RAN Node Identity
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GnbId {
    pub bit_length: i32,
    pub gnb_value: String,
}

/// Global RAN node identifier as carried on the SBI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRanNodeId {
    pub plmn_id: PlmnId,
    #[serde(rename = "n3IwfId", default, skip_serializing_if = "Option::is_none")]
    pub n3iwf_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gnb_id: Option<GnbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nge_nb_id: Option<String>,
}

// ============================================================================
// Subscription Data (UDM)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nssai {
    #[serde(default)]
    pub default_single_nssais: Vec<Snssai>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub single_nssais: Vec<Snssai>,
}

/// Access and mobility subscription data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAndMobilitySubscriptionData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpsis: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_ue_ambr: Option<Ambr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nssai: Option<Nssai>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rat_restrictions: Vec<RatType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbidden_areas: Vec<Area>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_area_restriction: Option<ServiceAreaRestriction>,
    #[serde(default)]
    pub rfsp_index: i32,
    #[serde(default)]
    pub subs_reg_timer: i32,
}

/// Subscribed slice with its default indication
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedSnssai {
    pub subscribed_snssai: Snssai,
    pub default_indication: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnnInfo {
    pub dnn: String,
    #[serde(default)]
    pub default_dnn_indicator: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnssaiInfo {
    #[serde(default)]
    pub dnn_infos: Vec<DnnInfo>,
}

/// SMF selection subscription data, keyed by serialized S-NSSAI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmfSelectionSubscriptionData {
    #[serde(default)]
    pub subscribed_snssai_infos: HashMap<String, SnssaiInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PduSession {
    pub dnn: String,
    pub smf_instance_id: String,
    pub plmn_id: PlmnId,
}

/// UE context in SMF data, keyed by PDU session id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UeContextInSmfData {
    #[serde(default)]
    pub pdu_sessions: HashMap<String, PduSession>,
}

/// UE parameters update acknowledgement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upu_mac_iue: Option<String>,
    pub provisioning_time: String,
}

/// SDM subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdmSubscription {
    pub nf_instance_id: String,
    #[serde(default)]
    pub implicit_unsubscribe: bool,
    pub callback_reference: String,
    #[serde(default)]
    pub monitored_resource_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceData {
    pub trace_ref: String,
    pub trace_depth: String,
    pub ne_type_list: String,
    pub event_list: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_entity_ipv4_addr: Option<String>,
}

// ============================================================================
// Network Slicing
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NsiInformation {
    pub nrf_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsi_id: Option<String>,
}

/// Allowed S-NSSAI with its NSI information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedSnssai {
    pub allowed_snssai: Snssai,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nsi_information_list: Vec<NsiInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_home_snssai: Option<Snssai>,
}

// ============================================================================
// Policy (PCF)
// ============================================================================

/// Policy trigger as carried in the UE context transfer payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmPolicyReqTrigger {
    LocationChange,
    PraChange,
    SariChange,
    RfspIndexChange,
    AllowedNssaiChange,
}

/// Policy trigger as carried in a policy association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestTrigger {
    LocCh,
    PraCh,
    ServAreaCh,
    RfspCh,
    UeAmbrCh,
    SmfSelectCh,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAssociationRequest {
    pub notification_uri: String,
    pub supi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpsi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_type: Option<AccessType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_loc: Option<UserLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_plmn: Option<PlmnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rat_type: Option<RatType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guami: Option<Guami>,
    pub supp_feat: String,
}

/// AM policy association
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAssociation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<PolicyAssociationRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<RequestTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serv_area_res: Option<ServiceAreaRestriction>,
    #[serde(default)]
    pub rfsp: i32,
    #[serde(default)]
    pub supp_feat: String,
}

// ============================================================================
// UE Context Transfer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityAlgorithm {
    Nia0,
    Nia1,
    Nia2,
    Nia3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CipheringAlgorithm {
    Nea0,
    Nea1,
    Nea2,
    Nea3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NasSecurityMode {
    pub integrity_algorithm: IntegrityAlgorithm,
    pub ciphering_algorithm: CipheringAlgorithm,
}

/// Mobility management context per access type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MmContext {
    pub access_type: AccessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nas_security_mode: Option<NasSecurityMode>,
    /// Packed 24-bit NAS COUNT (overflow << 8 | sqn)
    #[serde(default)]
    pub nas_downlink_count: i32,
    #[serde(default)]
    pub nas_uplink_count: i32,
    /// Base64-encoded UE security capability
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ue_security_capability: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_nssai: Vec<Snssai>,
}

/// PDU session context as carried in a context transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PduSessionContext {
    pub pdu_session_id: i32,
    pub sm_context_ref: String,
    pub s_nssai: Snssai,
    pub dnn: String,
    pub access_type: AccessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsmf_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsmf_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns_instance: Option<String>,
}

/// UE context transfer payload
///
/// Empty strings, zero values and empty lists mean "not present".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UeContext {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub supi: String,
    #[serde(default)]
    pub supi_unauth_ind: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpsi_list: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pei: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub udm_group_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ausf_group_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub routing_indicator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_ue_ambr: Option<Ambr>,
    #[serde(default)]
    pub sub_rfsp: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricted_rat_list: Vec<RatType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbidden_area_list: Vec<Area>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_area_restriction: Option<ServiceAreaRestriction>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pcf_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pcf_am_policy_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub am_policy_req_trigger_list: Vec<AmPolicyReqTrigger>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub session_context_list: Vec<PduSessionContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mm_context_list: Vec<MmContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_data: Option<TraceData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefToBinaryData {
    pub content_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N2InfoContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ngap_message_type: Option<i32>,
    pub ngap_data: RefToBinaryData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N2SmInformation {
    pub pdu_session_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n2_info_content: Option<N2InfoContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s_nssai: Option<Snssai>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgApCause {
    pub group: i32,
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgRanTargetId {
    pub ran_node_id: GlobalRanNodeId,
    pub tai: Tai,
}

/// Payload of a UE context create request towards a peer instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UeContextCreateData {
    pub ue_context: UeContext,
    pub target_id: NgRanTargetId,
    pub source_to_target_data: N2InfoContent,
    pub pdu_session_list: Vec<N2SmInformation>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub n2_notify_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ue_radio_capability: Option<N2InfoContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ngap_cause: Option<NgApCause>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub supported_features: String,
}

// ============================================================================
// Subscriptions held by the registry
// ============================================================================

/// ETAF status change subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSubscriptionData {
    pub amf_status_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guami_list: Vec<Guami>,
}

/// UE event exposure subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscription {
    pub event_list: Vec<String>,
    pub event_notify_uri: String,
    pub notify_correlation_id: String,
    pub nf_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supi: Option<String>,
    #[serde(default)]
    pub any_ue: bool,
}

// ============================================================================
// NF Discovery (NRF)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfStatus {
    #[default]
    Registered,
    Suspended,
    Undiscoverable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriScheme {
    Http,
    #[default]
    Https,
}

impl UriScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            UriScheme::Http => "http",
            UriScheme::Https => "https",
        }
    }
}

impl fmt::Display for UriScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpEndPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfServiceVersion {
    pub api_version_in_uri: String,
    pub api_full_version: String,
}

/// NF service instance within an NF profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfService {
    pub service_instance_id: String,
    pub service_name: String,
    #[serde(default)]
    pub versions: Vec<NfServiceVersion>,
    pub scheme: UriScheme,
    pub nf_service_status: NfStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_end_points: Vec<IpEndPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmfInfo {
    pub amf_set_id: String,
    pub amf_region_id: String,
    pub guami_list: Vec<Guami>,
}

/// NF profile as returned by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfProfile {
    pub nf_instance_id: String,
    pub nf_type: NfType,
    pub nf_status: NfStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nf_services: Vec<NfService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amf_info: Option<AmfInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub validity_period: i32,
    #[serde(default)]
    pub nf_instances: Vec<NfProfile>,
}

/// Query options for NF discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchNfInstancesOptions {
    pub service_names: Vec<String>,
    pub target_nf_instance_id: Option<String>,
    pub guami: Option<Guami>,
    pub snssais: Vec<Snssai>,
    pub target_plmn_list: Vec<PlmnId>,
}

// ============================================================================
// Connection Management
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CmState {
    Idle,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmInfo {
    pub cm_state: CmState,
    pub access_type: AccessType,
}

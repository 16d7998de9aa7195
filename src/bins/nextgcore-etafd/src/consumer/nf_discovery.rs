//! NF Discovery Consumer
//!
//! Selects sibling NF instances from NRF search results and records the
//! chosen instance on the UE context.

use crate::consumer::NrfClient;
use crate::context::UeRef;
use crate::error::ConsumerError;
use crate::models::{
    NfProfile, NfStatus, NfType, SearchNfInstancesOptions, SearchResult, StatusSubscriptionData,
    UriScheme,
};

pub const SERVICE_NUDM_SDM: &str = "nudm-sdm";
pub const SERVICE_NNSSF_NSSELECTION: &str = "nnssf-nsselection";
pub const SERVICE_NAMF_COMM: &str = "namf-comm";

fn sbi_uri(scheme: UriScheme, ipv4: &str, port: Option<u16>) -> String {
    let port = match (port, scheme) {
        (Some(port), _) if port != 0 => port,
        (_, UriScheme::Http) => 80,
        (_, UriScheme::Https) => 443,
    };
    format!("{}://{}:{}", scheme, ipv4, port)
}

/// URI of the first service named `service_name` with status `status`
///
/// Preference: profile FQDN, service FQDN, API prefix, then the first IP
/// endpoint (falling back to the profile's first IPv4 address).
pub fn search_nf_service_uri(
    profile: &NfProfile,
    service_name: &str,
    status: NfStatus,
) -> Option<String> {
    profile
        .nf_services
        .iter()
        .filter(|service| service.service_name == service_name && service.nf_service_status == status)
        .find_map(|service| {
            if let Some(fqdn) = profile.fqdn.as_ref().filter(|f| !f.is_empty()) {
                return Some(fqdn.clone());
            }
            if let Some(fqdn) = service.fqdn.as_ref().filter(|f| !f.is_empty()) {
                return Some(fqdn.clone());
            }
            if let Some(prefix) = service.api_prefix.as_ref().filter(|p| !p.is_empty()) {
                return Some(prefix.clone());
            }
            let point = service.ip_end_points.first()?;
            let ipv4 = point
                .ipv4_address
                .as_ref()
                .filter(|a| !a.is_empty())
                .or_else(|| profile.ipv4_addresses.first())?;
            Some(sbi_uri(service.scheme, ipv4, point.port))
        })
}

/// Query the NRF
pub async fn send_search_nf_instances<C: NrfClient>(
    client: &C,
    nrf_uri: &str,
    target_nf_type: NfType,
    requester_nf_type: NfType,
    options: &SearchNfInstancesOptions,
) -> Result<SearchResult, ConsumerError> {
    log::debug!(
        "Searching {} instances for {} at {}",
        target_nf_type,
        requester_nf_type,
        nrf_uri
    );
    client
        .search_nf_instances(nrf_uri, target_nf_type, requester_nf_type, options)
        .await
}

/// First profile offering `service_name` in REGISTERED state
fn select_instance<'a>(result: &'a SearchResult, service_name: &str) -> Option<(&'a NfProfile, String)> {
    result.nf_instances.iter().find_map(|profile| {
        search_nf_service_uri(profile, service_name, NfStatus::Registered).map(|uri| (profile, uri))
    })
}

/// Select a UDM SDM instance for the UE
pub async fn search_udm_sdm_instance<C: NrfClient>(
    client: &C,
    ue: &UeRef,
    nrf_uri: &str,
    target_nf_type: NfType,
    requester_nf_type: NfType,
    options: &SearchNfInstancesOptions,
) -> Result<(), ConsumerError> {
    let result =
        send_search_nf_instances(client, nrf_uri, target_nf_type, requester_nf_type, options).await?;

    let mut ue = ue.write();
    match select_instance(&result, SERVICE_NUDM_SDM) {
        Some((profile, uri)) => {
            ue.udm_id = Some(profile.nf_instance_id.clone());
            ue.nudm_sdm_uri = Some(uri);
            Ok(())
        }
        None => {
            ue.nudm_sdm_uri = None;
            log::error!("[{}] ETAF can not select an UDM by NRF", ue.log_id());
            Err(ConsumerError::NoInstance(NfType::Udm))
        }
    }
}

/// Select an NSSF NSSelection instance for the UE
pub async fn search_nssf_nsselection_instance<C: NrfClient>(
    client: &C,
    ue: &UeRef,
    nrf_uri: &str,
    target_nf_type: NfType,
    requester_nf_type: NfType,
    options: &SearchNfInstancesOptions,
) -> Result<(), ConsumerError> {
    let result =
        send_search_nf_instances(client, nrf_uri, target_nf_type, requester_nf_type, options).await?;

    let mut ue = ue.write();
    match select_instance(&result, SERVICE_NNSSF_NSSELECTION) {
        Some((profile, uri)) => {
            ue.nssf_id = Some(profile.nf_instance_id.clone());
            ue.nssf_uri = Some(uri);
            Ok(())
        }
        None => {
            ue.nssf_uri = None;
            log::error!("[{}] ETAF can not select an NSSF by NRF", ue.log_id());
            Err(ConsumerError::NoInstance(NfType::Nssf))
        }
    }
}

/// Select the peer instance a UE context is transferred to
pub async fn search_amf_communication_instance<C: NrfClient>(
    client: &C,
    ue: &UeRef,
    nrf_uri: &str,
    target_nf_type: NfType,
    requester_nf_type: NfType,
    options: &SearchNfInstancesOptions,
) -> Result<(), ConsumerError> {
    let result =
        send_search_nf_instances(client, nrf_uri, target_nf_type, requester_nf_type, options).await?;

    let mut ue = ue.write();
    match select_instance(&result, SERVICE_NAMF_COMM) {
        Some((profile, uri)) => {
            ue.target_etaf_profile = Some(profile.clone());
            ue.target_etaf_uri = Some(uri);
            Ok(())
        }
        None => {
            ue.target_etaf_uri = None;
            log::error!("[{}] ETAF can not select an AMF by NRF", ue.log_id());
            Err(ConsumerError::NoInstance(target_nf_type))
        }
    }
}

/// Every AMF offering `service_name`, paired with its served GUAMIs
///
/// A failed search is logged and yields an empty list.
pub async fn search_available_amfs<C: NrfClient>(
    client: &C,
    nrf_uri: &str,
    service_name: &str,
) -> Vec<StatusSubscriptionData> {
    let options = SearchNfInstancesOptions::default();
    let result =
        match send_search_nf_instances(client, nrf_uri, NfType::Amf, NfType::Etaf, &options).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("AMF discovery failed: {}", e);
                return Vec::new();
            }
        };

    result
        .nf_instances
        .iter()
        .filter_map(|profile| {
            search_nf_service_uri(profile, service_name, NfStatus::Registered).map(|uri| {
                StatusSubscriptionData {
                    amf_status_uri: uri,
                    guami_list: profile
                        .amf_info
                        .as_ref()
                        .map(|info| info.guami_list.clone())
                        .unwrap_or_default(),
                }
            })
        })
        .collect()
}

//! UDM Subscriber Data Management Consumer
//!
//! Each procedure reads the SDM URI, SUPI and serving PLMN off the UE,
//! releases the UE lock for the peer exchange and writes the answer back.

use crate::consumer::{SbiReply, UdmSdmClient};
use crate::context::{EtafContext, UeRef};
use crate::error::{ConsumerError, ConsumerResult};
use crate::models::{AcknowledgeInfo, NfType, SdmSubscription, SubscribedSnssai};

struct SdmTarget {
    sdm_uri: String,
    supi: String,
    plmn_id: String,
}

fn sdm_target(ue: &UeRef) -> Result<SdmTarget, ConsumerError> {
    let ue = ue.read();
    let sdm_uri = ue
        .nudm_sdm_uri
        .clone()
        .ok_or(ConsumerError::NoInstance(NfType::Udm))?;
    let supi = ue.supi.clone().ok_or(ConsumerError::NoSupi)?;
    Ok(SdmTarget {
        sdm_uri,
        supi,
        plmn_id: format!("{}{}", ue.plmn_id.mcc, ue.plmn_id.mnc),
    })
}

/// Acknowledge a UE parameters update
pub async fn put_upu_ack<C: UdmSdmClient>(
    client: &C,
    ue: &UeRef,
    upu_mac_iue: &str,
) -> ConsumerResult {
    let target = sdm_target(ue)?;
    let ack = AcknowledgeInfo {
        upu_mac_iue: Some(upu_mac_iue.to_string()),
        ..Default::default()
    };

    match client.put_upu_ack(&target.sdm_uri, &target.supi, &ack).await? {
        SbiReply::Success(()) => Ok(None),
        SbiReply::Problem(problem) => Ok(Some(problem)),
    }
}

/// Fetch access and mobility subscription data; the first GPSI becomes the
/// UE's GPSI
pub async fn sdm_get_am_data<C: UdmSdmClient>(client: &C, ue: &UeRef) -> ConsumerResult {
    let target = sdm_target(ue)?;

    match client
        .get_am_data(&target.sdm_uri, &target.supi, &target.plmn_id)
        .await?
    {
        SbiReply::Success(data) => {
            let mut ue = ue.write();
            if let Some(gpsi) = data.gpsis.first() {
                ue.gpsi = Some(gpsi.clone());
            }
            ue.access_and_mobility_subscription_data = Some(data);
            log::debug!("[{}] AM subscription data stored", target.supi);
            Ok(None)
        }
        SbiReply::Problem(problem) => Ok(Some(problem)),
    }
}

/// Fetch SMF selection subscription data
pub async fn sdm_get_smf_select_data<C: UdmSdmClient>(client: &C, ue: &UeRef) -> ConsumerResult {
    let target = sdm_target(ue)?;

    match client
        .get_smf_select_data(&target.sdm_uri, &target.supi, &target.plmn_id)
        .await?
    {
        SbiReply::Success(data) => {
            ue.write().smf_selection_data = Some(data);
            Ok(None)
        }
        SbiReply::Problem(problem) => Ok(Some(problem)),
    }
}

/// Fetch UE context in SMF data
pub async fn sdm_get_ue_context_in_smf_data<C: UdmSdmClient>(
    client: &C,
    ue: &UeRef,
) -> ConsumerResult {
    let target = sdm_target(ue)?;

    match client
        .get_ue_context_in_smf_data(&target.sdm_uri, &target.supi)
        .await?
    {
        SbiReply::Success(data) => {
            ue.write().ue_context_in_smf_data = Some(data);
            Ok(None)
        }
        SbiReply::Problem(problem) => Ok(Some(problem)),
    }
}

/// Subscribe to subscriber data changes; stores the subscription ID
pub async fn sdm_subscribe<C: UdmSdmClient>(
    client: &C,
    ctx: &EtafContext,
    ue: &UeRef,
) -> ConsumerResult {
    let target = sdm_target(ue)?;
    let subscription = SdmSubscription {
        nf_instance_id: ctx.nf_id().to_string(),
        ..Default::default()
    };

    match client
        .subscribe(&target.sdm_uri, &target.supi, &subscription)
        .await?
    {
        SbiReply::Success(created) => {
            ue.write().sdm_subscription_id = created.subscription_id;
            Ok(None)
        }
        SbiReply::Problem(problem) => Ok(Some(problem)),
    }
}

/// Fetch subscribed slices; default slices are tagged with the default
/// indication
pub async fn sdm_get_slice_selection_subscription_data<C: UdmSdmClient>(
    client: &C,
    ue: &UeRef,
) -> ConsumerResult {
    let target = sdm_target(ue)?;

    match client
        .get_nssai(&target.sdm_uri, &target.supi, &target.plmn_id)
        .await?
    {
        SbiReply::Success(nssai) => {
            let mut ue = ue.write();
            let defaults = nssai.default_single_nssais.into_iter().map(|snssai| SubscribedSnssai {
                subscribed_snssai: snssai,
                default_indication: true,
            });
            let singles = nssai.single_nssais.into_iter().map(|snssai| SubscribedSnssai {
                subscribed_snssai: snssai,
                default_indication: false,
            });
            ue.subscribed_nssai.extend(defaults.chain(singles));
            Ok(None)
        }
        SbiReply::Problem(problem) => Ok(Some(problem)),
    }
}

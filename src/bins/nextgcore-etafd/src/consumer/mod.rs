//! Sibling NF Consumers
//!
//! Request/response contracts with the NRF, the UDM subscriber data service
//! and the PCF AM policy service. The HTTP transport sits behind the client
//! traits; the procedures here pick the inputs off the UE context, await the
//! peer and fold the answer back into the UE context.
//!
//! Every peer exchange has three outcomes: a success payload, a problem
//! payload (returned as data), or a transport failure (an error).

pub mod nf_discovery;
pub mod policy;
pub mod sdm;

use crate::error::ConsumerError;
use crate::models::{
    AccessAndMobilitySubscriptionData, AcknowledgeInfo, NfType, Nssai, PolicyAssociation,
    PolicyAssociationRequest, ProblemDetails, SdmSubscription, SearchNfInstancesOptions,
    SearchResult, SmfSelectionSubscriptionData, UeContextInSmfData,
};

/// Answer of a peer that did respond
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SbiReply<T> {
    Success(T),
    Problem(ProblemDetails),
}

/// Result of one peer exchange
pub type SbiResult<T> = Result<SbiReply<T>, ConsumerError>;

/// NF discovery (Nnrf_NFDiscovery)
///
/// A 307 answer maps to `ConsumerError::TemporaryRedirect`.
#[allow(async_fn_in_trait)]
pub trait NrfClient {
    async fn search_nf_instances(
        &self,
        nrf_uri: &str,
        target_nf_type: NfType,
        requester_nf_type: NfType,
        options: &SearchNfInstancesOptions,
    ) -> Result<SearchResult, ConsumerError>;
}

/// Subscriber data management (Nudm_SDM)
#[allow(async_fn_in_trait)]
pub trait UdmSdmClient {
    async fn put_upu_ack(
        &self,
        sdm_uri: &str,
        supi: &str,
        ack: &AcknowledgeInfo,
    ) -> SbiResult<()>;

    async fn get_am_data(
        &self,
        sdm_uri: &str,
        supi: &str,
        plmn_id: &str,
    ) -> SbiResult<AccessAndMobilitySubscriptionData>;

    async fn get_smf_select_data(
        &self,
        sdm_uri: &str,
        supi: &str,
        plmn_id: &str,
    ) -> SbiResult<SmfSelectionSubscriptionData>;

    async fn get_ue_context_in_smf_data(
        &self,
        sdm_uri: &str,
        supi: &str,
    ) -> SbiResult<UeContextInSmfData>;

    async fn subscribe(
        &self,
        sdm_uri: &str,
        supi: &str,
        subscription: &SdmSubscription,
    ) -> SbiResult<SdmSubscription>;

    async fn get_nssai(&self, sdm_uri: &str, supi: &str, plmn_id: &str) -> SbiResult<Nssai>;
}

/// Created policy association and its resource URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyAssociationCreated {
    pub association: PolicyAssociation,
    /// Location header of the created resource
    pub location: String,
}

/// AM policy control (Npcf_AMPolicyControl)
#[allow(async_fn_in_trait)]
pub trait PcfAmPolicyClient {
    async fn create(
        &self,
        pcf_uri: &str,
        request: &PolicyAssociationRequest,
    ) -> SbiResult<PolicyAssociationCreated>;

    async fn delete(&self, pcf_uri: &str, policy_association_id: &str) -> SbiResult<()>;
}

//! RAN and RAN UE Contexts
//!
//! `EtafRan` is one radio node connection; `RanUe` is the per-UE link over
//! that connection, pairing the node-assigned RAN UE NGAP ID with the
//! internally allocated ETAF UE NGAP ID. Creation and removal go through
//! [`EtafContext`](crate::context::EtafContext) because they touch registry
//! pools and allocators.

use std::net::SocketAddr;

use crate::context::{RanUeRef, WeakContextRef};
use crate::models::{AccessType, GlobalRanNodeId, GnbId, PlmnId, Snssai, Tai, UserLocation};
use crate::ue::EtafUe;

// ============================================================================
// RAN Node Identity
// ============================================================================

/// Which node identifier shape a RAN presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RanPresent {
    GnbId = 1,
    NgeNbId = 2,
    N3IwfId = 3,
}

/// RAN node identity, one of three mutually exclusive shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RanNodeId {
    Gnb { plmn_id: PlmnId, gnb_id: GnbId },
    NgeNb { plmn_id: PlmnId, nge_nb_id: String },
    N3Iwf { plmn_id: PlmnId, n3iwf_id: String },
}

impl RanNodeId {
    pub fn present(&self) -> RanPresent {
        match self {
            RanNodeId::Gnb { .. } => RanPresent::GnbId,
            RanNodeId::NgeNb { .. } => RanPresent::NgeNbId,
            RanNodeId::N3Iwf { .. } => RanPresent::N3IwfId,
        }
    }

    pub fn plmn_id(&self) -> &PlmnId {
        match self {
            RanNodeId::Gnb { plmn_id, .. }
            | RanNodeId::NgeNb { plmn_id, .. }
            | RanNodeId::N3Iwf { plmn_id, .. } => plmn_id,
        }
    }

    /// Access type implied by the identity shape
    pub fn access_type(&self) -> AccessType {
        match self {
            RanNodeId::N3Iwf { .. } => AccessType::NonThreeGppAccess,
            _ => AccessType::ThreeGppAccess,
        }
    }

    /// Compare the shape-specific node identifier
    ///
    /// gNBs match on the gNB value, ng-eNBs and N3IWFs on their identifier
    /// string. Different shapes never match.
    pub fn matches(&self, other: &RanNodeId) -> bool {
        match (self, other) {
            (RanNodeId::Gnb { gnb_id: a, .. }, RanNodeId::Gnb { gnb_id: b, .. }) => {
                a.gnb_value == b.gnb_value
            }
            (RanNodeId::NgeNb { nge_nb_id: a, .. }, RanNodeId::NgeNb { nge_nb_id: b, .. }) => a == b,
            (RanNodeId::N3Iwf { n3iwf_id: a, .. }, RanNodeId::N3Iwf { n3iwf_id: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Convert from the SBI representation; `None` when no shape is set
    pub fn from_global(id: &GlobalRanNodeId) -> Option<Self> {
        let plmn_id = id.plmn_id.clone();
        if let Some(gnb_id) = &id.gnb_id {
            Some(RanNodeId::Gnb {
                plmn_id,
                gnb_id: gnb_id.clone(),
            })
        } else if let Some(nge_nb_id) = &id.nge_nb_id {
            Some(RanNodeId::NgeNb {
                plmn_id,
                nge_nb_id: nge_nb_id.clone(),
            })
        } else {
            id.n3iwf_id.as_ref().map(|n3iwf_id| RanNodeId::N3Iwf {
                plmn_id,
                n3iwf_id: n3iwf_id.clone(),
            })
        }
    }

    pub fn to_global(&self) -> GlobalRanNodeId {
        let mut id = GlobalRanNodeId {
            plmn_id: self.plmn_id().clone(),
            ..Default::default()
        };
        match self {
            RanNodeId::Gnb { gnb_id, .. } => id.gnb_id = Some(gnb_id.clone()),
            RanNodeId::NgeNb { nge_nb_id, .. } => id.nge_nb_id = Some(nge_nb_id.clone()),
            RanNodeId::N3Iwf { n3iwf_id, .. } => id.n3iwf_id = Some(n3iwf_id.clone()),
        }
        id
    }
}

// ============================================================================
// EtafRan - RAN Context
// ============================================================================

/// Tracking area supported by a RAN node, with its slices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedTai {
    pub tai: Tai,
    pub snssai_list: Vec<Snssai>,
}

/// RAN context, one per NGAP transport connection
#[derive(Debug)]
pub struct EtafRan {
    /// Transport connection identity (pool key)
    pub conn: SocketAddr,
    /// Node identity from NG setup
    pub ran_id: Option<RanNodeId>,
    /// Node name from NG setup
    pub name: String,
    /// Access type derived from the node identity
    pub an_type: AccessType,
    /// Tracking areas the node serves
    pub supported_ta_list: Vec<SupportedTai>,
    /// Attached RAN UEs
    pub ran_ue_list: Vec<RanUeRef>,
    /// Set once the RAN has left the registry; no RAN UE is added after
    pub(crate) removed: bool,
}

impl EtafRan {
    pub fn new(conn: SocketAddr) -> Self {
        Self {
            conn,
            ran_id: None,
            name: String::new(),
            an_type: AccessType::ThreeGppAccess,
            supported_ta_list: Vec::new(),
            ran_ue_list: Vec::new(),
            removed: false,
        }
    }

    /// Record the node identity and derive the access type from its shape
    pub fn set_ran_id(&mut self, ran_id: RanNodeId) {
        self.an_type = ran_id.access_type();
        log::debug!(
            "[{}] RAN identity set ({:?}, {})",
            self.conn,
            ran_id.present(),
            self.an_type
        );
        self.ran_id = Some(ran_id);
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn ran_present(&self) -> Option<RanPresent> {
        self.ran_id.as_ref().map(RanNodeId::present)
    }

    /// Find an attached RAN UE by the node-assigned RAN UE NGAP ID
    pub fn find_ran_ue_by_ran_ue_ngap_id(&self, ran_ue_ngap_id: i64) -> Option<RanUeRef> {
        let found = self
            .ran_ue_list
            .iter()
            .find(|ran_ue| ran_ue.read().ran_ue_ngap_id == ran_ue_ngap_id)
            .cloned();
        if found.is_none() {
            log::debug!(
                "[{}] RAN UE not found (ran_ue_ngap_id={})",
                self.conn,
                ran_ue_ngap_id
            );
        }
        found
    }

    /// Whether the node advertised `tai`
    pub fn supports_tai(&self, tai: &Tai) -> bool {
        self.supported_ta_list.iter().any(|s| &s.tai == tai)
    }
}

// ============================================================================
// RanUe - RAN UE Context
// ============================================================================

/// Per-UE link over a RAN connection
#[derive(Debug)]
pub struct RanUe {
    /// Node-assigned ID, unique within the RAN only
    pub ran_ue_ngap_id: i64,
    /// Internally allocated ID, unique across the registry
    pub etaf_ue_ngap_id: i64,
    /// Owning RAN (navigation only)
    pub ran: WeakContextRef<EtafRan>,
    /// Attached UE (navigation only)
    pub etaf_ue: WeakContextRef<EtafUe>,
    /// Last reported tracking area
    pub tai: Tai,
    /// Last reported location
    pub location: UserLocation,
    /// UE context request IE seen in the initial UE message
    pub ue_context_request: bool,
    /// Initial context setup request sent
    pub initial_context_setup_sent: bool,
}

impl RanUe {
    pub fn new(ran_ue_ngap_id: i64, etaf_ue_ngap_id: i64, ran: WeakContextRef<EtafRan>) -> Self {
        Self {
            ran_ue_ngap_id,
            etaf_ue_ngap_id,
            ran,
            etaf_ue: WeakContextRef::new(),
            tai: Tai::default(),
            location: UserLocation::default(),
            ue_context_request: false,
            initial_context_setup_sent: false,
        }
    }
}

impl RanUeRef {
    /// Access type of the owning RAN, `None` once the RAN is gone
    ///
    /// The link lock is released before the RAN lock is taken.
    pub fn an_type(&self) -> Option<AccessType> {
        let ran = self.read().ran.clone();
        ran.upgrade().map(|ran| ran.read().an_type)
    }

    pub fn etaf_ue_ngap_id(&self) -> i64 {
        self.read().etaf_ue_ngap_id
    }
}

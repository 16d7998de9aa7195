//! ETAF Context Management
//!
//! The registry owning every UE, RAN and RAN UE context of the process.
//! It is constructed once by the daemon and shared as `Arc<EtafContext>`.
//!
//! Lock order for the per-context locks is UE, then RAN, then RAN UE. No
//! per-context lock is held while a registry pool is mutated.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::EtafConfig;
use crate::error::{ContextError, ContextResult};
use crate::idgen::IdGenerator;
use crate::models::{
    AccessType, EventSubscription, IpEndPoint, NfService, NfServiceVersion, NfStatus, PlmnId,
    Snssai, StatusSubscriptionData,
};
use crate::ran::{EtafRan, RanNodeId, RanUe};
use crate::ue::EtafUe;

// ============================================================================
// Shared Context Handles
// ============================================================================

/// Shared, lockable handle to a context object
#[derive(Debug)]
pub struct ContextRef<T>(Arc<RwLock<T>>);

impl<T> Clone for ContextRef<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> ContextRef<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Shared access; a poisoned lock is recovered
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access; a poisoned lock is recovered
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Non-owning back reference
    pub fn downgrade(&self) -> WeakContextRef<T> {
        WeakContextRef(Arc::downgrade(&self.0))
    }

    /// Same context object
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Non-owning handle used for navigation from links back to their owners
#[derive(Debug)]
pub struct WeakContextRef<T>(Weak<RwLock<T>>);

impl<T> WeakContextRef<T> {
    /// Handle that never upgrades
    pub fn new() -> Self {
        Self(Weak::new())
    }

    pub fn upgrade(&self) -> Option<ContextRef<T>> {
        self.0.upgrade().map(ContextRef)
    }
}

impl<T> Clone for WeakContextRef<T> {
    fn clone(&self) -> Self {
        Self(Weak::clone(&self.0))
    }
}

impl<T> Default for WeakContextRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type UeRef = ContextRef<EtafUe>;
pub type RanRef = ContextRef<EtafRan>;
pub type RanUeRef = ContextRef<RanUe>;

// ============================================================================
// ETAF Context (Registry)
// ============================================================================

/// ETAF context registry
pub struct EtafContext {
    /// NF instance ID
    nf_id: String,
    /// Configuration snapshot
    config: RwLock<EtafConfig>,
    /// Services registered with the NRF, by service name
    nf_services: RwLock<HashMap<String, NfService>>,

    // Pools
    /// Every live UE, by 5G-TMSI
    ue_pool: DashMap<i32, UeRef>,
    /// UEs with a known SUPI, by SUPI
    supi_pool: DashMap<String, UeRef>,
    /// RAN UEs by ETAF UE NGAP ID
    ran_ue_pool: DashMap<i64, RanUeRef>,
    /// RANs by transport connection
    ran_pool: DashMap<SocketAddr, RanRef>,
    /// Event exposure subscriptions by subscription ID
    event_subscriptions: DashMap<String, EventSubscription>,
    /// Status change subscriptions by subscription ID
    status_subscriptions: DashMap<String, StatusSubscriptionData>,

    // ID generators
    tmsi_generator: IdGenerator,
    etaf_ue_ngap_id_generator: IdGenerator,
    event_subscription_id_generator: IdGenerator,
    status_subscription_id_generator: IdGenerator,
}

impl Default for EtafContext {
    fn default() -> Self {
        Self::new(EtafConfig::default())
    }
}

impl EtafContext {
    /// Create a registry from a configuration snapshot
    pub fn new(config: EtafConfig) -> Self {
        let max_etaf_ue_ngap_id = config.max_etaf_ue_ngap_id;
        Self {
            nf_id: uuid::Uuid::new_v4().to_string(),
            config: RwLock::new(config),
            nf_services: RwLock::new(HashMap::new()),
            ue_pool: DashMap::new(),
            supi_pool: DashMap::new(),
            ran_ue_pool: DashMap::new(),
            ran_pool: DashMap::new(),
            event_subscriptions: DashMap::new(),
            status_subscriptions: DashMap::new(),
            tmsi_generator: IdGenerator::new(1, i32::MAX as i64),
            etaf_ue_ngap_id_generator: IdGenerator::new(1, max_etaf_ue_ngap_id),
            event_subscription_id_generator: IdGenerator::new(1, i32::MAX as i64),
            status_subscription_id_generator: IdGenerator::new(1, i32::MAX as i64),
        }
    }

    pub fn nf_id(&self) -> &str {
        &self.nf_id
    }

    /// Read the configuration snapshot
    pub fn config(&self) -> RwLockReadGuard<'_, EtafConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Modify the configuration snapshot
    pub fn config_mut(&self) -> RwLockWriteGuard<'_, EtafConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tmsi_generator(&self) -> &IdGenerator {
        &self.tmsi_generator
    }

    pub fn etaf_ue_ngap_id_generator(&self) -> &IdGenerator {
        &self.etaf_ue_ngap_id_generator
    }

    // ========================================================================
    // Self Identity
    // ========================================================================

    /// `scheme://register_ipv4:port`
    pub fn ipv4_uri(&self) -> String {
        let config = self.config();
        format!(
            "{}://{}:{}",
            config.uri_scheme, config.register_ipv4, config.sbi_port
        )
    }

    /// Build the service entries registered with the NRF
    pub fn init_nf_service(&self, service_names: &[String], version: &str) {
        let major = version.split('.').next().unwrap_or(version);
        let version_uri = format!("v{}", major);
        let api_prefix = self.ipv4_uri();
        let (scheme, register_ipv4, port) = {
            let config = self.config();
            (
                config.uri_scheme,
                config.register_ipv4.clone(),
                config.sbi_port,
            )
        };

        let mut services = self
            .nf_services
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (index, name) in service_names.iter().enumerate() {
            services.insert(
                name.clone(),
                NfService {
                    service_instance_id: index.to_string(),
                    service_name: name.clone(),
                    versions: vec![NfServiceVersion {
                        api_version_in_uri: version_uri.clone(),
                        api_full_version: version.to_string(),
                    }],
                    scheme,
                    nf_service_status: NfStatus::Registered,
                    fqdn: None,
                    api_prefix: Some(api_prefix.clone()),
                    ip_end_points: vec![IpEndPoint {
                        ipv4_address: Some(register_ipv4.clone()),
                        port: Some(port),
                    }],
                },
            );
            log::debug!("NF service [{}] initialized ({})", name, version_uri);
        }
    }

    /// Registered NF services
    pub fn nf_services(&self) -> HashMap<String, NfService> {
        self.nf_services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn in_support_dnn_list(&self, dnn: &str) -> bool {
        self.config().support_dnn_list.iter().any(|d| d == dnn)
    }

    pub fn in_plmn_support_list(&self, plmn_id: &PlmnId) -> bool {
        self.config()
            .plmn_support_list
            .iter()
            .any(|item| &item.plmn_id == plmn_id)
    }

    /// Whether `snssai` is supported for `plmn_id`
    pub fn in_supported_snssai(&self, plmn_id: &PlmnId, snssai: &Snssai) -> bool {
        self.config()
            .plmn_support_list
            .iter()
            .filter(|item| &item.plmn_id == plmn_id)
            .any(|item| item.snssai_list.contains(snssai))
    }

    // ========================================================================
    // ETAF UE Management
    // ========================================================================

    /// Build a 5G-GUTI from the first served GUAMI and a 5G-TMSI
    fn build_guti(&self, tmsi: i32) -> ContextResult<String> {
        let config = self.config();
        let guami = config
            .served_guami_list
            .first()
            .ok_or(ContextError::NoServedGuami)?;
        Ok(format!(
            "{}{}{}{:08x}",
            guami.plmn_id.mcc, guami.plmn_id.mnc, guami.amf_id, tmsi
        ))
    }

    fn allocate_tmsi(&self) -> ContextResult<i32> {
        // Range is [1, i32::MAX]
        Ok(self.tmsi_generator.allocate()? as i32)
    }

    fn free_tmsi(&self, tmsi: i32) {
        if let Err(e) = self.tmsi_generator.free(tmsi as i64) {
            log::error!("Failed to free TMSI {}: {}", tmsi, e);
        }
    }

    /// Create a UE context with a fresh 5G-TMSI and GUTI
    ///
    /// A non-empty `supi` also indexes the UE by SUPI.
    pub fn etaf_ue_add(&self, supi: Option<&str>) -> ContextResult<UeRef> {
        let tmsi = self.allocate_tmsi()?;
        let guti = match self.build_guti(tmsi) {
            Ok(guti) => guti,
            Err(e) => {
                self.free_tmsi(tmsi);
                return Err(e);
            }
        };

        let supi = match supi {
            Some("") => {
                log::error!("SUPI is empty; UE context created without SUPI");
                None
            }
            other => other,
        };

        let mut ue = EtafUe::new();
        ue.tmsi = tmsi;
        ue.guti = guti;
        ue.supi = supi.map(str::to_string);
        let ue = ContextRef::new(ue);

        if let Some(supi) = supi {
            match self.supi_pool.entry(supi.to_string()) {
                Entry::Occupied(_) => {
                    self.free_tmsi(tmsi);
                    log::error!("[{}] SUPI already bound to another UE context", supi);
                    return Err(ContextError::IdentityInUse(supi.to_string()));
                }
                Entry::Vacant(entry) => {
                    entry.insert(ue.clone());
                }
            }
            ue.write().indexed_supi = Some(supi.to_string());
        }
        self.ue_pool.insert(tmsi, ue.clone());

        log::info!(
            "[{}] ETAF UE added (tmsi={:#010x})",
            supi.unwrap_or("-"),
            tmsi
        );
        Ok(ue)
    }

    /// Index a UE by the SUPI learned after creation
    pub fn etaf_ue_set_supi(&self, ue: &UeRef, supi: &str) -> ContextResult<()> {
        if supi.is_empty() {
            log::error!("SUPI is empty");
            return Ok(());
        }
        if let Some(existing) = ue.read().supi.as_deref() {
            if existing != supi {
                return Err(ContextError::IdentityInUse(existing.to_string()));
            }
        }

        match self.supi_pool.entry(supi.to_string()) {
            Entry::Occupied(entry) => {
                if !entry.get().ptr_eq(ue) {
                    return Err(ContextError::IdentityInUse(supi.to_string()));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(ue.clone());
            }
        }
        {
            let mut ue = ue.write();
            ue.supi = Some(supi.to_string());
            ue.indexed_supi = Some(supi.to_string());
        }
        log::debug!("[{}] SUPI bound to UE context", supi);
        Ok(())
    }

    /// Replace the UE's 5G-TMSI and GUTI with freshly allocated ones
    pub fn etaf_ue_reallocate_guti(&self, ue: &UeRef) -> ContextResult<()> {
        let tmsi = self.allocate_tmsi()?;
        let guti = match self.build_guti(tmsi) {
            Ok(guti) => guti,
            Err(e) => {
                self.free_tmsi(tmsi);
                return Err(e);
            }
        };

        let old_tmsi = {
            let mut ue = ue.write();
            let old = ue.tmsi;
            ue.tmsi = tmsi;
            ue.guti = guti;
            old
        };
        self.ue_pool.insert(tmsi, ue.clone());
        self.ue_pool.remove_if(&old_tmsi, |_, v| v.ptr_eq(ue));
        self.free_tmsi(old_tmsi);
        Ok(())
    }

    /// Set the registration area to the served TAI equal to the UE's TAI
    pub fn allocate_registration_area(&self, ue: &mut EtafUe, an_type: AccessType) {
        ue.registration_area[an_type].clear();

        let config = self.config();
        if let Some(tai) = config.support_tai_list.iter().find(|tai| **tai == ue.tai) {
            ue.registration_area[an_type].push(tai.clone());
        }
    }

    /// Remove a UE: every attached RAN UE, its TMSI and its pool entries
    ///
    /// The SUPI entry dropped is the one the UE was indexed under, whatever
    /// the `supi` field holds by now.
    pub fn etaf_ue_remove(&self, ue: &UeRef) -> ContextResult<()> {
        let (tmsi, supi, links) = {
            let ue = ue.read();
            let links: Vec<RanUeRef> = ue.ran_ue.iter().filter_map(|(_, r)| r.clone()).collect();
            (ue.tmsi, ue.indexed_supi.clone(), links)
        };

        for ran_ue in links {
            if let Err(e) = self.ran_ue_remove(&ran_ue) {
                log::error!("[{}] Failed to remove RAN UE: {}", supi.as_deref().unwrap_or("-"), e);
            }
        }

        if let Some(supi) = supi.as_deref() {
            self.supi_pool.remove_if(supi, |_, v| v.ptr_eq(ue));
        }
        self.ue_pool.remove_if(&tmsi, |_, v| v.ptr_eq(ue));
        self.tmsi_generator.free(tmsi as i64)?;

        log::info!(
            "[{}] ETAF UE removed (tmsi={:#010x})",
            supi.as_deref().unwrap_or("-"),
            tmsi
        );
        Ok(())
    }

    /// Snapshot of every live UE
    pub fn etaf_ue_list(&self) -> Vec<UeRef> {
        self.ue_pool.iter().map(|e| e.value().clone()).collect()
    }

    pub fn etaf_ue_count(&self) -> usize {
        self.ue_pool.len()
    }

    pub fn etaf_ue_find_by_supi(&self, supi: &str) -> Option<UeRef> {
        self.supi_pool.get(supi).map(|e| e.value().clone())
    }

    pub fn etaf_ue_find_by_tmsi(&self, tmsi: i32) -> Option<UeRef> {
        self.ue_pool.get(&tmsi).map(|e| e.value().clone())
    }

    fn etaf_ue_find(&self, pred: impl Fn(&EtafUe) -> bool) -> Option<UeRef> {
        self.etaf_ue_list().into_iter().find(|ue| pred(&*ue.read()))
    }

    pub fn etaf_ue_find_by_pei(&self, pei: &str) -> Option<UeRef> {
        self.etaf_ue_find(|ue| ue.pei.as_deref() == Some(pei))
    }

    pub fn etaf_ue_find_by_guti(&self, guti: &str) -> Option<UeRef> {
        self.etaf_ue_find(|ue| ue.guti == guti)
    }

    pub fn etaf_ue_find_by_policy_association_id(&self, id: &str) -> Option<UeRef> {
        self.etaf_ue_find(|ue| ue.policy_association_id.as_deref() == Some(id))
    }

    /// Find by a UE context ID as used in Namf-style resource paths
    ///
    /// `imsi-...` is a SUPI, `imei...` a PEI, and `5g-guti-<guti>` a GUTI.
    pub fn etaf_ue_find_by_ue_context_id(&self, ue_context_id: &str) -> Option<UeRef> {
        if ue_context_id.starts_with("imsi") {
            self.etaf_ue_find_by_supi(ue_context_id)
        } else if ue_context_id.starts_with("imei") {
            self.etaf_ue_find_by_pei(ue_context_id)
        } else if ue_context_id.starts_with("5g-guti") {
            let guti = ue_context_id.rsplit('-').next().unwrap_or_default();
            self.etaf_ue_find_by_guti(guti)
        } else {
            log::debug!("[{}] Unknown UE context ID type", ue_context_id);
            None
        }
    }

    // ========================================================================
    // RAN Management
    // ========================================================================

    /// Register a RAN for a transport connection
    pub fn ran_add(&self, conn: SocketAddr) -> RanRef {
        match self.ran_pool.entry(conn) {
            Entry::Occupied(entry) => {
                log::warn!("[{}] RAN already registered", conn);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let ran = ContextRef::new(EtafRan::new(conn));
                entry.insert(ran.clone());
                log::info!("[{}] RAN added", conn);
                ran
            }
        }
    }

    pub fn ran_find_by_conn(&self, conn: &SocketAddr) -> Option<RanRef> {
        self.ran_pool.get(conn).map(|e| e.value().clone())
    }

    /// Linear scan comparing the shape-specific node identifier
    pub fn ran_find_by_ran_id(&self, ran_id: &RanNodeId) -> Option<RanRef> {
        let rans: Vec<RanRef> = self.ran_pool.iter().map(|e| e.value().clone()).collect();
        rans.into_iter().find(|ran| {
            ran.read()
                .ran_id
                .as_ref()
                .is_some_and(|id| id.matches(ran_id))
        })
    }

    /// Remove every RAN UE of `ran`, logging individual failures
    pub fn ran_remove_all_ue(&self, ran: &RanRef) {
        self.release_ran_ues(ran, false);
    }

    /// Detach the RAN UE list, marking the RAN removed in the same critical
    /// section so that no `ran_ue_add` can slip in afterwards
    fn release_ran_ues(&self, ran: &RanRef, mark_removed: bool) {
        let (conn, links) = {
            let mut ran = ran.write();
            if mark_removed {
                ran.removed = true;
            }
            (ran.conn, std::mem::take(&mut ran.ran_ue_list))
        };
        for ran_ue in links {
            if let Err(e) = self.ran_ue_remove(&ran_ue) {
                log::error!("[{}] Failed to remove RAN UE: {}", conn, e);
            }
        }
    }

    /// Remove the RAN of a connection and all of its RAN UEs
    pub fn ran_remove(&self, conn: &SocketAddr) -> Option<RanRef> {
        let ran = self.ran_pool.get(conn)?.value().clone();
        self.release_ran_ues(&ran, true);
        self.ran_pool.remove_if(conn, |_, v| v.ptr_eq(&ran));
        log::info!("[{}] RAN removed", conn);
        Some(ran)
    }

    pub fn ran_count(&self) -> usize {
        self.ran_pool.len()
    }

    // ========================================================================
    // RAN UE Management
    // ========================================================================

    /// Create a RAN UE on `ran` with a fresh ETAF UE NGAP ID
    ///
    /// Fails with `RanGone` once `ran` has been removed from the registry.
    pub fn ran_ue_add(&self, ran: &RanRef, ran_ue_ngap_id: i64) -> ContextResult<RanUeRef> {
        let etaf_ue_ngap_id = self.etaf_ue_ngap_id_generator.allocate()?;
        let ran_ue = ContextRef::new(RanUe::new(ran_ue_ngap_id, etaf_ue_ngap_id, ran.downgrade()));

        let conn = {
            let mut ran = ran.write();
            if ran.removed {
                None
            } else {
                ran.ran_ue_list.push(ran_ue.clone());
                // A pooled RAN UE is always in its RAN's list until released
                self.ran_ue_pool.insert(etaf_ue_ngap_id, ran_ue.clone());
                Some(ran.conn)
            }
        };
        let Some(conn) = conn else {
            log::warn!(
                "RAN removed before RAN UE could be added (ran_ue_ngap_id={})",
                ran_ue_ngap_id
            );
            self.etaf_ue_ngap_id_generator.free(etaf_ue_ngap_id)?;
            return Err(ContextError::RanGone(etaf_ue_ngap_id));
        };

        log::debug!(
            "[{}] RAN UE added (ran_ue_ngap_id={}, etaf_ue_ngap_id={})",
            conn,
            ran_ue_ngap_id,
            etaf_ue_ngap_id
        );
        Ok(ran_ue)
    }

    /// Remove a RAN UE
    ///
    /// Detaches it from its UE (the UE stays), drops it from the pool and
    /// from its RAN, and frees its ETAF UE NGAP ID. Only the caller that
    /// takes the RAN UE out of the pool frees the ID; any later removal
    /// fails with `IdNotAllocated`.
    pub fn ran_ue_remove(&self, ran_ue: &RanUeRef) -> ContextResult<()> {
        let (etaf_ue_ngap_id, ran, etaf_ue) = {
            let r = ran_ue.read();
            (r.etaf_ue_ngap_id, r.ran.clone(), r.etaf_ue.clone())
        };

        if let Some(ue) = etaf_ue.upgrade() {
            let mut ue = ue.write();
            for an_type in AccessType::ALL {
                if ue.ran_ue[an_type]
                    .as_ref()
                    .is_some_and(|attached| attached.ptr_eq(ran_ue))
                {
                    ue.detach_ran_ue(an_type);
                }
            }
        }

        if let Some(ran) = ran.upgrade() {
            ran.write().ran_ue_list.retain(|r| !r.ptr_eq(ran_ue));
        }
        if self
            .ran_ue_pool
            .remove_if(&etaf_ue_ngap_id, |_, v| v.ptr_eq(ran_ue))
            .is_none()
        {
            return Err(ContextError::IdNotAllocated(etaf_ue_ngap_id));
        }
        self.etaf_ue_ngap_id_generator.free(etaf_ue_ngap_id)?;

        log::debug!("RAN UE removed (etaf_ue_ngap_id={})", etaf_ue_ngap_id);
        Ok(())
    }

    pub fn ran_ue_find_by_etaf_ue_ngap_id(&self, etaf_ue_ngap_id: i64) -> Option<RanUeRef> {
        self.ran_ue_pool
            .get(&etaf_ue_ngap_id)
            .map(|e| e.value().clone())
    }

    pub fn ran_ue_count(&self) -> usize {
        self.ran_ue_pool.len()
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Store a status subscription; returns its ID
    pub fn new_status_subscription(&self, data: StatusSubscriptionData) -> ContextResult<String> {
        let id = self.status_subscription_id_generator.allocate()?.to_string();
        self.status_subscriptions.insert(id.clone(), data);
        log::debug!("Status subscription [{}] created", id);
        Ok(id)
    }

    pub fn find_status_subscription(&self, id: &str) -> Option<StatusSubscriptionData> {
        self.status_subscriptions.get(id).map(|e| e.value().clone())
    }

    /// Delete a status subscription and free its ID
    pub fn delete_status_subscription(&self, id: &str) -> bool {
        if self.status_subscriptions.remove(id).is_none() {
            return false;
        }
        if let Ok(n) = id.parse::<i64>() {
            if let Err(e) = self.status_subscription_id_generator.free(n) {
                log::error!("Failed to free status subscription ID [{}]: {}", id, e);
            }
        }
        true
    }

    /// Store an event subscription; returns its ID
    pub fn new_event_subscription(&self, subscription: EventSubscription) -> ContextResult<String> {
        let id = self.event_subscription_id_generator.allocate()?.to_string();
        self.event_subscriptions.insert(id.clone(), subscription);
        log::debug!("Event subscription [{}] created", id);
        Ok(id)
    }

    pub fn find_event_subscription(&self, id: &str) -> Option<EventSubscription> {
        self.event_subscriptions.get(id).map(|e| e.value().clone())
    }

    /// Delete an event subscription and free its ID
    pub fn delete_event_subscription(&self, id: &str) -> bool {
        if self.event_subscriptions.remove(id).is_none() {
            return false;
        }
        if let Ok(n) = id.parse::<i64>() {
            if let Err(e) = self.event_subscription_id_generator.free(n) {
                log::error!("Failed to free event subscription ID [{}]: {}", id, e);
            }
        }
        true
    }

    // ========================================================================
    // Reset
    // ========================================================================

    /// Drop every pool entry, rewind the allocators and restore the
    /// configuration defaults
    ///
    /// The served GUAMI, TAI and PLMN lists come back empty, so a reset
    /// registry needs a fresh configuration before it can add UEs.
    pub fn reset_all(&self) {
        self.ue_pool.clear();
        self.supi_pool.clear();
        self.ran_ue_pool.clear();
        self.ran_pool.clear();
        self.event_subscriptions.clear();
        self.status_subscriptions.clear();

        self.tmsi_generator.reset();
        self.etaf_ue_ngap_id_generator.reset();
        self.event_subscription_id_generator.reset();
        self.status_subscription_id_generator.reset();

        *self.config_mut() = EtafConfig::default();
        self.nf_services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        log::info!("ETAF context reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GnbId, Guami, Tai};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn test_config() -> EtafConfig {
        let plmn_id = PlmnId::new("208", "93");
        EtafConfig {
            served_guami_list: vec![Guami {
                plmn_id: plmn_id.clone(),
                amf_id: "cafe00".to_string(),
            }],
            support_tai_list: vec![
                Tai {
                    plmn_id: plmn_id.clone(),
                    tac: "000001".to_string(),
                },
                Tai {
                    plmn_id,
                    tac: "000002".to_string(),
                },
            ],
            support_dnn_list: vec!["internet".to_string()],
            ..Default::default()
        }
    }

    fn test_context() -> EtafContext {
        EtafContext::new(test_config())
    }

    fn conn(port: u16) -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 1], port))
    }

    #[test]
    fn test_etaf_ue_add_with_supi() {
        let ctx = test_context();
        let ue = ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap();
        let other = ctx.etaf_ue_add(None).unwrap();

        let found = ctx.etaf_ue_find_by_supi("imsi-001010000000001").unwrap();
        assert!(found.ptr_eq(&ue));

        let (guti, tmsi) = {
            let ue = found.read();
            (ue.guti.clone(), ue.tmsi)
        };
        assert!(!guti.is_empty());
        assert_eq!(guti, format!("20893cafe00{:08x}", tmsi));
        assert_ne!(guti, other.read().guti);
    }

    #[test]
    fn test_etaf_ue_add_empty_supi_still_usable() {
        let ctx = test_context();
        let ue = ctx.etaf_ue_add(Some("")).unwrap();
        assert!(ue.read().supi.is_none());
        assert!(ctx.etaf_ue_find_by_supi("").is_none());
        assert_eq!(ctx.etaf_ue_count(), 1);
    }

    #[test]
    fn test_etaf_ue_add_requires_guami() {
        let ctx = EtafContext::default();
        assert!(matches!(
            ctx.etaf_ue_add(None),
            Err(ContextError::NoServedGuami)
        ));
        assert_eq!(ctx.tmsi_generator().allocated_count(), 0);
    }

    #[test]
    fn test_duplicate_supi_rejected() {
        let ctx = test_context();
        ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap();
        let err = ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap_err();
        assert!(matches!(err, ContextError::IdentityInUse(_)));
        assert_eq!(ctx.etaf_ue_count(), 1);
        assert_eq!(ctx.tmsi_generator().allocated_count(), 1);
    }

    #[test]
    fn test_etaf_ue_set_supi() {
        let ctx = test_context();
        let ue = ctx.etaf_ue_add(None).unwrap();
        ctx.etaf_ue_set_supi(&ue, "imsi-001010000000002").unwrap();
        assert!(ctx
            .etaf_ue_find_by_supi("imsi-001010000000002")
            .unwrap()
            .ptr_eq(&ue));
        // Rebinding to the same SUPI is a no-op, a different one is refused
        ctx.etaf_ue_set_supi(&ue, "imsi-001010000000002").unwrap();
        assert!(ctx.etaf_ue_set_supi(&ue, "imsi-001010000000003").is_err());
    }

    #[test]
    fn test_etaf_ue_remove_frees_tmsi() {
        let ctx = test_context();
        let ue = ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap();
        let tmsi = ue.read().tmsi;

        ctx.etaf_ue_remove(&ue).unwrap();
        assert!(ctx.etaf_ue_find_by_supi("imsi-001010000000001").is_none());
        assert!(ctx.etaf_ue_find_by_tmsi(tmsi).is_none());
        assert!(!ctx.tmsi_generator().is_allocated(tmsi as i64));
        assert_eq!(ctx.etaf_ue_count(), 0);
    }

    #[test]
    fn test_merged_supi_does_not_outlive_remove() {
        let ctx = test_context();
        let ue = ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap();
        let model = crate::models::UeContext {
            supi: "imsi-001010000000002".to_string(),
            ..Default::default()
        };
        crate::context_transfer::merge_from_ue_context_model(&mut ue.write(), &model).unwrap();
        assert_eq!(ue.read().supi.as_deref(), Some("imsi-001010000000001"));

        // Even a SUPI rewritten behind the registry's back is unindexed
        ue.write().supi = Some("imsi-001010000000003".to_string());
        ctx.etaf_ue_remove(&ue).unwrap();
        assert!(ctx.etaf_ue_find_by_supi("imsi-001010000000001").is_none());
        assert!(ctx.etaf_ue_find_by_supi("imsi-001010000000002").is_none());
        assert!(ctx.etaf_ue_add(Some("imsi-001010000000001")).is_ok());
    }

    #[test]
    fn test_etaf_ue_remove_cascades_to_ran_ue() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(38412));
        let ran_ue = ctx.ran_ue_add(&ran, 7).unwrap();
        let ue = ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap();
        ue.attach_ran_ue(&ran_ue).unwrap();
        let id = ran_ue.etaf_ue_ngap_id();

        ctx.etaf_ue_remove(&ue).unwrap();
        assert!(ctx.ran_ue_find_by_etaf_ue_ngap_id(id).is_none());
        assert!(ran.read().find_ran_ue_by_ran_ue_ngap_id(7).is_none());
        assert!(!ctx.etaf_ue_ngap_id_generator().is_allocated(id));
    }

    #[test]
    fn test_etaf_ue_reallocate_guti() {
        let ctx = test_context();
        let ue = ctx.etaf_ue_add(None).unwrap();
        let (old_tmsi, old_guti) = {
            let ue = ue.read();
            (ue.tmsi, ue.guti.clone())
        };

        ctx.etaf_ue_reallocate_guti(&ue).unwrap();
        let new_tmsi = ue.read().tmsi;
        assert_ne!(new_tmsi, old_tmsi);
        assert_ne!(ue.read().guti, old_guti);
        assert!(ctx.etaf_ue_find_by_tmsi(old_tmsi).is_none());
        assert!(ctx.etaf_ue_find_by_tmsi(new_tmsi).unwrap().ptr_eq(&ue));
        assert!(!ctx.tmsi_generator().is_allocated(old_tmsi as i64));
    }

    #[test]
    fn test_find_by_secondary_identities() {
        let ctx = test_context();
        let ue = ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap();
        {
            let mut ue = ue.write();
            ue.pei = Some("imeisv-4370816125816151".to_string());
            ue.policy_association_id = Some("imsi-001010000000001-1".to_string());
        }
        let guti = ue.read().guti.clone();

        assert!(ctx
            .etaf_ue_find_by_pei("imeisv-4370816125816151")
            .unwrap()
            .ptr_eq(&ue));
        assert!(ctx.etaf_ue_find_by_guti(&guti).unwrap().ptr_eq(&ue));
        assert!(ctx
            .etaf_ue_find_by_policy_association_id("imsi-001010000000001-1")
            .unwrap()
            .ptr_eq(&ue));
        assert!(ctx.etaf_ue_find_by_pei("imeisv-0").is_none());
    }

    #[test]
    fn test_find_by_ue_context_id() {
        let ctx = test_context();
        let ue = ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap();
        ue.write().pei = Some("imei-4370816125816151".to_string());
        let guti = ue.read().guti.clone();

        for id in [
            "imsi-001010000000001".to_string(),
            "imei-4370816125816151".to_string(),
            format!("5g-guti-{}", guti),
        ] {
            assert!(ctx.etaf_ue_find_by_ue_context_id(&id).unwrap().ptr_eq(&ue));
        }
        assert!(ctx.etaf_ue_find_by_ue_context_id("nai-foo").is_none());
    }

    #[test]
    fn test_allocate_registration_area() {
        let ctx = test_context();
        let mut ue = EtafUe::new();
        let an = AccessType::ThreeGppAccess;
        ue.registration_area[an] = vec![Tai::default()];
        ue.tai = ctx.config().support_tai_list[1].clone();

        ctx.allocate_registration_area(&mut ue, an);
        assert_eq!(ue.registration_area[an], vec![ue.tai.clone()]);

        ue.tai.tac = "0000ff".to_string();
        ctx.allocate_registration_area(&mut ue, an);
        assert!(ue.registration_area[an].is_empty());
    }

    #[test]
    fn test_ran_add_and_find() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(1));
        let gnb = RanNodeId::Gnb {
            plmn_id: PlmnId::new("208", "93"),
            gnb_id: GnbId {
                bit_length: 24,
                gnb_value: "000102".to_string(),
            },
        };
        ran.write().set_ran_id(gnb.clone());

        assert!(ctx.ran_find_by_conn(&conn(1)).unwrap().ptr_eq(&ran));
        assert!(ctx.ran_find_by_ran_id(&gnb).unwrap().ptr_eq(&ran));
        assert!(ctx.ran_add(conn(1)).ptr_eq(&ran));
        assert_eq!(ctx.ran_count(), 1);
    }

    #[test]
    fn test_ran_remove_releases_links() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(1));
        let ran_ue = ctx.ran_ue_add(&ran, 42).unwrap();
        let id = ran_ue.etaf_ue_ngap_id();

        assert!(ran
            .read()
            .find_ran_ue_by_ran_ue_ngap_id(42)
            .unwrap()
            .ptr_eq(&ran_ue));

        ctx.ran_remove(&conn(1)).unwrap();
        assert!(ran.read().find_ran_ue_by_ran_ue_ngap_id(42).is_none());
        assert!(!ctx.etaf_ue_ngap_id_generator().is_allocated(id));
        assert!(ctx.ran_find_by_conn(&conn(1)).is_none());
        assert!(ctx.ran_remove(&conn(1)).is_none());
    }

    #[test]
    fn test_ran_ue_add_after_ran_remove() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(1));
        ctx.ran_remove(&conn(1)).unwrap();
        assert!(ran.read().is_removed());

        assert!(matches!(
            ctx.ran_ue_add(&ran, 42),
            Err(ContextError::RanGone(_))
        ));
        assert!(ran.read().ran_ue_list.is_empty());
        assert_eq!(ctx.ran_ue_count(), 0);
        assert_eq!(ctx.etaf_ue_ngap_id_generator().allocated_count(), 0);
    }

    #[test]
    fn test_ran_remove_all_ue_keeps_ran_usable() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(1));
        ctx.ran_ue_add(&ran, 1).unwrap();
        ctx.ran_remove_all_ue(&ran);

        assert!(!ran.read().is_removed());
        assert!(ctx.ran_ue_add(&ran, 2).is_ok());
        assert_eq!(ctx.ran_ue_count(), 1);
    }

    #[test]
    fn test_ran_ue_remove_twice_fails() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(1));
        let ran_ue = ctx.ran_ue_add(&ran, 1).unwrap();
        ctx.ran_ue_remove(&ran_ue).unwrap();
        assert!(matches!(
            ctx.ran_ue_remove(&ran_ue),
            Err(ContextError::IdNotAllocated(_))
        ));
    }

    #[test]
    fn test_ran_ue_add_exhausted() {
        let config = EtafConfig {
            max_etaf_ue_ngap_id: 1,
            ..test_config()
        };
        let ctx = EtafContext::new(config);
        let ran = ctx.ran_add(conn(1));
        ctx.ran_ue_add(&ran, 1).unwrap();
        let err = ctx.ran_ue_add(&ran, 2).unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(ran.read().ran_ue_list.len(), 1);
    }

    #[test]
    fn test_attach_detach_link() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(1));
        let first = ctx.ran_ue_add(&ran, 1).unwrap();
        let second = ctx.ran_ue_add(&ran, 2).unwrap();
        let ue = ctx.etaf_ue_add(None).unwrap();
        let an = AccessType::ThreeGppAccess;

        ue.attach_ran_ue(&first).unwrap();
        assert!(ue.read().cm_connect(an));
        assert!(first.read().etaf_ue.upgrade().unwrap().ptr_eq(&ue));

        // Overwrite without detaching
        ue.attach_ran_ue(&second).unwrap();
        assert!(ue.read().ran_ue(an).unwrap().ptr_eq(&second));

        ue.write().detach_ran_ue(an);
        assert!(ue.read().cm_idle(an));
        assert!(!ue.read().cm_connect(an));
        // The link record itself survives a detach
        assert!(ctx
            .ran_ue_find_by_etaf_ue_ngap_id(second.etaf_ue_ngap_id())
            .is_some());
    }

    #[test]
    fn test_attach_uses_ran_access_type() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(2));
        ran.write().set_ran_id(RanNodeId::N3Iwf {
            plmn_id: PlmnId::new("208", "93"),
            n3iwf_id: "n3iwf-1".to_string(),
        });
        let ran_ue = ctx.ran_ue_add(&ran, 1).unwrap();
        let ue = ctx.etaf_ue_add(None).unwrap();
        ue.attach_ran_ue(&ran_ue).unwrap();

        let ue = ue.read();
        assert!(ue.cm_connect(AccessType::NonThreeGppAccess));
        assert!(ue.cm_idle(AccessType::ThreeGppAccess));
        assert_eq!(ue.get_an_type(), Some(AccessType::NonThreeGppAccess));
    }

    #[test]
    fn test_clear_registration_request_data_with_link() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(1));
        let ran_ue = ctx.ran_ue_add(&ran, 1).unwrap();
        ran_ue.write().ue_context_request = true;
        let ue = ctx.etaf_ue_add(None).unwrap();
        ue.attach_ran_ue(&ran_ue).unwrap();

        {
            let mut ue = ue.write();
            ue.registration.registration_type_5gs = 1;
            ue.registration.auth_failure_cause_synch_failure_times = 2;
            ue.clear_registration_request_data(AccessType::ThreeGppAccess)
                .unwrap();
            assert_eq!(ue.registration.registration_type_5gs, 0);
            assert_eq!(ue.registration.auth_failure_cause_synch_failure_times, 0);
        }
        assert!(!ran_ue.read().ue_context_request);
    }

    #[test]
    fn test_status_subscriptions() {
        let ctx = test_context();
        let id = ctx
            .new_status_subscription(StatusSubscriptionData {
                amf_status_uri: "http://peer/status".to_string(),
                guami_list: Vec::new(),
            })
            .unwrap();
        assert_eq!(id, "1");
        assert!(ctx.find_status_subscription(&id).is_some());
        assert!(ctx.delete_status_subscription(&id));
        assert!(!ctx.delete_status_subscription(&id));
        assert!(ctx.find_status_subscription(&id).is_none());
    }

    #[test]
    fn test_event_subscriptions() {
        let ctx = test_context();
        let id = ctx
            .new_event_subscription(EventSubscription {
                event_list: vec!["LOCATION_REPORT".to_string()],
                any_ue: true,
                ..Default::default()
            })
            .unwrap();
        assert!(ctx.find_event_subscription(&id).unwrap().any_ue);
        assert!(ctx.delete_event_subscription(&id));
    }

    #[test]
    fn test_self_identity() {
        let ctx = test_context();
        assert_eq!(ctx.ipv4_uri(), "https://127.0.0.1:8000");
        assert!(!ctx.nf_id().is_empty());

        ctx.init_nf_service(
            &["netaf-comm".to_string(), "netaf-evts".to_string()],
            "1.0.0",
        );
        let services = ctx.nf_services();
        let comm = &services["netaf-comm"];
        assert_eq!(comm.service_instance_id, "0");
        assert_eq!(comm.versions[0].api_version_in_uri, "v1");
        assert_eq!(comm.nf_service_status, NfStatus::Registered);
        assert_eq!(comm.api_prefix.as_deref(), Some("https://127.0.0.1:8000"));
        assert_eq!(services["netaf-evts"].service_instance_id, "1");

        assert!(ctx.in_support_dnn_list("internet"));
        assert!(!ctx.in_support_dnn_list("ims"));
    }

    #[test]
    fn test_plmn_and_slice_support() {
        let plmn_id = PlmnId::new("208", "93");
        let mut config = test_config();
        config.plmn_support_list.push(crate::config::PlmnSupportItem {
            plmn_id: plmn_id.clone(),
            snssai_list: vec![Snssai::new(1, Some("010203"))],
        });
        let ctx = EtafContext::new(config);

        assert!(ctx.in_plmn_support_list(&plmn_id));
        assert!(!ctx.in_plmn_support_list(&PlmnId::new("001", "01")));
        assert!(ctx.in_supported_snssai(&plmn_id, &Snssai::new(1, Some("010203"))));
        assert!(!ctx.in_supported_snssai(&plmn_id, &Snssai::new(1, None)));
    }

    #[test]
    fn test_reset_all() {
        let ctx = test_context();
        let ran = ctx.ran_add(conn(1));
        ctx.ran_ue_add(&ran, 1).unwrap();
        ctx.etaf_ue_add(Some("imsi-001010000000001")).unwrap();
        ctx.config_mut().name = "changed".to_string();

        ctx.reset_all();
        assert_eq!(ctx.etaf_ue_count(), 0);
        assert_eq!(ctx.ran_count(), 0);
        assert_eq!(ctx.ran_ue_count(), 0);
        assert_eq!(ctx.tmsi_generator().allocated_count(), 0);

        let config = ctx.config().clone();
        assert_eq!(config, EtafConfig::default());
        assert_eq!(config.name, "etaf");
        assert!(config.served_guami_list.is_empty());
        assert!(config.support_tai_list.is_empty());
        assert!(config.plmn_support_list.is_empty());
        assert!(matches!(
            ctx.etaf_ue_add(None),
            Err(ContextError::NoServedGuami)
        ));
    }

    #[test]
    fn test_concurrent_ue_churn() {
        let ctx = Arc::new(test_context());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    let mut kept = Vec::new();
                    for i in 0..200 {
                        let supi = format!("imsi-0010100000{:02}{:03}", t, i);
                        let ue = ctx.etaf_ue_add(Some(&supi)).unwrap();
                        if i % 2 == 0 {
                            ctx.etaf_ue_remove(&ue).unwrap();
                        } else {
                            kept.push(ue.read().tmsi);
                        }
                    }
                    kept
                })
            })
            .collect();

        let mut tmsis = HashSet::new();
        for handle in handles {
            for tmsi in handle.join().unwrap() {
                assert!(tmsis.insert(tmsi));
            }
        }
        assert_eq!(ctx.etaf_ue_count(), 800);
        assert_eq!(tmsis.len(), 800);
    }

    #[test]
    fn test_concurrent_lookup_during_removal() {
        let ctx = Arc::new(test_context());
        let stop = Arc::new(AtomicBool::new(false));
        let supi = |t: usize, i: usize| format!("imsi-0010100001{:02}{:03}", t, i);

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    while !stop.load(Ordering::SeqCst) {
                        for t in 0..4 {
                            for i in (0..300).step_by(11) {
                                let key = supi(t, i);
                                let Some(ue) = ctx.etaf_ue_find_by_supi(&key) else {
                                    continue;
                                };
                                let (tmsi, guti) = {
                                    let ue = ue.read();
                                    assert_eq!(ue.supi.as_deref(), Some(key.as_str()));
                                    assert!(!ue.guti.is_empty());
                                    (ue.tmsi, ue.guti.clone())
                                };
                                if let Some(found) = ctx.etaf_ue_find_by_tmsi(tmsi) {
                                    assert_eq!(found.read().tmsi, tmsi);
                                }
                                if let Some(found) = ctx.etaf_ue_find_by_guti(&guti) {
                                    assert_eq!(found.read().guti, guti);
                                }
                            }
                        }
                        for port in 100..104 {
                            if let Some(ran) = ctx.ran_find_by_conn(&conn(port)) {
                                assert_eq!(ran.read().conn, conn(port));
                            }
                        }
                        for id in 1..64 {
                            if let Some(ran_ue) = ctx.ran_ue_find_by_etaf_ue_ngap_id(id) {
                                assert_eq!(ran_ue.etaf_ue_ngap_id(), id);
                            }
                        }
                    }
                })
            })
            .collect();

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for i in 0..300 {
                        let ue = ctx.etaf_ue_add(Some(&supi(t, i))).unwrap();
                        let port = 100 + (i % 4) as u16;
                        let ran = ctx.ran_add(conn(port));
                        match ctx.ran_ue_add(&ran, i as i64) {
                            Ok(ran_ue) => {
                                let _ = ue.attach_ran_ue(&ran_ue);
                            }
                            Err(e) => assert!(matches!(e, ContextError::RanGone(_))),
                        }
                        if i % 7 == t {
                            ctx.ran_remove(&conn(port));
                        }
                        ctx.etaf_ue_remove(&ue).unwrap();
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        stop.store(true, Ordering::SeqCst);
        for reader in readers {
            reader.join().unwrap();
        }

        for port in 100..104 {
            ctx.ran_remove(&conn(port));
        }
        assert_eq!(ctx.etaf_ue_count(), 0);
        assert_eq!(ctx.ran_ue_count(), 0);
        assert_eq!(ctx.tmsi_generator().allocated_count(), 0);
        assert_eq!(ctx.etaf_ue_ngap_id_generator().allocated_count(), 0);
    }
}

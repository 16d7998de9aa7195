//! NextGCore ETAF (Edge Tracking and Access Function)
//!
//! Context core of the ETAF: the registry of UE, RAN and RAN UE contexts,
//! identifier allocation, the GMM registration state machine, NAS security
//! bookkeeping, UE context transfer and the SBI consumer procedures that
//! populate UE state from the NRF, UDM and PCF.

pub mod config;
pub mod consumer;
pub mod context;
pub mod context_transfer;
pub mod error;
pub mod gmm_sm;
pub mod idgen;
pub mod models;
pub mod oam;
pub mod ran;
pub mod security;
pub mod timer;
pub mod ue;

#[cfg(test)]
mod property_tests;

pub use config::EtafConfig;
pub use context::{EtafContext, RanRef, RanUeRef, UeRef};
pub use error::{ConfigError, ConsumerError, ContextError};

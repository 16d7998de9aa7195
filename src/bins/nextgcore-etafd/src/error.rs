//! ETAF Error Types
//!
//! Error taxonomy for the context core, the sibling-NF consumers and the
//! configuration loader. Lookup misses are not errors: finders return `Option`.

use thiserror::Error;

use crate::gmm_sm::GmmState;
use crate::models::{AccessType, NfType, ProblemDetails};

/// Errors raised by the context registry and the per-UE/per-RAN contexts
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("ID space [{min}, {max}] exhausted")]
    IdExhausted { min: i64, max: i64 },

    #[error("ID {id} outside allocator range [{min}, {max}]")]
    IdOutOfRange { id: i64, min: i64, max: i64 },

    #[error("ID {0} is not allocated")]
    IdNotAllocated(i64),

    #[error("No served GUAMI configured")]
    NoServedGuami,

    #[error("Identity {0} already bound to another UE context")]
    IdentityInUse(String),

    #[error("No RAN UE attached for {0}")]
    RanUeNotAttached(AccessType),

    #[error("RAN context of RAN UE [etaf_ue_ngap_id={0}] no longer exists")]
    RanGone(i64),

    #[error("Invalid GMM transition {from} -> {to} on {access_type}")]
    InvalidTransition {
        access_type: AccessType,
        from: GmmState,
        to: GmmState,
    },

    #[error("Security context not valid; {0} cannot enter GMM_STATE_REGISTERED")]
    SecurityContextInvalid(AccessType),

    #[error("UE security capability decode failed: {0}")]
    SecurityCapabilityDecode(#[from] base64::DecodeError),
}

impl ContextError {
    /// Whether the error reports an exhausted identifier space
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::IdExhausted { .. })
    }
}

/// Errors raised by sibling-NF consumer procedures
///
/// A structured problem returned by a peer is not an error; it is surfaced
/// as `Ok(Some(ProblemDetails))` by the consumer functions.
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("server no response")]
    NoResponse,

    #[error("Temporary Redirect For Non NRF Consumer")]
    TemporaryRedirect,

    #[error("{0} instance not found")]
    NoInstance(NfType),

    #[error("UE context has no SUPI")]
    NoSupi,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}

/// Errors raised while loading the YAML configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Result alias for context operations
pub type ContextResult<T> = Result<T, ContextError>;

/// Result alias for consumer procedures: `Ok(None)` on success,
/// `Ok(Some(problem))` when the peer answered with a problem payload
pub type ConsumerResult = Result<Option<ProblemDetails>, ConsumerError>;

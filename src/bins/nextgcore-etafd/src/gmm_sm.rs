//! GMM (5G Mobility Management) State Machine
//!
//! Per-access-type registration state of a UE. The legal transition set is
//! `DEREGISTERED -> AUTHENTICATION -> SECURITY_MODE -> CONTEXT_SETUP ->
//! REGISTERED`, `REGISTERED -> DEREGISTRATION_INITIATED -> DEREGISTERED`,
//! and `* -> DEREGISTERED` on abnormal release. Entering REGISTERED is
//! additionally guarded by the UE's security context being valid.

use std::fmt;

use crate::error::{ContextError, ContextResult};
use crate::models::AccessType;

/// GMM FSM states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GmmState {
    /// UE is not registered
    #[default]
    Deregistered,
    /// Network-initiated deregistration in progress
    DeregistrationInitiated,
    /// Performing authentication
    Authentication,
    /// Establishing NAS security
    SecurityMode,
    /// Setting up the initial UE context in the RAN
    ContextSetup,
    /// UE is registered
    Registered,
}

impl GmmState {
    /// All states
    pub const ALL: [GmmState; 6] = [
        GmmState::Deregistered,
        GmmState::DeregistrationInitiated,
        GmmState::Authentication,
        GmmState::SecurityMode,
        GmmState::ContextSetup,
        GmmState::Registered,
    ];

    /// Get the name of the state
    pub fn name(&self) -> &'static str {
        match self {
            GmmState::Deregistered => "GMM_STATE_DEREGISTERED",
            GmmState::DeregistrationInitiated => "GMM_STATE_DEREGISTRATION_INITIATED",
            GmmState::Authentication => "GMM_STATE_AUTHENTICATION",
            GmmState::SecurityMode => "GMM_STATE_SECURITY_MODE",
            GmmState::ContextSetup => "GMM_STATE_CONTEXT_SETUP",
            GmmState::Registered => "GMM_STATE_REGISTERED",
        }
    }

    /// Whether `next` is in the legal transition set from this state
    ///
    /// This ignores the security guard; see [`is_valid_transition`].
    pub fn can_transition_to(&self, next: GmmState) -> bool {
        use GmmState::*;
        matches!(
            (*self, next),
            (_, Deregistered)
                | (Deregistered, Authentication)
                | (Authentication, SecurityMode)
                | (SecurityMode, ContextSetup)
                | (ContextSetup, Registered)
                | (Registered, DeregistrationInitiated)
        )
    }
}

impl fmt::Display for GmmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conformance predicate over a proposed transition
///
/// A transition into REGISTERED is only valid while the security context is
/// valid, regardless of the source state.
pub fn is_valid_transition(from: GmmState, to: GmmState, security_context_valid: bool) -> bool {
    if to == GmmState::Registered && !security_context_valid {
        return false;
    }
    from.can_transition_to(to)
}

/// Procedure outcome events driving the FSM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GmmEvent {
    /// Registration request accepted for processing, authentication starts
    StartAuthentication,
    /// Authentication succeeded
    AuthenticationSuccess,
    /// Security mode complete received
    SecurityModeComplete,
    /// Initial context setup / registration complete
    ContextSetupComplete,
    /// Network starts a deregistration
    NetworkDeregistration,
    /// Deregistration accept received or deregistration timer exhausted
    DeregistrationComplete,
    /// Abnormal release (radio link failure, procedure failure, reject)
    AbnormalRelease,
}

impl GmmEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GmmEvent::StartAuthentication => "GMM_EVENT_START_AUTHENTICATION",
            GmmEvent::AuthenticationSuccess => "GMM_EVENT_AUTHENTICATION_SUCCESS",
            GmmEvent::SecurityModeComplete => "GMM_EVENT_SECURITY_MODE_COMPLETE",
            GmmEvent::ContextSetupComplete => "GMM_EVENT_CONTEXT_SETUP_COMPLETE",
            GmmEvent::NetworkDeregistration => "GMM_EVENT_NETWORK_DEREGISTRATION",
            GmmEvent::DeregistrationComplete => "GMM_EVENT_DEREGISTRATION_COMPLETE",
            GmmEvent::AbnormalRelease => "GMM_EVENT_ABNORMAL_RELEASE",
        }
    }

    /// State the event leads to when it applies in `state`
    fn target(&self, state: GmmState) -> Option<GmmState> {
        use GmmState::*;
        match (self, state) {
            (GmmEvent::StartAuthentication, Deregistered) => Some(Authentication),
            (GmmEvent::AuthenticationSuccess, Authentication) => Some(SecurityMode),
            (GmmEvent::SecurityModeComplete, SecurityMode) => Some(ContextSetup),
            (GmmEvent::ContextSetupComplete, ContextSetup) => Some(Registered),
            (GmmEvent::NetworkDeregistration, Registered) => Some(DeregistrationInitiated),
            (GmmEvent::DeregistrationComplete, DeregistrationInitiated) => Some(Deregistered),
            (GmmEvent::AbnormalRelease, _) => Some(Deregistered),
            _ => None,
        }
    }
}

/// GMM FSM dispatch result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GmmFsmResult {
    /// Event does not apply in the current state
    Ignored,
    /// State transition occurred
    Transition(GmmState),
    /// Transition refused by the security guard
    Rejected,
}

/// GMM State Machine for one access type
#[derive(Debug, Clone)]
pub struct GmmFsm {
    /// Current state
    state: GmmState,
    /// Access type this FSM tracks
    access_type: AccessType,
}

impl GmmFsm {
    /// Create a new GMM FSM in DEREGISTERED
    pub fn new(access_type: AccessType) -> Self {
        Self {
            state: GmmState::Deregistered,
            access_type,
        }
    }

    pub fn state(&self) -> GmmState {
        self.state
    }

    pub fn access_type(&self) -> AccessType {
        self.access_type
    }

    /// Check state
    pub fn check(&self, state: GmmState) -> bool {
        self.state == state
    }

    pub fn is_registered(&self) -> bool {
        self.state == GmmState::Registered
    }

    pub fn is_deregistered(&self) -> bool {
        self.state == GmmState::Deregistered
    }

    /// Move to `to` if the transition is legal and the guard holds
    pub fn transition(&mut self, to: GmmState, security_context_valid: bool) -> ContextResult<()> {
        if to == GmmState::Registered && !security_context_valid {
            log::warn!(
                "[{}] {} -> {} refused: security context not valid",
                self.access_type,
                self.state.name(),
                to.name()
            );
            return Err(ContextError::SecurityContextInvalid(self.access_type));
        }
        if !self.state.can_transition_to(to) {
            return Err(ContextError::InvalidTransition {
                access_type: self.access_type,
                from: self.state,
                to,
            });
        }

        log::debug!(
            "[{}] GMM state transition: {} -> {}",
            self.access_type,
            self.state.name(),
            to.name()
        );
        self.state = to;
        Ok(())
    }

    /// Dispatch a procedure event to the FSM
    pub fn dispatch(&mut self, event: GmmEvent, security_context_valid: bool) -> GmmFsmResult {
        let Some(next) = event.target(self.state) else {
            log::debug!(
                "[{}] {} ignored in {}",
                self.access_type,
                event.name(),
                self.state.name()
            );
            return GmmFsmResult::Ignored;
        };

        match self.transition(next, security_context_valid) {
            Ok(()) => GmmFsmResult::Transition(next),
            Err(_) => GmmFsmResult::Rejected,
        }
    }
}

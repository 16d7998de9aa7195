//! ETAF Timer Management
//!
//! Procedure timers are logical deadlines: each guarded NAS procedure keeps a
//! point in time and a retry counter on the UE context. Nothing here runs a
//! timer; the daemon loop (or any other scheduler) polls `expired()` and
//! `next_deadline()`.

use std::time::{Duration, Instant};

// ============================================================================
// Timer IDs
// ============================================================================

/// ETAF per-UE timer identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EtafTimerId {
    /// T3513 - Paging
    T3513,
    /// T3522 - Deregistration request sent
    T3522,
    /// T3550 - Registration accept sent
    T3550,
    /// T3560 - Authentication request / Security mode command sent
    T3560,
    /// T3565 - Notification sent over non-3GPP access
    T3565,
}

impl EtafTimerId {
    pub const ALL: [EtafTimerId; 5] = [
        EtafTimerId::T3513,
        EtafTimerId::T3522,
        EtafTimerId::T3550,
        EtafTimerId::T3560,
        EtafTimerId::T3565,
    ];

    /// Get timer name
    pub fn name(&self) -> &'static str {
        match self {
            Self::T3513 => "ETAF_TIMER_T3513",
            Self::T3522 => "ETAF_TIMER_T3522",
            Self::T3550 => "ETAF_TIMER_T3550",
            Self::T3560 => "ETAF_TIMER_T3560",
            Self::T3565 => "ETAF_TIMER_T3565",
        }
    }
}

// ============================================================================
// Timer Configuration
// ============================================================================

/// Timer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Timer is configured
    pub enabled: bool,
    /// Maximum retry count
    pub max_count: u32,
    /// Timer duration
    pub duration: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_count: 0,
            duration: Duration::ZERO,
        }
    }
}

impl TimerConfig {
    /// Create a new timer configuration
    pub fn new(max_count: u32, duration_secs: u64) -> Self {
        Self {
            enabled: true,
            max_count,
            duration: Duration::from_secs(duration_secs),
        }
    }
}

/// ETAF timer configurations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtafTimerConfigs {
    pub t3513: TimerConfig,
    pub t3522: TimerConfig,
    pub t3550: TimerConfig,
    pub t3560: TimerConfig,
    pub t3565: TimerConfig,
}

impl Default for EtafTimerConfigs {
    fn default() -> Self {
        Self {
            t3513: TimerConfig::new(2, 6),
            t3522: TimerConfig::new(4, 6),
            t3550: TimerConfig::new(4, 6),
            t3560: TimerConfig::new(4, 6),
            t3565: TimerConfig::new(4, 6),
        }
    }
}

impl EtafTimerConfigs {
    /// Get timer configuration by ID
    pub fn get(&self, timer_id: EtafTimerId) -> &TimerConfig {
        match timer_id {
            EtafTimerId::T3513 => &self.t3513,
            EtafTimerId::T3522 => &self.t3522,
            EtafTimerId::T3550 => &self.t3550,
            EtafTimerId::T3560 => &self.t3560,
            EtafTimerId::T3565 => &self.t3565,
        }
    }

    pub fn get_mut(&mut self, timer_id: EtafTimerId) -> &mut TimerConfig {
        match timer_id {
            EtafTimerId::T3513 => &mut self.t3513,
            EtafTimerId::T3522 => &mut self.t3522,
            EtafTimerId::T3550 => &mut self.t3550,
            EtafTimerId::T3560 => &mut self.t3560,
            EtafTimerId::T3565 => &mut self.t3565,
        }
    }
}

// ============================================================================
// Procedure Timer
// ============================================================================

/// Outcome of an expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerExpiry {
    /// Retransmit; the deadline was re-armed
    Retransmit { retry_count: u32 },
    /// Retries exhausted; the timer is stopped
    Exhausted,
}

/// Logical deadline plus retry counter of one guarded procedure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureTimer {
    /// Point in time the procedure times out, `None` when stopped
    pub deadline: Option<Instant>,
    /// Expiries seen since the last start
    pub retry_count: u32,
}

impl ProcedureTimer {
    /// Arm the timer and reset the retry counter
    pub fn start(&mut self, now: Instant, config: &TimerConfig) {
        self.deadline = Some(now + config.duration);
        self.retry_count = 0;
    }

    pub fn stop(&mut self) {
        self.deadline = None;
        self.retry_count = 0;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if deadline <= now)
    }

    /// Record an expiry: re-arm while retries remain, otherwise stop
    pub fn expire(&mut self, now: Instant, config: &TimerConfig) -> TimerExpiry {
        self.retry_count += 1;
        if self.retry_count > config.max_count {
            self.deadline = None;
            return TimerExpiry::Exhausted;
        }
        self.deadline = Some(now + config.duration);
        TimerExpiry::Retransmit {
            retry_count: self.retry_count,
        }
    }
}

/// Procedure timers of one UE
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UeTimers {
    pub t3513: ProcedureTimer,
    pub t3522: ProcedureTimer,
    pub t3550: ProcedureTimer,
    pub t3560: ProcedureTimer,
    pub t3565: ProcedureTimer,
}

impl UeTimers {
    pub fn get(&self, timer_id: EtafTimerId) -> &ProcedureTimer {
        match timer_id {
            EtafTimerId::T3513 => &self.t3513,
            EtafTimerId::T3522 => &self.t3522,
            EtafTimerId::T3550 => &self.t3550,
            EtafTimerId::T3560 => &self.t3560,
            EtafTimerId::T3565 => &self.t3565,
        }
    }

    pub fn get_mut(&mut self, timer_id: EtafTimerId) -> &mut ProcedureTimer {
        match timer_id {
            EtafTimerId::T3513 => &mut self.t3513,
            EtafTimerId::T3522 => &mut self.t3522,
            EtafTimerId::T3550 => &mut self.t3550,
            EtafTimerId::T3560 => &mut self.t3560,
            EtafTimerId::T3565 => &mut self.t3565,
        }
    }

    /// Earliest armed deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        EtafTimerId::ALL
            .iter()
            .filter_map(|id| self.get(*id).deadline)
            .min()
    }

    /// Timers whose deadline has passed
    pub fn expired(&self, now: Instant) -> Vec<EtafTimerId> {
        EtafTimerId::ALL
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_expired(now))
            .collect()
    }

    pub fn stop_all(&mut self) {
        for id in EtafTimerId::ALL {
            self.get_mut(id).stop();
        }
    }
}

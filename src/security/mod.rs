//! Security state machine
//!
//! Tracks how alert the Authority's systems are to Resistance hacking:
//! - alert level, advanced one step by every detected attempt
//! - reboot cycle triggered on reaching Critical
//! - three timed countermeasures (trace, alarm, isolation)
//! - the security protocol level and the single active policy slot
//!
//! All timers are plain turn counters advanced by [`SecurityState::tick`].

mod detection;

pub use detection::{DetectionModifiers, HackOutcome};

use serde::{Deserialize, Serialize};

use crate::ai::task::PolicyKind;
use crate::core::config::SecurityConfig;
use crate::core::error::{PlannerError, Result};

/// How alert the Authority is to hacking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn raised(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }
}

/// Timed defensive measures against hacking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountermeasureKind {
    /// Reveals the hacker's location
    Trace,
    /// Rattles the hacker, leaving them stressed
    Alarm,
    /// Takes the network offline, no hacking possible
    Isolation,
}

impl CountermeasureKind {
    pub const ALL: [CountermeasureKind; 3] = [
        CountermeasureKind::Trace,
        CountermeasureKind::Alarm,
        CountermeasureKind::Isolation,
    ];

    pub fn decision_name(self) -> &'static str {
        match self {
            Self::Trace => "Trace Back",
            Self::Alarm => "Screamer",
            Self::Isolation => "Offline",
        }
    }
}

/// Resistance gear that suppresses a countermeasure's side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GearEffect {
    TraceMask,
    AlarmMask,
}

impl GearEffect {
    pub fn masks(self) -> CountermeasureKind {
        match self {
            Self::TraceMask => CountermeasureKind::Trace,
            Self::AlarmMask => CountermeasureKind::Alarm,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countermeasure {
    pub active: bool,
    pub timer: u32,
}

/// The policy currently in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePolicy {
    pub policy: PolicyKind,
    /// Loyalty removed when the policy started, restored on expiry
    pub loyalty_delta: i32,
    pub crisis_modifier: i32,
    pub timer: u32,
}

/// A timer that ran out during [`SecurityState::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerExpiry {
    Countermeasure(CountermeasureKind),
    Policy(ActivePolicy),
    RebootComplete,
}

/// Long-lived security state, persisted across save/load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityState {
    pub alert_level: AlertLevel,
    pub is_rebooting: bool,
    pub reboot_timer: u32,
    pub trace: Countermeasure,
    pub alarm: Countermeasure,
    pub isolation: Countermeasure,
    pub protocol_level: u8,
    pub policy: Option<ActivePolicy>,
    pub hacking_attempts_total: u32,
    pub attempts_since_reboot: u32,
    pub detections_since_reboot: u32,
    /// Cost of a hacking attempt, rises after every reboot
    pub hacking_cost: i32,
    /// Countermeasures whose side effects are masked by Resistance gear
    pub masked: Vec<CountermeasureKind>,
}

impl SecurityState {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            alert_level: AlertLevel::Low,
            is_rebooting: false,
            reboot_timer: 0,
            trace: Countermeasure::default(),
            alarm: Countermeasure::default(),
            isolation: Countermeasure::default(),
            protocol_level: 0,
            policy: None,
            hacking_attempts_total: 0,
            attempts_since_reboot: 0,
            detections_since_reboot: 0,
            hacking_cost: config.hacking_cost_base,
            masked: Vec::new(),
        }
    }

    pub fn countermeasure(&self, kind: CountermeasureKind) -> &Countermeasure {
        match kind {
            CountermeasureKind::Trace => &self.trace,
            CountermeasureKind::Alarm => &self.alarm,
            CountermeasureKind::Isolation => &self.isolation,
        }
    }

    fn countermeasure_mut(&mut self, kind: CountermeasureKind) -> &mut Countermeasure {
        match kind {
            CountermeasureKind::Trace => &mut self.trace,
            CountermeasureKind::Alarm => &mut self.alarm,
            CountermeasureKind::Isolation => &mut self.isolation,
        }
    }

    pub fn is_active(&self, kind: CountermeasureKind) -> bool {
        self.countermeasure(kind).active
    }

    /// Start a countermeasure, false if it is already running
    pub fn start_countermeasure(&mut self, kind: CountermeasureKind, duration: u32) -> bool {
        let countermeasure = self.countermeasure_mut(kind);
        if countermeasure.active {
            return false;
        }
        countermeasure.active = true;
        countermeasure.timer = duration.max(1);
        true
    }

    pub fn is_policy_active(&self) -> bool {
        self.policy.is_some()
    }

    /// Occupy the policy slot, false if a policy is already in force
    pub fn start_policy(&mut self, policy: ActivePolicy) -> bool {
        if self.policy.is_some() {
            return false;
        }
        self.policy = Some(ActivePolicy {
            timer: policy.timer.max(1),
            ..policy
        });
        true
    }

    /// Raise the security protocol one level, false at the cap
    pub fn raise_protocol(&mut self, max_level: u8) -> bool {
        if self.protocol_level >= max_level {
            return false;
        }
        self.protocol_level += 1;
        true
    }

    /// Rebuild the masked side-effect list from the Resistance's current gear
    pub fn refresh_masking(&mut self, gear: &[GearEffect]) {
        self.masked.clear();
        for effect in gear {
            let kind = effect.masks();
            if !self.masked.contains(&kind) {
                self.masked.push(kind);
            }
        }
    }

    pub fn is_masked(&self, kind: CountermeasureKind) -> bool {
        self.masked.contains(&kind)
    }

    /// Whether the network currently accepts hacking attempts
    pub fn check_hackable(&self) -> Result<()> {
        if self.is_rebooting {
            return Err(PlannerError::HackingUnavailable("security systems rebooting"));
        }
        if self.isolation.active {
            return Err(PlannerError::HackingUnavailable("network offline"));
        }
        Ok(())
    }

    /// Begin (or restart) a reboot cycle
    pub fn start_reboot(&mut self, config: &SecurityConfig) {
        self.is_rebooting = true;
        self.reboot_timer = config.reboot_duration.max(1);
        tracing::info!("Security systems rebooting for {} turns", self.reboot_timer);
    }

    fn complete_reboot(&mut self, config: &SecurityConfig) {
        self.is_rebooting = false;
        self.reboot_timer = 0;
        self.alert_level = AlertLevel::Low;
        self.attempts_since_reboot = 0;
        self.detections_since_reboot = 0;
        self.hacking_cost += config.hacking_cost_increment;
        tracing::info!("Reboot complete, hacking cost now {}", self.hacking_cost);
    }

    /// Advance every timer by one turn
    ///
    /// Each timer fires its expiry exactly once, on the transition to zero.
    pub fn tick(&mut self, config: &SecurityConfig) -> Vec<TimerExpiry> {
        let mut expired = Vec::new();

        for kind in CountermeasureKind::ALL {
            let countermeasure = self.countermeasure_mut(kind);
            if !countermeasure.active {
                continue;
            }
            countermeasure.timer = countermeasure.timer.saturating_sub(1);
            if countermeasure.timer == 0 {
                countermeasure.active = false;
                expired.push(TimerExpiry::Countermeasure(kind));
            }
        }

        if let Some(mut policy) = self.policy.take() {
            policy.timer = policy.timer.saturating_sub(1);
            if policy.timer == 0 {
                expired.push(TimerExpiry::Policy(policy));
            } else {
                self.policy = Some(policy);
            }
        }

        if self.is_rebooting {
            self.reboot_timer = self.reboot_timer.saturating_sub(1);
            if self.reboot_timer == 0 {
                self.complete_reboot(config);
                expired.push(TimerExpiry::RebootComplete);
            }
        }

        expired
    }
}

//! Hacking attempts and detection rolls

use serde::{Deserialize, Serialize};

use super::{AlertLevel, CountermeasureKind, SecurityState};
use crate::core::config::SecurityConfig;
use crate::core::error::Result;
use crate::world::RandomSource;

/// Situational modifiers to the detection roll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionModifiers {
    /// Net bonus from traits on either side, may be negative
    pub trait_bonus: i32,
    /// The hacker carries counter-detection gear
    pub counter_gear: bool,
    /// The hacker is stressed
    pub hacker_stressed: bool,
}

/// Result of a single hacking attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HackOutcome {
    pub detected: bool,
    /// Detection chance the attempt was rolled against
    pub chance: i32,
    pub alert_level: AlertLevel,
    pub reboot_started: bool,
    /// An unmasked trace revealed the hacker's location
    pub traced: bool,
    /// An unmasked alarm left the hacker stressed
    pub alarm_raised: bool,
    /// Resources the attempt cost the hacker
    pub cost: i32,
}

impl SecurityState {
    /// Percentage chance an attempt is detected, clamped to 0..=100
    pub fn detection_chance(&self, mods: &DetectionModifiers, config: &SecurityConfig) -> i32 {
        let mut chance = config.base_detection + mods.trait_bonus;
        chance += i32::from(self.protocol_level) * config.protocol_bonus_per_level;
        if mods.counter_gear {
            chance -= config.counter_gear_penalty;
        }
        if mods.hacker_stressed {
            chance += config.stressed_bonus;
        }
        chance.clamp(0, 100)
    }

    /// Resolve one hacking attempt
    ///
    /// Only a detected attempt moves the alert level. Reaching Critical, or
    /// being detected again while at Critical, starts a reboot.
    pub fn attempt_hack(
        &mut self,
        mods: &DetectionModifiers,
        config: &SecurityConfig,
        rng: &mut dyn RandomSource,
    ) -> Result<HackOutcome> {
        self.check_hackable()?;

        self.hacking_attempts_total += 1;
        self.attempts_since_reboot += 1;

        let chance = self.detection_chance(mods, config);
        let detected = rng.roll_percent() < chance;

        let mut reboot_started = false;
        if detected {
            self.detections_since_reboot += 1;
            self.alert_level = self.alert_level.raised();
            if self.alert_level == AlertLevel::Critical {
                self.start_reboot(config);
                reboot_started = true;
            }
        }

        let traced = self.is_active(CountermeasureKind::Trace)
            && !self.is_masked(CountermeasureKind::Trace);
        let alarm_raised = self.is_active(CountermeasureKind::Alarm)
            && !self.is_masked(CountermeasureKind::Alarm);

        tracing::debug!(
            "Hack attempt: chance {}%, detected {}, alert {:?}",
            chance,
            detected,
            self.alert_level
        );

        Ok(HackOutcome {
            detected,
            chance,
            alert_level: self.alert_level,
            reboot_started,
            traced,
            alarm_raised,
            cost: self.hacking_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PlannerError;
    use crate::security::GearEffect;
    use crate::world::ScriptedRng;

    #[test]
    fn test_detection_clamped_high() {
        let config = SecurityConfig::default();
        let mut state = SecurityState::new(&config);
        state.protocol_level = config.max_protocol_level;
        let mods = DetectionModifiers {
            trait_bonus: 200,
            counter_gear: false,
            hacker_stressed: true,
        };
        assert_eq!(state.detection_chance(&mods, &config), 100);
    }

    #[test]
    fn test_detection_clamped_low() {
        let config = SecurityConfig::default();
        let state = SecurityState::new(&config);
        let mods = DetectionModifiers {
            trait_bonus: -200,
            counter_gear: true,
            hacker_stressed: false,
        };
        assert_eq!(state.detection_chance(&mods, &config), 0);
    }

    #[test]
    fn test_detection_sums_modifiers() {
        let config = SecurityConfig::default();
        let mut state = SecurityState::new(&config);
        state.protocol_level = 2;
        let mods = DetectionModifiers {
            trait_bonus: 5,
            counter_gear: true,
            hacker_stressed: true,
        };
        let expected = config.base_detection + 5 + 2 * config.protocol_bonus_per_level
            - config.counter_gear_penalty
            + config.stressed_bonus;
        assert_eq!(state.detection_chance(&mods, &config), expected.clamp(0, 100));
    }

    #[test]
    fn test_undetected_attempt_keeps_alert() {
        let config = SecurityConfig::default();
        let mut state = SecurityState::new(&config);
        // 99 never beats the default 50% chance
        let mut rng = ScriptedRng::new([99, 99, 99]);
        for _ in 0..3 {
            let outcome = state
                .attempt_hack(&DetectionModifiers::default(), &config, &mut rng)
                .unwrap();
            assert!(!outcome.detected);
        }
        assert_eq!(state.alert_level, AlertLevel::Low);
        assert_eq!(state.attempts_since_reboot, 3);
        assert_eq!(state.detections_since_reboot, 0);
    }

    #[test]
    fn test_three_detections_trigger_reboot() {
        let config = SecurityConfig::default();
        let mut state = SecurityState::new(&config);
        let mut rng = ScriptedRng::new([0, 0, 0]);
        let mods = DetectionModifiers::default();

        let first = state.attempt_hack(&mods, &config, &mut rng).unwrap();
        assert_eq!(first.alert_level, AlertLevel::Medium);
        let second = state.attempt_hack(&mods, &config, &mut rng).unwrap();
        assert_eq!(second.alert_level, AlertLevel::High);
        let third = state.attempt_hack(&mods, &config, &mut rng).unwrap();
        assert_eq!(third.alert_level, AlertLevel::Critical);
        assert!(third.reboot_started);
        assert!(state.is_rebooting);

        assert!(matches!(
            state.attempt_hack(&mods, &config, &mut rng),
            Err(PlannerError::HackingUnavailable(_))
        ));

        for _ in 0..config.reboot_duration {
            state.tick(&config);
        }
        assert!(!state.is_rebooting);
        assert_eq!(state.alert_level, AlertLevel::Low);
        assert_eq!(state.attempts_since_reboot, 0);
        assert_eq!(state.detections_since_reboot, 0);
        assert_eq!(state.hacking_attempts_total, 3);
    }

    #[test]
    fn test_critical_detection_restarts_reboot() {
        let config = SecurityConfig::default();
        let mut state = SecurityState::new(&config);
        state.alert_level = AlertLevel::Critical;
        let mut rng = ScriptedRng::new([0]);
        let outcome = state
            .attempt_hack(&DetectionModifiers::default(), &config, &mut rng)
            .unwrap();
        assert!(outcome.reboot_started);
        assert_eq!(state.reboot_timer, config.reboot_duration);
    }

    #[test]
    fn test_masked_trace_hides_hacker() {
        let config = SecurityConfig::default();
        let mut state = SecurityState::new(&config);
        state.start_countermeasure(CountermeasureKind::Trace, 3);
        state.start_countermeasure(CountermeasureKind::Alarm, 3);
        state.refresh_masking(&[GearEffect::TraceMask]);

        let mut rng = ScriptedRng::new([99]);
        let outcome = state
            .attempt_hack(&DetectionModifiers::default(), &config, &mut rng)
            .unwrap();
        assert!(!outcome.traced);
        assert!(outcome.alarm_raised);
    }
}

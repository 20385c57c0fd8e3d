//! Planner configuration with documented constants
//!
//! All tuning numbers are collected here. Every section deserializes with
//! defaults, so a TOML file only needs to name the values it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{PlannerError, Result};

/// Additive weights used by the node scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bonus when the node arc matches the Authority's preferred arc
    pub preferred_factor: i32,
    /// Bonus for nodes in the central map region (defensive placement only)
    pub centre_factor: i32,
    /// Bonus per observed Resistance activity at the node
    pub activity_count_factor: i32,
    /// Recency bonus, reduced by one per turn since the last observation
    pub activity_time_factor: i32,
    /// Per-connection bonus for unsecured connections
    pub security_none_factor: i32,
    pub security_low_factor: i32,
    pub security_medium_factor: i32,
    pub security_high_factor: i32,
    /// Bonus for nodes in the top-connectivity set
    pub connected_factor: i32,
    /// Bonus for chokepoint nodes
    pub chokepoint_factor: i32,
    /// Bonus for a live known target, penalty for an outstanding one
    pub target_factor: i32,
    /// Bonus for a spider the Resistance doesn't know about (halved if known)
    pub spider_factor: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            preferred_factor: 2,
            centre_factor: 2,
            activity_count_factor: 1,
            activity_time_factor: 4,
            security_none_factor: 3,
            security_low_factor: 2,
            security_medium_factor: 1,
            security_high_factor: 0,
            connected_factor: 2,
            chokepoint_factor: 3,
            target_factor: 3,
            spider_factor: 4,
        }
    }
}

/// Rules shared by every candidate pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of teams a node can host
    pub node_capacity: usize,
    /// Best value of a node datapoint (0 is the worst)
    pub datapoint_max: i32,
    /// Copies added to the spider pool for each known live target
    pub target_copies: usize,
    /// Idle erasure teams needed before the no-guess fallback fires
    pub erasure_fallback_min_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            node_capacity: 3,
            datapoint_max: 3,
            target_copies: 3,
            erasure_fallback_min_idle: 2,
        }
    }
}

/// Recency tracking of Resistance activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Entries kept in each recency queue
    pub queue_capacity: usize,
    /// How many turns old an observation can be and still count as a guess
    pub guess_window: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            guess_window: 2,
        }
    }
}

/// Turn selection and execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Actions the Authority may execute per turn
    pub action_budget: usize,
    /// Target size of the final task list
    pub final_task_pool: usize,
    /// Scan passes allowed in the probabilistic phase before falling back
    pub retry_ceiling: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            action_budget: 2,
            final_task_pool: 4,
            retry_ceiling: 10,
        }
    }
}

/// Resource cost of each decision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionCosts {
    pub apb: i32,
    pub security_alert: i32,
    pub connection_security: i32,
    pub request_team: i32,
    pub request_resources: i32,
    /// Indexed by impact tier (low, medium, high)
    pub policy: [i32; 3],
    pub handout: [i32; 3],
    pub security_protocol: i32,
    pub trace_back: i32,
    pub screamer: i32,
    pub offline: i32,
    pub stress_leave: i32,
    pub lobby: i32,
}

impl Default for DecisionCosts {
    fn default() -> Self {
        Self {
            apb: 2,
            security_alert: 2,
            connection_security: 1,
            request_team: 2,
            request_resources: 0,
            policy: [1, 2, 3],
            handout: [1, 2, 3],
            security_protocol: 2,
            trace_back: 1,
            screamer: 1,
            offline: 3,
            stress_leave: 1,
            lobby: 1,
        }
    }
}

/// Gating thresholds and effects of the decision catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub costs: DecisionCosts,
    /// Connection hardening fires while secured / total connections is below this
    pub connection_ratio_threshold: f32,
    /// Request a team when the idle reserve is at or below this
    pub request_team_idle_threshold: usize,
    /// Roster size cap for team requests
    pub max_teams: usize,
    /// Request resources when the pool is below this
    pub resource_threshold: i32,
    /// Base approval chance of a resource request (percent)
    pub request_base_chance: i32,
    /// Added to the approval chance for every consecutive failure
    pub request_chance_boost: i32,
    /// Resources granted by an approved request
    pub request_grant: i32,
    /// Minimum crises this turn for each policy tier
    pub policy_min_crises: [usize; 3],
    /// City loyalty may not be pushed below this by a policy
    pub approval_floor: i32,
    /// Loyalty lost while each policy tier is active
    pub policy_loyalty_cost: [i32; 3],
    /// Crisis chance reduction applied by each policy tier
    pub policy_crisis_modifier: [i32; 3],
    pub policy_duration: u32,
    /// A handout tier is available while loyalty is at or below its threshold
    pub handout_loyalty_threshold: [i32; 3],
    pub handout_loyalty_gain: [i32; 3],
    pub handout_cooldown: u32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            costs: DecisionCosts::default(),
            connection_ratio_threshold: 0.25,
            request_team_idle_threshold: 1,
            max_teams: 30,
            resource_threshold: 3,
            request_base_chance: 30,
            request_chance_boost: 10,
            request_grant: 5,
            policy_min_crises: [1, 2, 3],
            approval_floor: 3,
            policy_loyalty_cost: [1, 2, 3],
            policy_crisis_modifier: [10, 20, 30],
            policy_duration: 10,
            handout_loyalty_threshold: [6, 4, 2],
            handout_loyalty_gain: [1, 2, 3],
            handout_cooldown: 10,
        }
    }
}

/// Hacking detection and countermeasure tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Base detection chance of a hacking attempt (percent)
    pub base_detection: i32,
    /// Added per active security protocol level
    pub protocol_bonus_per_level: i32,
    pub max_protocol_level: u8,
    /// Subtracted when the hacker carries counter-gear
    pub counter_gear_penalty: i32,
    /// Added when the hacker is stressed
    pub stressed_bonus: i32,
    /// Turns a reboot takes
    pub reboot_duration: u32,
    /// Starting cost of a hacking attempt
    pub hacking_cost_base: i32,
    /// Permanent cost increase after each reboot
    pub hacking_cost_increment: i32,
    pub trace_duration: u32,
    pub alarm_duration: u32,
    pub isolation_duration: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            base_detection: 50,
            protocol_bonus_per_level: 10,
            max_protocol_level: 3,
            counter_gear_penalty: 25,
            stressed_bonus: 10,
            reboot_duration: 5,
            hacking_cost_base: 1,
            hacking_cost_increment: 1,
            trace_duration: 5,
            alarm_duration: 5,
            isolation_duration: 3,
        }
    }
}

/// Complete planner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub scoring: ScoringConfig,
    pub pools: PoolConfig,
    pub tracker: TrackerConfig,
    pub selection: SelectionConfig,
    pub decisions: DecisionConfig,
    pub security: SecurityConfig,
}

impl PlannerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.pools.node_capacity == 0 {
            return Err(PlannerError::InvalidConfig(
                "node_capacity must be at least 1".into(),
            ));
        }

        if self.pools.datapoint_max <= 0 {
            return Err(PlannerError::InvalidConfig(format!(
                "datapoint_max ({}) must be positive",
                self.pools.datapoint_max
            )));
        }

        if self.selection.final_task_pool == 0 {
            return Err(PlannerError::InvalidConfig(
                "final_task_pool must be at least 1".into(),
            ));
        }

        // Crisis gates should escalate with policy impact
        let crises = self.decisions.policy_min_crises;
        if crises[0] > crises[1] || crises[1] > crises[2] {
            return Err(PlannerError::InvalidConfig(format!(
                "policy_min_crises ({:?}) must ascend",
                crises
            )));
        }

        // Bigger handouts are reserved for lower loyalty
        let thresholds = self.decisions.handout_loyalty_threshold;
        if thresholds[0] < thresholds[1] || thresholds[1] < thresholds[2] {
            return Err(PlannerError::InvalidConfig(format!(
                "handout_loyalty_threshold ({:?}) must descend",
                thresholds
            )));
        }

        if !(0.0..=1.0).contains(&self.decisions.connection_ratio_threshold) {
            return Err(PlannerError::InvalidConfig(
                "connection_ratio_threshold must be within 0..=1".into(),
            ));
        }

        Ok(())
    }
}

/// Load a planner config from a TOML file
pub fn load_config(path: &Path) -> Result<PlannerConfig> {
    let contents = fs::read_to_string(path)?;
    let config: PlannerConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

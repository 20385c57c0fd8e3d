//! Decision catalog
//!
//! Every non-deployment action the Authority can take, with its cost and
//! effect handler. The table is built once; gates run every turn and feed
//! candidates into the same potential list as deployments.

mod effects;
mod gates;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::ai::context::TurnContext;
use crate::ai::personality::AuthorityPersonality;
use crate::ai::task::{CandidateTask, DecisionId, HandoutKind, Impact, PolicyKind};
use crate::core::config::{DecisionConfig, PlannerConfig};
use crate::core::error::{PlannerError, Result};
use crate::core::types::{Side, TeamArc, Turn};
use crate::security::{CountermeasureKind, SecurityState};
use crate::world::{SecurityMode, Services};

/// Ratios and flags the gates read, persisted with the save
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetrics {
    /// Secured connections / all connections, as of the last gate pass
    pub connection_ratio: f32,
    /// Idle teams / all teams, as of the last gate pass
    pub team_ratio: f32,
    /// A decision could not be paid for this turn
    pub resources_insufficient: bool,
    /// Consecutive refused resource requests
    pub request_failures: u32,
    /// Turns until another handout is allowed
    pub handout_cooldown: u32,
    pub last_request_chance: i32,
}

impl DecisionMetrics {
    /// Approval chance of a resource request: base + failures × boost
    pub fn request_chance(&self, config: &DecisionConfig) -> i32 {
        let boost = config.request_chance_boost * self.request_failures as i32;
        (config.request_base_chance + boost).clamp(0, 100)
    }

    pub fn tick(&mut self) {
        self.handout_cooldown = self.handout_cooldown.saturating_sub(1);
    }
}

/// Planner state visible to gates and effects
pub struct EffectContext<'a> {
    pub turn: Turn,
    pub config: &'a PlannerConfig,
    pub personality: &'a AuthorityPersonality,
    pub security: &'a mut SecurityState,
    pub metrics: &'a mut DecisionMetrics,
}

type EffectFn = fn(DecisionId, &CandidateTask, &mut EffectContext<'_>, &mut Services<'_>) -> Result<()>;

struct DecisionEntry {
    cost: i32,
    effect: EffectFn,
}

/// Cost and handler for every decision, keyed by identifier
pub struct DecisionCatalog {
    entries: AHashMap<DecisionId, DecisionEntry>,
}

impl DecisionCatalog {
    pub fn new(config: &DecisionConfig) -> Self {
        let entries = all_decisions()
            .into_iter()
            .map(|id| {
                let entry = DecisionEntry {
                    cost: cost_of(id, config),
                    effect: handler_for(id),
                };
                (id, entry)
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cost(&self, id: DecisionId) -> Option<i32> {
        self.entries.get(&id).map(|e| e.cost)
    }

    /// Run every gate and add the candidates that pass
    pub fn emit(&self, ctx: &mut TurnContext, env: &mut EffectContext<'_>, services: &mut Services<'_>) {
        let before = ctx.potential.len();
        gates::security_mode(ctx, services);
        gates::connection_security(ctx, env, services);
        gates::request_team(ctx, env, services);
        gates::request_resources(ctx, env, services);
        gates::policies(ctx, env, services);
        gates::handouts(ctx, env, services);
        gates::countermeasures(ctx, env, services);
        gates::administration(ctx, services);
        tracing::debug!(
            "Turn {}: {} decision candidates",
            ctx.turn,
            ctx.potential.len() - before
        );
    }

    /// Pay for and apply a decision
    ///
    /// Resources are checked first and only deducted when the effect succeeds.
    /// Running short flags the metrics for next turn's resource request.
    pub fn execute(
        &self,
        task: &CandidateTask,
        env: &mut EffectContext<'_>,
        services: &mut Services<'_>,
    ) -> Result<()> {
        let id = task.decision_id().ok_or(PlannerError::MissingReference {
            kind: "decision",
            id: task.sequence_id,
        })?;
        let entry = self.entries.get(&id).ok_or(PlannerError::MissingReference {
            kind: "decision",
            id: task.sequence_id,
        })?;

        let available = services.world.resources(Side::Authority);
        if entry.cost > available {
            env.metrics.resources_insufficient = true;
            return Err(PlannerError::InsufficientResources {
                cost: entry.cost,
                available,
            });
        }

        (entry.effect)(id, task, env, services)?;

        let remaining = services.world.resources(Side::Authority) - entry.cost;
        services.world.set_resources(Side::Authority, remaining);
        Ok(())
    }
}

fn all_decisions() -> Vec<DecisionId> {
    let mut ids = vec![
        DecisionId::SecurityMode(SecurityMode::Apb),
        DecisionId::SecurityMode(SecurityMode::SecurityAlert),
        DecisionId::ConnectionSecurity,
        DecisionId::RequestResources,
        DecisionId::SecurityProtocol,
        DecisionId::StressLeave,
        DecisionId::LobbyHq,
    ];
    ids.extend(TeamArc::ALL.map(DecisionId::RequestTeam));
    for impact in Impact::ALL {
        ids.extend(PolicyKind::options(impact).map(DecisionId::Policy));
        ids.extend(HandoutKind::options(impact).map(DecisionId::Handout));
    }
    ids.extend(CountermeasureKind::ALL.map(DecisionId::Countermeasure));
    ids
}

fn cost_of(id: DecisionId, config: &DecisionConfig) -> i32 {
    let costs = &config.costs;
    match id {
        DecisionId::SecurityMode(SecurityMode::Apb) => costs.apb,
        DecisionId::SecurityMode(SecurityMode::SecurityAlert) => costs.security_alert,
        DecisionId::ConnectionSecurity => costs.connection_security,
        DecisionId::RequestTeam(_) => costs.request_team,
        DecisionId::RequestResources => costs.request_resources,
        DecisionId::Policy(kind) => costs.policy[kind.impact().index()],
        DecisionId::Handout(kind) => costs.handout[kind.impact().index()],
        DecisionId::SecurityProtocol => costs.security_protocol,
        DecisionId::Countermeasure(CountermeasureKind::Trace) => costs.trace_back,
        DecisionId::Countermeasure(CountermeasureKind::Alarm) => costs.screamer,
        DecisionId::Countermeasure(CountermeasureKind::Isolation) => costs.offline,
        DecisionId::StressLeave => costs.stress_leave,
        DecisionId::LobbyHq => costs.lobby,
    }
}

fn handler_for(id: DecisionId) -> EffectFn {
    match id {
        DecisionId::SecurityMode(_) => effects::declare_security_mode,
        DecisionId::ConnectionSecurity => effects::harden_connection,
        DecisionId::RequestTeam(_) => effects::request_team,
        DecisionId::RequestResources => effects::request_resources,
        DecisionId::Policy(_) => effects::start_policy,
        DecisionId::Handout(_) => effects::give_handout,
        DecisionId::SecurityProtocol => effects::raise_protocol,
        DecisionId::Countermeasure(_) => effects::start_countermeasure,
        DecisionId::StressLeave => effects::stress_leave,
        DecisionId::LobbyHq => effects::lobby_hq,
    }
}

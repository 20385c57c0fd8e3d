//! Decision effect handlers
//!
//! Each handler checks its own precondition before touching anything, so a
//! blocked decision leaves the world and the ledger unchanged.

use super::EffectContext;
use crate::ai::task::{CandidateTask, DecisionId};
use crate::core::error::{PlannerError, Result};
use crate::core::types::{SecurityLevel, Side};
use crate::security::{ActivePolicy, CountermeasureKind};
use crate::world::{NoticeKind, Services};

fn mismatched() -> PlannerError {
    PlannerError::DecisionBlocked("handler does not match decision")
}

pub(super) fn declare_security_mode(
    id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    let DecisionId::SecurityMode(mode) = id else {
        return Err(mismatched());
    };
    if services.world.security_mode().is_some() {
        return Err(PlannerError::DecisionBlocked("security mode already active"));
    }
    services.world.declare_security_mode(mode);
    services.notify(env.turn, NoticeKind::Security, format!("{} declared", id.name()));
    Ok(())
}

pub(super) fn harden_connection(
    _id: DecisionId,
    task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    let id = task.connection.ok_or(PlannerError::MissingReference {
        kind: "connection",
        id: task.sequence_id,
    })?;
    let current = services
        .world
        .connection(id)
        .map(|c| c.security)
        .ok_or_else(|| PlannerError::missing_connection(id))?;
    if current == SecurityLevel::High {
        return Err(PlannerError::DecisionBlocked("connection already at High security"));
    }

    let raised = current.raised();
    services.world.set_connection_security(id, raised)?;
    services.notify(
        env.turn,
        NoticeKind::Decision,
        format!("Security on {} raised to {:?}", task.name1, raised),
    );
    Ok(())
}

pub(super) fn request_team(
    id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    let DecisionId::RequestTeam(arc) = id else {
        return Err(mismatched());
    };
    services.world.add_team(arc);
    services.notify(
        env.turn,
        NoticeKind::Logistics,
        format!("New {:?} team joins the reserve", arc),
    );
    Ok(())
}

/// Roll for extra resources; each refusal makes the next request likelier
pub(super) fn request_resources(
    _id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    let config = &env.config.decisions;
    let chance = env.metrics.request_chance(config);
    env.metrics.last_request_chance = chance;

    if services.rng.roll_percent() < chance {
        let granted = services.world.resources(Side::Authority) + config.request_grant;
        services.world.set_resources(Side::Authority, granted);
        env.metrics.request_failures = 0;
        services.notify(
            env.turn,
            NoticeKind::Logistics,
            format!("Resource request approved (+{})", config.request_grant),
        );
    } else {
        env.metrics.request_failures += 1;
        services.notify(
            env.turn,
            NoticeKind::Logistics,
            format!("Resource request denied ({}% chance)", chance),
        );
    }
    Ok(())
}

pub(super) fn start_policy(
    id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    let DecisionId::Policy(policy) = id else {
        return Err(mismatched());
    };
    if env.security.is_policy_active() {
        return Err(PlannerError::DecisionBlocked("a policy is already active"));
    }

    let config = &env.config.decisions;
    let tier = policy.impact().index();
    let before = services.world.city_loyalty();
    services
        .world
        .set_city_loyalty(before - config.policy_loyalty_cost[tier]);
    let removed = before - services.world.city_loyalty();
    let modifier = config.policy_crisis_modifier[tier];
    services.world.set_crisis_modifier(modifier);

    env.security.start_policy(ActivePolicy {
        policy,
        loyalty_delta: removed,
        crisis_modifier: modifier,
        timer: config.policy_duration,
    });
    services.notify(
        env.turn,
        NoticeKind::Policy,
        format!(
            "{} enacted for {} turns (loyalty -{})",
            policy.name(),
            config.policy_duration,
            removed
        ),
    );
    Ok(())
}

pub(super) fn give_handout(
    id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    let DecisionId::Handout(handout) = id else {
        return Err(mismatched());
    };
    if env.metrics.handout_cooldown > 0 {
        return Err(PlannerError::DecisionBlocked("handout on cooldown"));
    }

    let config = &env.config.decisions;
    let gain = config.handout_loyalty_gain[handout.impact().index()];
    let loyalty = services.world.city_loyalty();
    services.world.set_city_loyalty(loyalty + gain);
    env.metrics.handout_cooldown = config.handout_cooldown;
    services.notify(
        env.turn,
        NoticeKind::Policy,
        format!("{} handed out (loyalty +{})", handout.name(), gain),
    );
    Ok(())
}

pub(super) fn raise_protocol(
    _id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    if !env.security.raise_protocol(env.config.security.max_protocol_level) {
        return Err(PlannerError::DecisionBlocked("security protocol at maximum"));
    }
    services.notify(
        env.turn,
        NoticeKind::Countermeasure,
        format!("Security protocol raised to level {}", env.security.protocol_level),
    );
    Ok(())
}

pub(super) fn start_countermeasure(
    id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    let DecisionId::Countermeasure(kind) = id else {
        return Err(mismatched());
    };
    let security = &env.config.security;
    let mut duration = match kind {
        CountermeasureKind::Trace => security.trace_duration,
        CountermeasureKind::Alarm => security.alarm_duration,
        CountermeasureKind::Isolation => security.isolation_duration,
    };
    if env.personality.traits.double_countermeasure_duration {
        duration *= 2;
    }

    if !env.security.start_countermeasure(kind, duration) {
        return Err(PlannerError::DecisionBlocked("countermeasure already running"));
    }
    services.notify(
        env.turn,
        NoticeKind::Countermeasure,
        format!("{} active for {} turns", kind.decision_name(), duration),
    );
    Ok(())
}

pub(super) fn stress_leave(
    _id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    if !services.world.authority_stressed() {
        return Err(PlannerError::DecisionBlocked("no stress to relieve"));
    }
    services.world.grant_stress_leave();
    services.notify(env.turn, NoticeKind::Decision, "Stress leave granted");
    Ok(())
}

pub(super) fn lobby_hq(
    _id: DecisionId,
    _task: &CandidateTask,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) -> Result<()> {
    if !services.world.lobby_available() {
        return Err(PlannerError::DecisionBlocked("lobbying unavailable"));
    }
    services.world.lobby_hq();
    services.notify(env.turn, NoticeKind::Decision, "Headquarters lobbied for approval");
    Ok(())
}

//! Decision gates
//!
//! Each gate reads the current state and, when its condition holds, proposes
//! one or more weighted candidates.

use super::EffectContext;
use crate::ai::context::TurnContext;
use crate::ai::task::{CandidateTask, DecisionId, HandoutKind, Impact, PolicyKind};
use crate::core::types::{ConnectionId, NodeId, Priority, SecurityLevel, Side, TeamArc};
use crate::security::CountermeasureKind;
use crate::world::{MapQuery, RandomSource, SecurityMode, Services};

fn propose(ctx: &mut TurnContext, id: DecisionId, priority: Priority, copies: usize) {
    let sequence = ctx.next_sequence();
    ctx.propose(CandidateTask::decision(sequence, id, priority), copies);
}

fn pick<T: Copy>(items: &[T], rng: &mut dyn RandomSource) -> Option<T> {
    rng.pick_index(items.len()).and_then(|i| items.get(i).copied())
}

/// Erasure teams on the streets plus an immediate-notice event this turn
pub(super) fn security_mode(ctx: &mut TurnContext, services: &mut Services<'_>) {
    let world = &services.world;
    let triggered = world.deployed_count(TeamArc::Erasure) > 0
        && world.immediate_notice()
        && world.security_mode().is_none();
    if !triggered {
        return;
    }
    let modes = [SecurityMode::Apb, SecurityMode::SecurityAlert];
    if let Some(mode) = pick(&modes, services.rng) {
        propose(ctx, DecisionId::SecurityMode(mode), Priority::High, 1);
    }
}

pub(super) fn connection_security(
    ctx: &mut TurnContext,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) {
    let ids = services.world.connection_ids();
    let ratio = if ids.is_empty() {
        1.0
    } else {
        let secured = ids
            .iter()
            .filter_map(|id| services.world.connection(*id))
            .filter(|c| c.security > SecurityLevel::None)
            .count();
        secured as f32 / ids.len() as f32
    };
    env.metrics.connection_ratio = ratio;

    if ratio >= env.config.decisions.connection_ratio_threshold {
        return;
    }

    let Some(connection) = choose_connection(&*services.world, ctx.preferred, services.rng) else {
        return;
    };
    let description = describe_connection(&*services.world, connection);
    let sequence = ctx.next_sequence();
    let task = CandidateTask::decision(sequence, DecisionId::ConnectionSecurity, Priority::Medium)
        .with_connection(connection, description);
    ctx.propose(task, 1);
}

/// Pick a connection to harden
///
/// Looks at hubs and chokepoints, preferring nodes of the preferred arc.
/// Nodes are probed at random and dropped once they offer nothing.
pub fn choose_connection<M: MapQuery + ?Sized>(
    map: &M,
    preferred: crate::core::types::NodeArc,
    rng: &mut dyn RandomSource,
) -> Option<ConnectionId> {
    let subset: Vec<NodeId> = map
        .node_ids()
        .into_iter()
        .filter(|id| {
            map.node(*id)
                .is_some_and(|n| n.flags.most_connected || n.flags.chokepoint)
        })
        .collect();
    let favoured: Vec<NodeId> = subset
        .iter()
        .copied()
        .filter(|id| map.node(*id).is_some_and(|n| n.arc == preferred))
        .collect();

    probe_nodes(map, favoured, rng).or_else(|| probe_nodes(map, subset, rng))
}

fn probe_nodes<M: MapQuery + ?Sized>(
    map: &M,
    mut nodes: Vec<NodeId>,
    rng: &mut dyn RandomSource,
) -> Option<ConnectionId> {
    while let Some(index) = rng.pick_index(nodes.len()) {
        let node = nodes.remove(index);
        let open: Vec<ConnectionId> = map
            .node_connections(node)
            .into_iter()
            .filter(|id| is_hardenable(map, *id))
            .collect();
        if let Some(connection) = pick(&open, rng) {
            return Some(connection);
        }
    }
    None
}

/// Below High security and not leading to a dead end
fn is_hardenable<M: MapQuery + ?Sized>(map: &M, id: ConnectionId) -> bool {
    map.connection(id).is_some_and(|c| {
        c.security < SecurityLevel::High
            && map.node_connections(c.a).len() > 1
            && map.node_connections(c.b).len() > 1
    })
}

fn describe_connection<M: MapQuery + ?Sized>(map: &M, id: ConnectionId) -> String {
    let name = |node: NodeId| map.node(node).map_or("?", |n| n.name.as_str()).to_string();
    map.connection(id)
        .map(|c| format!("{} - {}", name(c.a), name(c.b)))
        .unwrap_or_default()
}

/// Ask for another team when the reserve runs dry
pub(super) fn request_team(
    ctx: &mut TurnContext,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) {
    let world = &services.world;
    let idle: usize = TeamArc::ALL.iter().map(|arc| world.idle_count(*arc)).sum();
    let total: usize = TeamArc::ALL.iter().map(|arc| world.total_count(*arc)).sum();
    env.metrics.team_ratio = if total == 0 {
        0.0
    } else {
        idle as f32 / total as f32
    };

    let config = &env.config.decisions;
    if idle > config.request_team_idle_threshold || total >= config.max_teams {
        return;
    }
    let Some(arc) = TeamArc::ALL.into_iter().min_by_key(|arc| world.total_count(*arc)) else {
        return;
    };
    propose(ctx, DecisionId::RequestTeam(arc), Priority::Low, 1);
}

pub(super) fn request_resources(
    ctx: &mut TurnContext,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) {
    let config = &env.config.decisions;
    let short = services.world.resources(Side::Authority) < config.resource_threshold;
    if !(short || ctx.resources_insufficient) {
        return;
    }
    env.metrics.last_request_chance = env.metrics.request_chance(config);
    propose(ctx, DecisionId::RequestResources, Priority::Medium, 1);
}

/// One option per qualifying tier, weighted towards higher impact
pub(super) fn policies(
    ctx: &mut TurnContext,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) {
    if env.security.is_policy_active() {
        return;
    }
    let config = &env.config.decisions;
    let crises = services.world.crisis_count();
    let loyalty = services.world.city_loyalty();

    for impact in Impact::ALL {
        let tier = impact.index();
        let affordable = loyalty - config.policy_loyalty_cost[tier] >= config.approval_floor;
        if crises < config.policy_min_crises[tier] || !affordable {
            continue;
        }
        if let Some(policy) = pick(&PolicyKind::options(impact), services.rng) {
            propose(ctx, DecisionId::Policy(policy), impact.priority(), impact.copies());
        }
    }
}

pub(super) fn handouts(
    ctx: &mut TurnContext,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) {
    if env.metrics.handout_cooldown > 0 {
        return;
    }
    let config = &env.config.decisions;
    let loyalty = services.world.city_loyalty();

    for impact in Impact::ALL {
        if loyalty > config.handout_loyalty_threshold[impact.index()] {
            continue;
        }
        if let Some(handout) = pick(&HandoutKind::options(impact), services.rng) {
            propose(ctx, DecisionId::Handout(handout), impact.priority(), impact.copies());
        }
    }
}

/// Countermeasure priority from detections since the last reboot
pub fn countermeasure_priority(detections: u32, boosted: bool) -> Priority {
    let priority = match detections {
        0 => Priority::Low,
        1 => Priority::Medium,
        2 => Priority::High,
        _ => Priority::Critical,
    };
    if boosted {
        priority.raised()
    } else {
        priority
    }
}

/// Respond to hacking seen since the last reboot
pub(super) fn countermeasures(
    ctx: &mut TurnContext,
    env: &mut EffectContext<'_>,
    services: &mut Services<'_>,
) {
    let security = &*env.security;
    if security.is_rebooting || security.attempts_since_reboot == 0 {
        return;
    }
    let priority = countermeasure_priority(
        security.detections_since_reboot,
        env.personality.traits.countermeasure_boost,
    );

    let inactive: Vec<CountermeasureKind> = CountermeasureKind::ALL
        .into_iter()
        .filter(|kind| !security.is_active(*kind))
        .collect();

    if priority == Priority::Critical {
        if let Some(kind) = pick(&inactive, services.rng) {
            propose(ctx, DecisionId::Countermeasure(kind), Priority::Critical, 1);
        }
    } else {
        for kind in inactive {
            propose(ctx, DecisionId::Countermeasure(kind), priority, priority.weight());
        }
    }

    if security.protocol_level < env.config.security.max_protocol_level {
        let protocol = priority.min(Priority::High);
        propose(ctx, DecisionId::SecurityProtocol, protocol, protocol.weight());
    }
}

pub(super) fn administration(ctx: &mut TurnContext, services: &mut Services<'_>) {
    if services.world.authority_stressed() {
        propose(ctx, DecisionId::StressLeave, Priority::Low, 1);
    }
    if services.world.lobby_available() {
        propose(ctx, DecisionId::LobbyHq, Priority::Low, 1);
    }
}

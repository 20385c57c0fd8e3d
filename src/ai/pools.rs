//! Candidate pool building
//!
//! `gather` scans the map once and records every node worth acting on.
//! `build_pools` turns those records into at most one deployment candidate
//! per team category.

use crate::ai::context::{DatapointCategory, DatapointRecord, TurnContext};
use crate::ai::scoring::{NodeScorer, ScoreProfile};
use crate::ai::task::CandidateTask;
use crate::ai::tracker::{best_guess_location, ActivityRecord};
use crate::core::config::PlannerConfig;
use crate::core::error::PlannerError;
use crate::core::types::{NodeDatapoint, NodeId, Priority, TeamArc};
use crate::world::{MapQuery, Node, RandomSource, Services};

/// Weights for the top three ranked nodes
const RANK_WEIGHTS: [(usize, Priority); 3] = [
    (3, Priority::High),
    (2, Priority::Medium),
    (1, Priority::Low),
];

/// Record every node worth acting on this turn
///
/// Saturated nodes are skipped entirely, as are nodes already hosting a team
/// of the category's arc.
pub fn gather<M: MapQuery + ?Sized>(
    ctx: &mut TurnContext,
    map: &M,
    config: &PlannerConfig,
    sightings: &[ActivityRecord<NodeId>],
) {
    let capacity = config.pools.node_capacity;
    let max = config.pools.datapoint_max;
    let scorer = NodeScorer::new(&config.scoring, ctx.preferred, ctx.turn);

    ctx.best_guess = best_guess_location(
        sightings,
        map.node_activity(),
        map.connection_activity(),
        ctx.turn,
        config.tracker.guess_window,
    );

    for id in map.node_ids() {
        let Some(node) = map.node(id) else {
            ctx.skip(PlannerError::missing_node(id));
            continue;
        };
        if node.is_saturated(capacity) {
            continue;
        }
        let preferred = node.arc == ctx.preferred;
        let record = |category: DatapointCategory, delta: i32, current: i32, score: i32| DatapointRecord {
            node: id,
            category,
            arc: node.arc,
            delta,
            current,
            preferred,
            score,
        };

        for datapoint in NodeDatapoint::ALL {
            let current = node.datapoint(datapoint);
            if current < max && !node.has_team(datapoint.remedy()) {
                ctx.records.push(record(datapoint.into(), max - current, current, 0));
            }
        }

        let target_known = node.target.is_some_and(|t| t.known);
        if !target_known && !node.has_team(TeamArc::Probe) {
            ctx.records.push(record(DatapointCategory::Probe, 0, 0, 0));
        }

        if !node.has_spider() {
            let live_target = node.target.is_some_and(|t| t.is_known_live());
            if live_target || node.flags.most_connected {
                let score = scorer.score(map, node, ScoreProfile::Defensive);
                if live_target {
                    ctx.records.push(record(DatapointCategory::Target, 0, 0, score));
                }
                if node.flags.most_connected {
                    ctx.records.push(record(DatapointCategory::Spider, 0, 0, score));
                }
            }
        }
    }

    if let Some(guess) = ctx.best_guess {
        let mut around = vec![guess];
        around.extend(map.near_neighbours(guess));
        for id in around {
            let Some(node) = map.node(id) else {
                ctx.skip(PlannerError::missing_node(id));
                continue;
            };
            if node.is_saturated(capacity) || node.has_team(TeamArc::Erasure) {
                continue;
            }
            ctx.records.push(DatapointRecord {
                node: id,
                category: DatapointCategory::Erasure,
                arc: node.arc,
                delta: 0,
                current: 0,
                preferred: node.arc == ctx.preferred,
                score: scorer.score(map, node, ScoreProfile::Pursuit),
            });
        }
    }

    tracing::debug!(
        "Turn {}: gathered {} records, best guess {:?}",
        ctx.turn,
        ctx.records.len(),
        ctx.best_guess
    );
}

/// Pick a remediation target and its priority
///
/// Critical records win outright and always come out at Critical tier.
/// Within either bucket a preferred-arc record is chosen when one exists.
pub fn select_node_task(
    records: &[DatapointRecord],
    rng: &mut dyn RandomSource,
) -> Option<(DatapointRecord, Priority)> {
    let (critical, degraded): (Vec<DatapointRecord>, Vec<DatapointRecord>) =
        records.iter().copied().partition(|r| r.is_critical());

    if !critical.is_empty() {
        let chosen = pick_preferring(&critical, rng)?;
        return Some((chosen, Priority::Critical));
    }

    let chosen = pick_preferring(&degraded, rng)?;
    let mut priority = if chosen.delta >= 2 {
        Priority::Medium
    } else {
        Priority::Low
    };
    if chosen.preferred {
        priority = priority.raised();
    }
    Some((chosen, priority))
}

fn pick_preferring(records: &[DatapointRecord], rng: &mut dyn RandomSource) -> Option<DatapointRecord> {
    let preferred: Vec<&DatapointRecord> = records.iter().filter(|r| r.preferred).collect();
    let pool: Vec<&DatapointRecord> = if preferred.is_empty() {
        records.iter().collect()
    } else {
        preferred
    };
    let index = rng.pick_index(pool.len())?;
    pool.get(index).map(|r| **r)
}

/// Expand ranked records into the top three weighted entries
fn ranked_entries(mut records: Vec<DatapointRecord>) -> Vec<(NodeId, Priority)> {
    records.sort_by(|a, b| b.score.cmp(&a.score).then(a.node.cmp(&b.node)));
    let mut entries = Vec::new();
    for (record, (copies, priority)) in records.iter().zip(RANK_WEIGHTS) {
        entries.extend(std::iter::repeat((record.node, priority)).take(copies));
    }
    entries
}

fn draw(entries: &[(NodeId, Priority)], rng: &mut dyn RandomSource) -> Option<(NodeId, Priority)> {
    let index = rng.pick_index(entries.len())?;
    entries.get(index).copied()
}

/// Emit the per-category deployment candidates
pub fn build_pools(ctx: &mut TurnContext, services: &mut Services<'_>, config: &PlannerConfig) {
    for datapoint in NodeDatapoint::ALL {
        remediation_pool(ctx, services, config, datapoint);
    }
    probe_pool(ctx, services, config);
    spider_pool(ctx, services, config);
    erasure_pool(ctx, services, config);

    tracing::debug!(
        "Turn {}: {} deployment candidates",
        ctx.turn,
        ctx.potential.len()
    );
}

fn propose_deploy(
    ctx: &mut TurnContext,
    services: &Services<'_>,
    arc: TeamArc,
    node: NodeId,
    priority: Priority,
) {
    let Some(name) = services.world.node(node).map(|n| n.name.clone()) else {
        ctx.skip(PlannerError::missing_node(node));
        return;
    };
    let sequence = ctx.next_sequence();
    ctx.plan_deploy(node);
    ctx.propose(CandidateTask::deploy(sequence, arc, node, &name, priority), 1);
}

/// The node can take one more team once this turn's proposals are counted
fn has_room(ctx: &TurnContext, services: &Services<'_>, capacity: usize, node: NodeId) -> bool {
    services
        .world
        .node(node)
        .is_some_and(|n| ctx.has_room(node, n.team_count(), capacity))
}

/// Records of `category` whose node still has room
fn open_records(
    ctx: &TurnContext,
    services: &Services<'_>,
    config: &PlannerConfig,
    category: DatapointCategory,
) -> Vec<DatapointRecord> {
    let capacity = config.pools.node_capacity;
    ctx.records_for(category)
        .filter(|r| has_room(ctx, services, capacity, r.node))
        .copied()
        .collect()
}

fn empty(ctx: &TurnContext, category: &'static str) {
    tracing::debug!("Turn {}: {}", ctx.turn, PlannerError::EmptyCandidatePool(category));
}

fn remediation_pool(
    ctx: &mut TurnContext,
    services: &mut Services<'_>,
    config: &PlannerConfig,
    datapoint: NodeDatapoint,
) {
    let arc = datapoint.remedy();
    if services.world.idle_count(arc) == 0 {
        return;
    }
    let records = open_records(ctx, services, config, datapoint.into());
    match select_node_task(&records, services.rng) {
        Some((record, priority)) => propose_deploy(ctx, services, arc, record.node, priority),
        None => empty(ctx, "remediation"),
    }
}

fn probe_pool(ctx: &mut TurnContext, services: &mut Services<'_>, config: &PlannerConfig) {
    if services.world.idle_count(TeamArc::Probe) == 0 {
        return;
    }
    let nodes: Vec<NodeId> = open_records(ctx, services, config, DatapointCategory::Probe)
        .into_iter()
        .map(|r| r.node)
        .collect();
    let chosen = services
        .rng
        .pick_index(nodes.len())
        .and_then(|i| nodes.get(i).copied());
    match chosen {
        Some(node) => propose_deploy(ctx, services, TeamArc::Probe, node, Priority::Low),
        None => empty(ctx, "probe"),
    }
}

fn spider_pool(ctx: &mut TurnContext, services: &mut Services<'_>, config: &PlannerConfig) {
    if services.world.idle_count(TeamArc::Spider) == 0 {
        return;
    }
    let connected = open_records(ctx, services, config, DatapointCategory::Spider);
    let mut entries = ranked_entries(connected);

    let copies = config.pools.target_copies;
    for record in open_records(ctx, services, config, DatapointCategory::Target) {
        let (priority, n) = if record.preferred {
            (Priority::Critical, copies + 1)
        } else {
            (Priority::High, copies)
        };
        entries.extend(std::iter::repeat((record.node, priority)).take(n));
    }

    match draw(&entries, services.rng) {
        Some((node, priority)) => propose_deploy(ctx, services, TeamArc::Spider, node, priority),
        None => empty(ctx, "spider"),
    }
}

fn erasure_pool(ctx: &mut TurnContext, services: &mut Services<'_>, config: &PlannerConfig) {
    let idle = services.world.idle_count(TeamArc::Erasure);
    if idle == 0 {
        return;
    }

    if ctx.best_guess.is_some() {
        let around = open_records(ctx, services, config, DatapointCategory::Erasure);
        let entries = ranked_entries(around);
        match draw(&entries, services.rng) {
            Some((node, priority)) => propose_deploy(ctx, services, TeamArc::Erasure, node, priority),
            None => empty(ctx, "erasure"),
        }
        return;
    }

    if idle < config.pools.erasure_fallback_min_idle {
        return;
    }

    // No guess: stake out a watched hub the Resistance doesn't know about
    let capacity = config.pools.node_capacity;
    let fallback: Vec<NodeId> = services
        .world
        .most_connected()
        .into_iter()
        .filter(|id| {
            services.world.node(*id).is_some_and(|n: &Node| {
                n.has_spider()
                    && !n.spider_known
                    && !n.has_team(TeamArc::Erasure)
                    && ctx.has_room(*id, n.team_count(), capacity)
            })
        })
        .collect();
    let chosen = services
        .rng
        .pick_index(fallback.len())
        .and_then(|i| fallback.get(i).copied());
    match chosen {
        Some(node) => propose_deploy(ctx, services, TeamArc::Erasure, node, Priority::Critical),
        None => empty(ctx, "erasure fallback"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{NodeArc, SecurityLevel, TargetId};
    use crate::world::{CityMap, Notice, Sandbox, ScriptedRng, TargetInfo, TargetStatus, TeamPool};

    fn record(node: u32, current: i32, preferred: bool) -> DatapointRecord {
        DatapointRecord {
            node: NodeId(node),
            category: DatapointCategory::Stability,
            arc: if preferred {
                NodeArc::Government
            } else {
                NodeArc::Sprawl
            },
            delta: 3 - current,
            current,
            preferred,
            score: 0,
        }
    }

    #[test]
    fn test_critical_preferred_always_wins() {
        let records = vec![
            record(0, 0, false),
            record(1, 0, true),
            record(2, 1, true),
        ];
        for seed in 0..20 {
            let mut rng = ScriptedRng::new([seed, seed + 1]);
            let (chosen, priority) = select_node_task(&records, &mut rng).unwrap();
            assert_eq!(chosen.node, NodeId(1));
            assert_eq!(priority, Priority::Critical);
        }
    }

    #[test]
    fn test_degradation_priority() {
        let mut rng = ScriptedRng::new([]);
        let (_, small) = select_node_task(&[record(0, 2, false)], &mut rng).unwrap();
        assert_eq!(small, Priority::Low);
        let (_, large) = select_node_task(&[record(0, 1, false)], &mut rng).unwrap();
        assert_eq!(large, Priority::Medium);
        let (_, preferred) = select_node_task(&[record(0, 1, true)], &mut rng).unwrap();
        assert_eq!(preferred, Priority::High);
    }

    #[test]
    fn test_no_records_no_task() {
        let mut rng = ScriptedRng::new([]);
        assert!(select_node_task(&[], &mut rng).is_none());
    }

    #[test]
    fn test_ranked_entries_weights() {
        let mut records: Vec<DatapointRecord> = (0..5).map(|i| record(i, 3, false)).collect();
        for (i, r) in records.iter_mut().enumerate() {
            r.score = i as i32;
        }
        let entries = ranked_entries(records);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries.iter().filter(|e| e.0 == NodeId(4)).count(), 3);
        assert_eq!(entries.iter().filter(|e| e.0 == NodeId(3)).count(), 2);
        assert_eq!(entries.iter().filter(|e| e.0 == NodeId(2)).count(), 1);
    }

    fn sandbox() -> Sandbox {
        let mut map = CityMap::new(10);
        for i in 0..4 {
            map.add_node(Node::new(NodeId(i), format!("N{}", i), NodeArc::Sprawl, 3));
        }
        map.connect(NodeId(0), NodeId(1), SecurityLevel::None);
        map.connect(NodeId(1), NodeId(2), SecurityLevel::None);
        map.connect(NodeId(2), NodeId(3), SecurityLevel::None);
        Sandbox::new(map).with_teams(2)
    }

    #[test]
    fn test_gather_skips_saturated_nodes() {
        let mut sandbox = sandbox();
        let config = PlannerConfig::default();
        {
            let node = sandbox.node_mut(NodeId(1)).unwrap();
            node.stability = 0;
            node.teams = vec![TeamArc::Probe; config.pools.node_capacity];
        }
        sandbox.node_mut(NodeId(2)).unwrap().stability = 0;

        let mut ctx = TurnContext::new(1, NodeArc::Government);
        gather(&mut ctx, &sandbox, &config, &[]);

        let stability: Vec<NodeId> = ctx
            .records_for(DatapointCategory::Stability)
            .map(|r| r.node)
            .collect();
        assert_eq!(stability, vec![NodeId(2)]);
        assert!(ctx.records.iter().all(|r| r.node != NodeId(1)));
    }

    #[test]
    fn test_build_pools_emits_critical_civil_deploy() {
        let mut sandbox = sandbox();
        let config = PlannerConfig::default();
        sandbox.node_mut(NodeId(3)).unwrap().stability = 0;

        let mut ctx = TurnContext::new(1, NodeArc::Government);
        gather(&mut ctx, &sandbox, &config, &[]);

        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ScriptedRng::new([]);
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        build_pools(&mut ctx, &mut services, &config);

        let civil: Vec<&CandidateTask> = ctx
            .potential
            .iter()
            .filter(|t| t.kind == crate::ai::task::TaskKind::Deploy(TeamArc::Civil))
            .collect();
        assert_eq!(civil.len(), 1);
        assert_eq!(civil[0].node, Some(NodeId(3)));
        assert!(civil[0].is_critical());
    }

    #[test]
    fn test_no_idle_team_no_candidate() {
        let mut map = CityMap::new(10);
        map.add_node(Node::new(NodeId(0), "Lone", NodeArc::Sprawl, 3));
        let mut sandbox = Sandbox::new(map);
        sandbox.node_mut(NodeId(0)).unwrap().stability = 0;
        let config = PlannerConfig::default();

        let mut ctx = TurnContext::new(1, NodeArc::Sprawl);
        gather(&mut ctx, &sandbox, &config, &[]);
        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ScriptedRng::new([]);
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        build_pools(&mut ctx, &mut services, &config);
        assert!(ctx.potential.is_empty());
    }

    #[test]
    fn test_erasure_targets_guess_neighbourhood() {
        let mut sandbox = sandbox();
        sandbox.map.record_node_activity(NodeId(0), 1);
        let config = PlannerConfig::default();
        let sightings = [ActivityRecord {
            id: NodeId(0),
            turn: 1,
        }];

        let mut ctx = TurnContext::new(1, NodeArc::Government);
        gather(&mut ctx, &sandbox, &config, &sightings);
        assert_eq!(ctx.best_guess, Some(NodeId(0)));

        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ScriptedRng::new([]);
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        build_pools(&mut ctx, &mut services, &config);

        let erasure = ctx
            .potential
            .iter()
            .find(|t| t.kind == crate::ai::task::TaskKind::Deploy(TeamArc::Erasure))
            .unwrap();
        // Node 3 is three hops away
        assert!(matches!(
            erasure.node,
            Some(NodeId(0)) | Some(NodeId(1)) | Some(NodeId(2))
        ));
    }

    fn deploys(ctx: &TurnContext, arc: TeamArc) -> Vec<&CandidateTask> {
        ctx.potential
            .iter()
            .filter(|t| t.kind == crate::ai::task::TaskKind::Deploy(arc))
            .collect()
    }

    /// Two districts; node 0 already holds two teams and has two failing datapoints
    #[test]
    fn test_pools_respect_capacity_within_turn() {
        let mut map = CityMap::new(10);
        map.add_node(Node::new(NodeId(0), "Crowded", NodeArc::Sprawl, 3));
        map.add_node(Node::new(NodeId(1), "Quiet", NodeArc::Sprawl, 3));
        map.connect(NodeId(0), NodeId(1), SecurityLevel::None);
        let mut sandbox = Sandbox::new(map);
        sandbox.add_team(TeamArc::Civil);
        sandbox.add_team(TeamArc::Control);
        {
            let node = sandbox.node_mut(NodeId(0)).unwrap();
            node.teams = vec![TeamArc::Probe, TeamArc::Spider];
            node.stability = 0;
            node.security = 0;
        }
        let config = PlannerConfig::default();
        assert_eq!(config.pools.node_capacity, 3);

        let mut ctx = TurnContext::new(1, NodeArc::Sprawl);
        gather(&mut ctx, &sandbox, &config, &[]);
        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ScriptedRng::new([]);
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        build_pools(&mut ctx, &mut services, &config);

        let crowded = ctx
            .potential
            .iter()
            .filter(|t| t.node == Some(NodeId(0)))
            .count();
        assert_eq!(crowded, 1);
        assert_eq!(deploys(&ctx, TeamArc::Civil).len(), 1);
        assert!(deploys(&ctx, TeamArc::Control).is_empty());
        assert_eq!(ctx.planned_at(NodeId(0)), 1);
    }

    fn spider_pick(preferred_target: bool, roll: i32) -> CandidateTask {
        let mut sandbox = sandbox();
        let config = PlannerConfig::default();
        let mut ctx = TurnContext::new(1, NodeArc::Government);
        ctx.records.push(DatapointRecord {
            category: DatapointCategory::Spider,
            score: 5,
            ..record(1, 0, false)
        });
        ctx.records.push(DatapointRecord {
            category: DatapointCategory::Target,
            ..record(3, 0, preferred_target)
        });

        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ScriptedRng::new([roll]);
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        spider_pool(&mut ctx, &mut services, &config);
        let mut spiders = deploys(&ctx, TeamArc::Spider);
        assert_eq!(spiders.len(), 1);
        spiders.remove(0).clone()
    }

    #[test]
    fn test_spider_pool_target_copies_and_tiers() {
        // Hub entries: three High copies, then the target's copies
        let hub = spider_pick(false, 2);
        assert_eq!(hub.node, Some(NodeId(1)));
        assert_eq!(hub.priority, Priority::High);

        let target = spider_pick(false, 3);
        assert_eq!(target.node, Some(NodeId(3)));
        assert_eq!(target.priority, Priority::High);

        // A preferred target gets one extra copy at Critical
        let last = PlannerConfig::default().pools.target_copies as i32 + 3;
        let preferred = spider_pick(true, last);
        assert_eq!(preferred.node, Some(NodeId(3)));
        assert_eq!(preferred.priority, Priority::Critical);
    }

    #[test]
    fn test_erasure_fallback_watches_hidden_spider_hub() {
        // Nodes 1 and 2 are the hubs; only node 1 hides its spider
        let mut sandbox = sandbox();
        sandbox.map.recompute_flags(1);
        {
            let known = sandbox.node_mut(NodeId(2)).unwrap();
            known.teams = vec![TeamArc::Spider];
            known.spider_known = true;
        }
        sandbox.node_mut(NodeId(1)).unwrap().teams = vec![TeamArc::Spider];
        let config = PlannerConfig::default();

        let mut ctx = TurnContext::new(1, NodeArc::Government);
        assert!(ctx.best_guess.is_none());
        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ScriptedRng::new([]);
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        erasure_pool(&mut ctx, &mut services, &config);

        let erasure = deploys(&ctx, TeamArc::Erasure);
        assert_eq!(erasure.len(), 1);
        assert_eq!(erasure[0].node, Some(NodeId(1)));
        assert!(erasure[0].is_critical());
    }

    #[test]
    fn test_erasure_fallback_needs_idle_reserve() {
        let mut sandbox = Sandbox::new({
            let mut map = CityMap::new(10);
            for i in 0..3 {
                map.add_node(Node::new(NodeId(i), format!("N{}", i), NodeArc::Sprawl, 3));
            }
            map.connect(NodeId(0), NodeId(1), SecurityLevel::None);
            map.connect(NodeId(1), NodeId(2), SecurityLevel::None);
            map.recompute_flags(1);
            map
        });
        sandbox.add_team(TeamArc::Erasure);
        sandbox.node_mut(NodeId(1)).unwrap().teams = vec![TeamArc::Spider];
        let config = PlannerConfig::default();
        assert!(config.pools.erasure_fallback_min_idle > 1);

        let mut ctx = TurnContext::new(1, NodeArc::Government);
        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ScriptedRng::new([]);
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        erasure_pool(&mut ctx, &mut services, &config);
        assert!(ctx.potential.is_empty());
    }

    #[test]
    fn test_probe_pool_skips_known_targets_and_probed_nodes() {
        let mut sandbox = sandbox();
        sandbox.node_mut(NodeId(0)).unwrap().target = Some(TargetInfo {
            id: TargetId(0),
            status: TargetStatus::Outstanding,
            known: true,
        });
        sandbox.node_mut(NodeId(1)).unwrap().teams = vec![TeamArc::Probe];
        let config = PlannerConfig::default();

        let mut ctx = TurnContext::new(1, NodeArc::Government);
        gather(&mut ctx, &sandbox, &config, &[]);
        let probed: Vec<NodeId> = ctx
            .records_for(DatapointCategory::Probe)
            .map(|r| r.node)
            .collect();
        assert_eq!(probed, vec![NodeId(2), NodeId(3)]);

        for roll in [0, 1] {
            let mut ctx = ctx.clone();
            let mut notices: Vec<Notice> = Vec::new();
            let mut rng = ScriptedRng::new([roll]);
            let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
            probe_pool(&mut ctx, &mut services, &config);
            let probe = deploys(&ctx, TeamArc::Probe);
            assert_eq!(probe.len(), 1);
            assert_eq!(probe[0].node, Some(NodeId(roll as u32 + 2)));
            assert_eq!(probe[0].priority, Priority::Low);
        }
    }
}

//! Integration tests for the Authority planner
//!
//! These drive the full turn pipeline against the in-memory sandbox:
//! - remediation priority on a small hand-built city
//! - the per-turn action budget across many turns
//! - resource request escalation after refusals
//! - hacking, countermeasures and reboot
//! - save and restore mid-game

use authority_planner::ai::decisions::EffectContext;
use authority_planner::ai::{
    AuthorityPersonality, AuthorityPlanner, CandidateTask, DecisionCatalog, DecisionId,
    DecisionMetrics, TaskKind,
};
use authority_planner::core::config::PlannerConfig;
use authority_planner::core::types::{NodeArc, NodeId, Priority, SecurityLevel, Side, TeamArc};
use authority_planner::persistence::PlannerSave;
use authority_planner::security::{AlertLevel, DetectionModifiers, SecurityState};
use authority_planner::world::{
    CityMap, Ledger, MapQuery, Node, Notice, Sandbox, ScriptedRng, Services, TeamPool,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn planner() -> AuthorityPlanner {
    AuthorityPlanner::new(PlannerConfig::default(), AuthorityPersonality::default())
        .expect("default config is valid")
}

/// Five districts in a chain, node 2 is a Government district
fn five_node_city() -> CityMap {
    let mut map = CityMap::new(10);
    let arcs = [
        NodeArc::Sprawl,
        NodeArc::Industrial,
        NodeArc::Government,
        NodeArc::Utility,
        NodeArc::Sprawl,
    ];
    for (i, arc) in arcs.into_iter().enumerate() {
        map.add_node(Node::new(NodeId(i as u32), format!("District {}", i), arc, 3));
    }
    for i in 1..5 {
        map.connect(NodeId(i - 1), NodeId(i), SecurityLevel::None);
    }
    map.recompute_flags(1);
    map
}

// ============================================================================
// Full turn
// ============================================================================

/// Two critical districts, only one of the preferred arc: the single civil
/// team must go to the preferred one, whatever the seed
#[test]
fn test_preferred_critical_district_wins() {
    for seed in 0..20 {
        let mut sandbox = Sandbox::new(five_node_city()).with_resources(10);
        sandbox.add_team(TeamArc::Civil);
        sandbox.node_mut(NodeId(2)).unwrap().stability = 0;
        sandbox.node_mut(NodeId(4)).unwrap().stability = 0;

        let mut planner = planner();
        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let report = {
            let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
            planner.run_turn(1, &mut services)
        };

        let deploy = report
            .executed
            .iter()
            .find(|t| t.kind == TaskKind::Deploy(TeamArc::Civil))
            .expect("civil deployment executed");
        assert_eq!(deploy.node, Some(NodeId(2)));
        assert_eq!(deploy.priority, Priority::Critical);
        assert!(sandbox.node(NodeId(2)).unwrap().has_team(TeamArc::Civil));
        assert!(!sandbox.node(NodeId(4)).unwrap().has_team(TeamArc::Civil));
    }
}

#[test]
fn test_budget_respected_over_many_turns() {
    let mut planner = planner();
    let budget = planner.config().selection.action_budget;
    let mut sandbox = Sandbox::new(CityMap::generate(30, 3, 10, 5))
        .with_teams(3)
        .with_resources(15);
    sandbox.lobby_available = true;
    sandbox.authority_stressed = true;
    for id in (0..30).step_by(2) {
        sandbox.node_mut(NodeId(id)).unwrap().support = 0;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(77);

    for turn in 1..=25 {
        sandbox.map.record_node_activity(NodeId(turn % 30), turn);
        sandbox.crisis_count = 2;
        let mut notices: Vec<Notice> = Vec::new();
        let report = {
            let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
            planner.run_turn(turn, &mut services)
        };

        assert!(report.executed.len() <= budget, "turn {}", turn);
        let criticals = planner
            .final_tasks()
            .iter()
            .filter(|t| t.priority == Priority::Critical)
            .count();
        assert!(criticals <= budget);
        assert!(planner.final_tasks().iter().all(|t| t.chance <= 100));
        assert!(planner.final_tasks().len() <= planner.config().selection.final_task_pool);
        sandbox.end_turn();
    }
}

/// Node 0 holds two teams and fails two datapoints: only one more team fits
#[test]
fn test_turn_never_overfills_a_district() {
    let capacity = PlannerConfig::default().pools.node_capacity;
    for seed in 0..20 {
        let mut map = CityMap::new(10);
        map.add_node(Node::new(NodeId(0), "Crowded", NodeArc::Sprawl, 3));
        map.add_node(Node::new(NodeId(1), "Quiet", NodeArc::Sprawl, 3));
        map.connect(NodeId(0), NodeId(1), SecurityLevel::None);
        let mut sandbox = Sandbox::new(map).with_resources(10);
        sandbox.add_team(TeamArc::Civil);
        sandbox.add_team(TeamArc::Control);
        {
            let node = sandbox.node_mut(NodeId(0)).unwrap();
            node.teams = vec![TeamArc::Probe, TeamArc::Spider];
            node.stability = 0;
            node.security = 0;
        }

        let mut planner = planner();
        let mut notices: Vec<Notice> = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let report = {
            let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
            planner.run_turn(1, &mut services)
        };

        assert_eq!(sandbox.node(NodeId(0)).unwrap().team_count(), capacity, "seed {}", seed);
        let deployed = report
            .executed
            .iter()
            .filter(|t| matches!(t.kind, TaskKind::Deploy(_)))
            .count();
        assert_eq!(deployed, 1);
    }
}

#[test]
fn test_stages_can_run_individually() {
    let mut planner = planner();
    let mut sandbox = Sandbox::new(five_node_city()).with_teams(1).with_resources(10);
    sandbox.node_mut(NodeId(1)).unwrap().security = 1;
    let mut notices: Vec<Notice> = Vec::new();
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);

    let mut ctx = planner.gather_and_score(1, &mut services);
    assert!(!ctx.records.is_empty());
    planner.build_pools(&mut ctx, &mut services);
    assert!(!planner.potential().is_empty());
    planner.select_final_tasks(&mut ctx, 1, &mut services);
    let report = planner.execute(&mut ctx, 1, &mut services);
    assert!(report.executed.len() + report.skipped.len() <= 1);
    planner.tick_timers(1, &mut services);
}

// ============================================================================
// Decisions
// ============================================================================

/// Each refusal raises the next approval chance by the configured boost
#[test]
fn test_resource_request_chance_escalates() {
    let config = PlannerConfig::default();
    let personality = AuthorityPersonality::default();
    let catalog = DecisionCatalog::new(&config.decisions);
    let mut security = SecurityState::new(&config.security);
    let mut metrics = DecisionMetrics::default();
    let mut sandbox = Sandbox::new(five_node_city()).with_resources(1);
    let mut notices: Vec<Notice> = Vec::new();
    // 30% refused, 40% refused, 50% approved
    let mut rng = ScriptedRng::new([99, 99, 0]);

    let mut task = CandidateTask::decision(1, DecisionId::RequestResources, Priority::Medium);
    task.chance = 100;
    let mut chances = Vec::new();
    {
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        let mut env = EffectContext {
            turn: 1,
            config: &config,
            personality: &personality,
            security: &mut security,
            metrics: &mut metrics,
        };
        for _ in 0..3 {
            catalog.execute(&task, &mut env, &mut services).unwrap();
            chances.push(env.metrics.last_request_chance);
        }
    }

    assert_eq!(chances, vec![30, 40, 50]);
    assert_eq!(metrics.request_failures, 0);
    assert_eq!(sandbox.resources(Side::Authority), 1 + config.decisions.request_grant);
}

#[test]
fn test_unaffordable_decision_flags_next_turn() {
    let mut planner = planner();
    let mut sandbox = Sandbox::new(five_node_city()).with_resources(0);
    sandbox.authority_stressed = true;
    let mut notices: Vec<Notice> = Vec::new();
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);

    let mut ctx = planner.gather_and_score(1, &mut services);
    planner.build_pools(&mut ctx, &mut services);
    let mut leave = CandidateTask::decision(99, DecisionId::StressLeave, Priority::Low);
    leave.chance = 100;
    ctx.final_tasks = vec![leave];
    let report = planner.execute(&mut ctx, 2, &mut services);

    assert!(report.executed.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert!(planner.metrics().resources_insufficient);

    let next = planner.gather_and_score(2, &mut services);
    assert!(next.resources_insufficient);
}

// ============================================================================
// Security
// ============================================================================

#[test]
fn test_three_detections_reboot_and_raise_cost() {
    let mut planner = planner();
    let mut sandbox = Sandbox::new(five_node_city());
    sandbox.set_resources(Side::Resistance, 10);
    let mut notices: Vec<Notice> = Vec::new();
    let mut rng = ScriptedRng::new([0, 0, 0]);
    let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);

    for turn in 1..=3 {
        planner
            .on_hacking_attempt(turn, None, DetectionModifiers::default(), &mut services)
            .unwrap();
    }
    assert!(planner.security().is_rebooting);
    assert_eq!(planner.security().alert_level, AlertLevel::Critical);
    assert_eq!(services.world.resources(Side::Resistance), 7);

    // Locked out while rebooting
    let refused = planner.on_hacking_attempt(4, None, DetectionModifiers::default(), &mut services);
    assert!(refused.is_err());

    let reboot = planner.config().security.reboot_duration;
    for turn in 0..reboot {
        planner.tick_timers(4 + turn, &mut services);
    }
    let security = planner.security();
    assert!(!security.is_rebooting);
    assert_eq!(security.alert_level, AlertLevel::Low);
    assert_eq!(
        security.hacking_cost,
        planner.config().security.hacking_cost_base + planner.config().security.hacking_cost_increment
    );
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_save_and_restore_mid_game() {
    let mut planner = planner();
    let mut sandbox = Sandbox::new(CityMap::generate(12, 3, 10, 2))
        .with_teams(2)
        .with_resources(8);
    sandbox.set_resources(Side::Resistance, 5);
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    {
        let mut notices: Vec<Notice> = Vec::new();
        let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
        for turn in 1..=3 {
            planner.run_turn(turn, &mut services);
        }
        let _ = planner.on_hacking_attempt(3, None, DetectionModifiers::default(), &mut services);
    }

    let json = planner.save().to_json().unwrap();
    let mut restored = self::planner();
    restored.restore(PlannerSave::from_json(&json).unwrap());

    assert_eq!(restored.save(), planner.save());
    assert_eq!(restored.security(), planner.security());
    assert_eq!(restored.final_tasks(), planner.final_tasks());
}

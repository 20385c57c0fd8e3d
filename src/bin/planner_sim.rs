//! Authority planner simulation
//! Runs the planner against a generated city and a scripted Resistance

use authority_planner::ai::{load_personality, AuthorityPlanner, TurnReport};
use authority_planner::core::config::{load_config, PlannerConfig};
use authority_planner::core::types::{NodeDatapoint, NodeId, Side};
use authority_planner::security::{DetectionModifiers, GearEffect};
use authority_planner::world::{CityMap, Ledger, MapQuery, Notice, RandomSource, Sandbox, Services};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

/// Planner simulation - the Authority AI against a wandering Resistance
#[derive(Parser, Debug)]
#[command(name = "planner_sim")]
#[command(about = "Run the Authority planner for a number of turns")]
struct Args {
    /// Random seed for reproducible runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Turns to simulate
    #[arg(long, default_value_t = 20)]
    turns: u32,

    /// Districts in the generated city
    #[arg(long, default_value_t = 24)]
    nodes: u32,

    /// Personality file under data/ai_personalities
    #[arg(long, default_value = "default")]
    personality: String,

    /// Planner config TOML, defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the planner state as JSON after the last turn
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print every notice
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

/// Resistance stand-in that wanders the map, wears districts down and hacks
struct ScriptedResistance {
    location: NodeId,
}

impl ScriptedResistance {
    fn act(&mut self, sandbox: &mut Sandbox, turn: u32, rng: &mut ChaCha8Rng) -> bool {
        let connections = sandbox.node_connections(self.location);
        if let Some(index) = rng.pick_index(connections.len()) {
            let connection = connections[index];
            let destination = sandbox
                .connection(connection)
                .and_then(|c| c.other_end(self.location));
            if let Some(destination) = destination {
                sandbox.map.record_traversal(connection, self.location, turn);
                self.location = destination;
            }
        }

        let datapoint = NodeDatapoint::ALL[rng.uniform_int(0, 3) as usize];
        if let Some(node) = sandbox.node_mut(self.location) {
            let value = node.datapoint(datapoint);
            node.set_datapoint(datapoint, (value - 1).max(0));
        }

        // Only half the moves are noticed
        if rng.roll_percent() < 50 {
            sandbox.map.record_node_activity(self.location, turn);
            sandbox.immediate_notice = true;
        }

        rng.roll_percent() < 40
    }
}

fn main() -> authority_planner::core::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => PlannerConfig::default(),
    };
    let personality = load_personality(&args.personality)?;
    tracing::info!(
        "Personality '{}' prefers {:?} districts",
        personality.name,
        personality.preferred_arc
    );

    let map = CityMap::generate(
        args.nodes,
        config.pools.datapoint_max,
        config.tracker.queue_capacity,
        args.seed,
    );
    let mut sandbox = Sandbox::new(map).with_teams(2).with_resources(6);
    sandbox.set_resources(Side::Resistance, 10);
    sandbox.lobby_available = true;

    let mut planner = AuthorityPlanner::new(config, personality)?;
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut resistance_rng = ChaCha8Rng::seed_from_u64(args.seed.wrapping_add(1));
    let mut resistance = ScriptedResistance { location: NodeId(0) };

    let mut totals = TurnReport::default();
    for turn in 1..=args.turns {
        let hacks = resistance.act(&mut sandbox, turn, &mut resistance_rng);
        sandbox.crisis_count = sandbox
            .node_ids()
            .into_iter()
            .filter_map(|id| sandbox.node(id))
            .filter(|n| NodeDatapoint::ALL.iter().any(|d| n.datapoint(*d) == 0))
            .count();

        let mut notices: Vec<Notice> = Vec::new();
        let report = {
            let mut services = Services::new(&mut sandbox, &mut notices, &mut rng);
            if hacks {
                // The Resistance swaps in a trace mask every fifth turn
                let gear: &[GearEffect] = if turn % 5 == 0 { &[GearEffect::TraceMask] } else { &[] };
                planner.refresh_masking(gear);
                match planner.on_hacking_attempt(
                    turn,
                    Some(resistance.location),
                    DetectionModifiers::default(),
                    &mut services,
                ) {
                    Ok(outcome) => tracing::info!(
                        "Turn {}: hack at {}% detected={} alert={:?}",
                        turn,
                        outcome.chance,
                        outcome.detected,
                        outcome.alert_level
                    ),
                    Err(e) => tracing::info!("Turn {}: hack refused: {}", turn, e),
                }
            }
            planner.run_turn(turn, &mut services)
        };

        println!(
            "Turn {:>3} | executed {} | failed {} | dropped {} | resources {:>3} | loyalty {:>2}",
            turn,
            report.executed.len(),
            report.skipped.len(),
            report.dropped.len(),
            sandbox.authority_resources,
            sandbox.city_loyalty
        );
        for task in &report.executed {
            println!("          - {}", task);
        }
        if args.verbose {
            for notice in &notices {
                println!("          [{:?}] {}", notice.kind, notice.text);
            }
        }

        totals.executed.extend(report.executed);
        totals.skipped.extend(report.skipped);
        totals.dropped.extend(report.dropped);
        totals.convergence_fallback |= report.convergence_fallback;
        sandbox.end_turn();
    }

    println!();
    println!("=== SUMMARY ===");
    println!("Turns: {}", args.turns);
    println!("Executed: {}", totals.executed.len());
    println!("Failed: {}", totals.skipped.len());
    println!("Dropped: {}", totals.dropped.len());
    println!("Teams deployed: {}", sandbox.deployed().count());
    println!("Secured connections: {:.0}%", sandbox.map.security_ratio() * 100.0);
    println!("Alert level: {:?}", planner.security().alert_level);
    if totals.convergence_fallback {
        println!("Execution fell back to in-order at least once");
    }

    if let Some(path) = &args.save {
        planner.save().save_to_file(path)?;
        println!("Planner state written to {}", path.display());
    }

    Ok(())
}

//! Action execution
//!
//! Runs the final task list in two phases: guaranteed tasks first, then
//! chance tasks rolled in repeated passes until the budget is spent. A pass
//! ceiling guards the rolling phase; past it the remainder runs in order.

use serde::{Deserialize, Serialize};

use crate::ai::decisions::{DecisionCatalog, EffectContext};
use crate::ai::task::{CandidateTask, TaskKind};
use crate::core::error::{PlannerError, Result};
use crate::core::types::Turn;
use crate::world::{NoticeKind, Services};

/// What happened to the final task list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: Turn,
    /// Tasks that ran successfully
    pub executed: Vec<CandidateTask>,
    /// Tasks never attempted
    pub dropped: Vec<CandidateTask>,
    /// Attempts that failed, with the reason
    pub skipped: Vec<String>,
    /// The rolling phase hit its pass ceiling
    pub convergence_fallback: bool,
}

impl TurnReport {
    pub fn new(turn: Turn) -> Self {
        Self {
            turn,
            ..Default::default()
        }
    }
}

/// Executes final tasks against the world
pub struct ActionExecutor<'c> {
    catalog: &'c DecisionCatalog,
    budget: usize,
    retry_ceiling: usize,
}

impl<'c> ActionExecutor<'c> {
    pub fn new(catalog: &'c DecisionCatalog, budget: usize, retry_ceiling: usize) -> Self {
        Self {
            catalog,
            budget,
            retry_ceiling,
        }
    }

    /// Execute `tasks`; every attempt, successful or not, uses one budget slot
    pub fn execute(
        &self,
        tasks: Vec<CandidateTask>,
        env: &mut EffectContext<'_>,
        services: &mut Services<'_>,
        report: &mut TurnReport,
    ) {
        let mut attempts = 0;
        let mut remaining = Vec::new();

        // Phase 1: guaranteed tasks run, zero-chance tasks go
        for task in tasks {
            if task.is_guaranteed() {
                if attempts < self.budget {
                    self.attempt(task, env, services, report);
                    attempts += 1;
                } else {
                    report.dropped.push(task);
                }
            } else if task.chance == 0 {
                report.dropped.push(task);
            } else {
                remaining.push(task);
            }
        }

        // Phase 2: roll the rest, the last task standing always succeeds
        let mut passes = 0;
        while attempts < self.budget && !remaining.is_empty() {
            if passes >= self.retry_ceiling {
                let failure = PlannerError::SelectionConvergenceFailure {
                    remaining: remaining.len(),
                    budget: self.budget,
                };
                tracing::warn!("Turn {}: {}, running remainder in order", env.turn, failure);
                report.convergence_fallback = true;
                while attempts < self.budget && !remaining.is_empty() {
                    let task = remaining.remove(0);
                    self.attempt(task, env, services, report);
                    attempts += 1;
                }
                break;
            }
            passes += 1;

            let mut index = 0;
            while index < remaining.len() && attempts < self.budget {
                let last = remaining.len() == 1;
                if last || services.rng.roll_percent() < i32::from(remaining[index].chance) {
                    let task = remaining.remove(index);
                    self.attempt(task, env, services, report);
                    attempts += 1;
                } else {
                    index += 1;
                }
            }
        }

        report.dropped.extend(remaining);
        tracing::info!(
            "Turn {}: executed {}, failed {}, dropped {}",
            env.turn,
            report.executed.len(),
            report.skipped.len(),
            report.dropped.len()
        );
    }

    fn attempt(
        &self,
        task: CandidateTask,
        env: &mut EffectContext<'_>,
        services: &mut Services<'_>,
        report: &mut TurnReport,
    ) {
        match self.run(&task, env, services) {
            Ok(()) => {
                tracing::debug!("Turn {}: executed {}", env.turn, task);
                report.executed.push(task);
            }
            Err(error) => {
                tracing::warn!("Turn {}: {} failed: {}", env.turn, task, error);
                report.skipped.push(format!("{}: {}", task, error));
            }
        }
    }

    fn run(
        &self,
        task: &CandidateTask,
        env: &mut EffectContext<'_>,
        services: &mut Services<'_>,
    ) -> Result<()> {
        match task.kind {
            TaskKind::Deploy(arc) => {
                let node = task.node.ok_or(PlannerError::MissingReference {
                    kind: "deployment node",
                    id: task.sequence_id,
                })?;
                let capacity = env.config.pools.node_capacity;
                let saturated = services
                    .world
                    .node(node)
                    .ok_or_else(|| PlannerError::missing_node(node))?
                    .is_saturated(capacity);
                if saturated {
                    return Err(PlannerError::DecisionBlocked("node at capacity"));
                }
                services.world.deploy(arc, node)?;
                services.notify(
                    env.turn,
                    NoticeKind::Deployment,
                    format!("{:?} team deployed to {}", arc, task.name1),
                );
                Ok(())
            }
            TaskKind::Decision(_) => self.catalog.execute(task, env, services),
        }
    }
}

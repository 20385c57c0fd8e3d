//! Turn selection
//!
//! Narrows the potential list down to the final task list and assigns each
//! task its execution chance. Critical tasks are guaranteed while they fit
//! the budget; the rest compete in a priority-weighted draw.

use crate::ai::task::CandidateTask;
use crate::world::RandomSource;

/// Chooses the final tasks for a turn
#[derive(Debug, Clone, Copy)]
pub struct TurnSelector {
    /// Most tasks that may execute this turn
    pub action_budget: usize,
    /// Target size of the final list
    pub pool_size: usize,
}

impl TurnSelector {
    pub fn new(action_budget: usize, pool_size: usize) -> Self {
        Self {
            action_budget,
            pool_size,
        }
    }

    pub fn select(&self, potential: &[CandidateTask], rng: &mut dyn RandomSource) -> Vec<CandidateTask> {
        let (critical, non_critical): (Vec<CandidateTask>, Vec<CandidateTask>) =
            potential.iter().cloned().partition(|t| t.is_critical());
        let critical = distinct(critical);

        let mut selected = Vec::new();
        let cap = self.pool_size.min(self.action_budget);

        if critical.len() <= cap {
            selected.extend(critical);
        } else {
            let mut bag = critical;
            let total = bag.len();
            while selected.len() < cap {
                let Some(index) = rng.pick_index(bag.len()) else {
                    break;
                };
                selected.push(bag.swap_remove(index));
            }
            tracing::debug!("{} critical tasks discarded", total - selected.len());
        }
        for task in &mut selected {
            task.chance = 100;
        }

        let slots = self.pool_size.saturating_sub(selected.len());
        if slots > 0 {
            let distinct_count = distinct(non_critical.clone()).len();
            if distinct_count <= slots {
                selected.extend(distinct(non_critical).into_iter().map(|mut t| {
                    t.chance = 0;
                    t
                }));
            } else {
                selected.extend(weighted_draw(non_critical, slots, rng));
            }
        }

        assign_chances(&mut selected, self.action_budget);
        selected
    }
}

/// Keep the first copy of each task
fn distinct(tasks: Vec<CandidateTask>) -> Vec<CandidateTask> {
    let mut seen = Vec::new();
    tasks
        .into_iter()
        .filter(|t| {
            if seen.contains(&t.sequence_id) {
                false
            } else {
                seen.push(t.sequence_id);
                true
            }
        })
        .collect()
}

/// Draw `slots` distinct tasks from a bag weighted by priority
///
/// Every drawn task has all of its copies purged before the next draw.
pub fn weighted_draw(
    tasks: Vec<CandidateTask>,
    slots: usize,
    rng: &mut dyn RandomSource,
) -> Vec<CandidateTask> {
    let mut bag: Vec<CandidateTask> = Vec::new();
    for task in tasks {
        let weight = task.priority.weight();
        bag.extend(std::iter::repeat(task).take(weight));
    }

    let mut chosen = Vec::new();
    while chosen.len() < slots {
        let Some(index) = rng.pick_index(bag.len()) else {
            break;
        };
        let mut task = bag.swap_remove(index);
        bag.retain(|t| t.sequence_id != task.sequence_id);
        task.chance = 0;
        chosen.push(task);
    }
    chosen
}

/// Spread the budget left after guaranteed tasks across the rest
///
/// With `R` slots left for `M` chance tasks each gets `100 R / M`, or 100
/// when they all fit.
pub fn assign_chances(tasks: &mut [CandidateTask], action_budget: usize) {
    let guaranteed = tasks.iter().filter(|t| t.is_guaranteed()).count();
    let remaining = action_budget.saturating_sub(guaranteed);
    let chance_tasks = tasks.len() - guaranteed;
    if chance_tasks == 0 {
        return;
    }

    let chance = if remaining >= chance_tasks {
        100
    } else {
        (100 * remaining / chance_tasks) as u8
    };
    for task in tasks.iter_mut().filter(|t| !t.is_guaranteed()) {
        task.chance = chance;
    }
}

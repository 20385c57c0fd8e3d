//! Per-turn planning context
//!
//! Built fresh at the start of every turn and threaded through each stage.
//! Everything here is transient; long-lived state stays on the planner.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::ai::task::{push_weighted, CandidateTask, SequenceCounter};
use crate::core::error::PlannerError;
use crate::core::types::{NodeArc, NodeDatapoint, NodeId, Turn};

/// What a datapoint record was gathered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatapointCategory {
    Stability,
    Security,
    Support,
    Probe,
    Spider,
    Erasure,
    Target,
}

impl From<NodeDatapoint> for DatapointCategory {
    fn from(datapoint: NodeDatapoint) -> Self {
        match datapoint {
            NodeDatapoint::Stability => Self::Stability,
            NodeDatapoint::Security => Self::Security,
            NodeDatapoint::Support => Self::Support,
        }
    }
}

/// One scored observation about a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatapointRecord {
    pub node: NodeId,
    pub category: DatapointCategory,
    pub arc: NodeArc,
    /// Distance from the best possible value
    pub delta: i32,
    pub current: i32,
    pub preferred: bool,
    pub score: i32,
}

impl DatapointRecord {
    /// The datapoint is at its worst possible value
    pub fn is_critical(&self) -> bool {
        self.current <= 0
    }
}

/// Transient state for one planning turn
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub turn: Turn,
    pub preferred: NodeArc,
    pub records: Vec<DatapointRecord>,
    /// Best guess of the Resistance location this turn
    pub best_guess: Option<NodeId>,
    /// Every candidate emitted this turn, weighted copies included
    pub potential: Vec<CandidateTask>,
    /// Tasks chosen by the selector
    pub final_tasks: Vec<CandidateTask>,
    /// Resources ran short during the previous turn
    pub resources_insufficient: bool,
    /// Errors recovered while planning
    pub skipped: Vec<String>,
    /// Deployments proposed per node this turn
    planned: AHashMap<NodeId, usize>,
    sequence: SequenceCounter,
}

impl TurnContext {
    pub fn new(turn: Turn, preferred: NodeArc) -> Self {
        Self {
            turn,
            preferred,
            records: Vec::new(),
            best_guess: None,
            potential: Vec::new(),
            final_tasks: Vec::new(),
            resources_insufficient: false,
            skipped: Vec::new(),
            planned: AHashMap::new(),
            sequence: SequenceCounter::default(),
        }
    }

    pub fn next_sequence(&mut self) -> u32 {
        self.sequence.next()
    }

    pub fn records_for(
        &self,
        category: DatapointCategory,
    ) -> impl Iterator<Item = &DatapointRecord> + '_ {
        self.records.iter().filter(move |r| r.category == category)
    }

    /// Add `copies` weighted copies of a candidate to the potential list
    pub fn propose(&mut self, task: CandidateTask, copies: usize) {
        tracing::debug!("Turn {}: proposing {} x{}", self.turn, task, copies);
        push_weighted(&mut self.potential, task, copies);
    }

    /// Deployments already proposed for `node` this turn
    pub fn planned_at(&self, node: NodeId) -> usize {
        self.planned.get(&node).copied().unwrap_or(0)
    }

    pub fn plan_deploy(&mut self, node: NodeId) {
        *self.planned.entry(node).or_insert(0) += 1;
    }

    /// A node holding `present` teams can take one more deployment
    pub fn has_room(&self, node: NodeId, present: usize, capacity: usize) -> bool {
        present + self.planned_at(node) < capacity
    }

    /// Note a recovered error and carry on
    pub fn skip(&mut self, error: PlannerError) {
        tracing::warn!("Turn {}: skipped: {}", self.turn, error);
        self.skipped.push(error.to_string());
    }

    pub fn critical_count(&self) -> usize {
        self.potential.iter().filter(|t| t.is_critical()).count()
    }
}

//! Recency tracking of observed Resistance activity
//!
//! Two bounded queues (by node, by connection) are kept by the map and feed
//! a single best guess of where the Resistance player currently is.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::types::{ConnectionId, NodeId, Turn};

/// An observed event at `id` during `turn`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord<T> {
    pub id: T,
    pub turn: Turn,
}

/// Movement of the Resistance along a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traversal {
    pub connection: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
}

impl Traversal {
    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

/// Fixed-size FIFO of recent observations, oldest evicted first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecencyQueue<T> {
    records: VecDeque<ActivityRecord<T>>,
    capacity: usize,
}

impl<T: Copy> RecencyQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, id: T, turn: Turn) {
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(ActivityRecord { id, turn });
    }

    /// Most recently appended record
    pub fn latest(&self) -> Option<&ActivityRecord<T>> {
        self.records.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityRecord<T>> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<T: Copy> Default for RecencyQueue<T> {
    fn default() -> Self {
        Self::new(10)
    }
}

fn within_window(record_turn: Turn, turn: Turn, window: u32) -> bool {
    turn.saturating_sub(record_turn) <= window
}

/// Derive the most likely current Resistance location
///
/// Order of evidence:
/// 1. the latest sighting reported this turn (trace hits, direct sightings)
/// 2. the far end of the latest connection traversal, if recent enough
/// 3. the latest node observation, if recent enough and confirmed by a
///    traversal touching that node
pub fn best_guess_location(
    sightings: &[ActivityRecord<NodeId>],
    nodes: &RecencyQueue<NodeId>,
    connections: &RecencyQueue<Traversal>,
    turn: Turn,
    window: u32,
) -> Option<NodeId> {
    if let Some(sighting) = sightings
        .iter()
        .filter(|s| within_window(s.turn, turn, window))
        .max_by_key(|s| s.turn)
    {
        return Some(sighting.id);
    }

    if let Some(latest) = connections.latest() {
        if within_window(latest.turn, turn, window) {
            return Some(latest.id.to);
        }
    }

    let latest = nodes.latest()?;
    if !within_window(latest.turn, turn, window) {
        return None;
    }

    connections
        .iter()
        .any(|record| record.id.touches(latest.id))
        .then_some(latest.id)
}

//! City map - graph of districts joined by connections
//!
//! Reference implementation of [`MapQuery`]. Nodes are districts, connections
//! are edges carrying a security level. The map also keeps the two recency
//! queues of observed Resistance activity.

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use super::{Connection, MapQuery, Node, NodeFlags};
use crate::ai::tracker::{RecencyQueue, Traversal};
use crate::core::error::{PlannerError, Result};
use crate::core::types::{ConnectionId, NodeArc, NodeId, SecurityLevel, Turn};

/// District names used by the generator
const DISTRICT_NAMES: [&str; 16] = [
    "Ashgate", "Brightwater", "Cinder Row", "Dockside", "Eastvale", "Foundry",
    "Glasshill", "Harbour", "Ironmarket", "Junction", "Kingsreach", "Lowtown",
    "Millbank", "Northspire", "Old Quarter", "Parkside",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityMap {
    nodes: AHashMap<NodeId, Node>,
    connections: AHashMap<ConnectionId, Connection>,
    adjacency: AHashMap<NodeId, Vec<ConnectionId>>,
    node_activity: RecencyQueue<NodeId>,
    connection_activity: RecencyQueue<Traversal>,
    next_connection: u32,
}

impl CityMap {
    /// Create an empty map whose recency queues hold `queue_capacity` entries
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            nodes: AHashMap::new(),
            connections: AHashMap::new(),
            adjacency: AHashMap::new(),
            node_activity: RecencyQueue::new(queue_capacity),
            connection_activity: RecencyQueue::new(queue_capacity),
            next_connection: 0,
        }
    }

    /// Generate a connected city of `count` districts
    ///
    /// A spanning chain keeps the graph connected, extra random links give
    /// it loops. Flags are computed before returning.
    pub fn generate(count: u32, datapoint_max: i32, queue_capacity: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut map = Self::new(queue_capacity);

        for i in 0..count {
            let arc = NodeArc::ALL[rng.gen_range(0..NodeArc::ALL.len())];
            let base = DISTRICT_NAMES[i as usize % DISTRICT_NAMES.len()];
            let name = if i as usize >= DISTRICT_NAMES.len() {
                format!("{} {}", base, i as usize / DISTRICT_NAMES.len() + 1)
            } else {
                base.to_string()
            };
            map.add_node(Node::new(NodeId(i), name, arc, datapoint_max));
        }

        for i in 1..count {
            let parent = rng.gen_range(0..i);
            map.connect(NodeId(parent), NodeId(i), SecurityLevel::None);
        }

        let extra = count / 2;
        for _ in 0..extra {
            let a = rng.gen_range(0..count);
            let b = rng.gen_range(0..count);
            if a != b && !map.are_connected(NodeId(a), NodeId(b)) {
                let security = match rng.gen_range(0..4) {
                    0 => SecurityLevel::Low,
                    1 => SecurityLevel::Medium,
                    _ => SecurityLevel::None,
                };
                map.connect(NodeId(a), NodeId(b), security);
            }
        }

        map.recompute_flags((count as usize / 4).max(1));
        map
    }

    pub fn add_node(&mut self, node: Node) {
        self.adjacency.entry(node.id).or_default();
        self.nodes.insert(node.id, node);
    }

    /// Join two nodes, returning the new connection id
    pub fn connect(&mut self, a: NodeId, b: NodeId, security: SecurityLevel) -> ConnectionId {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(id, Connection { id, a, b, security });
        self.adjacency.entry(a).or_default().push(id);
        self.adjacency.entry(b).or_default().push(id);
        id
    }

    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbours(a).contains(&b)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.adjacency.get(&id).map_or(0, Vec::len)
    }

    /// Record Resistance activity at a node
    pub fn record_node_activity(&mut self, id: NodeId, turn: Turn) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.activity_count += 1;
            node.activity_last_turn = Some(turn);
            self.node_activity.push(id, turn);
        }
    }

    /// Record the Resistance moving along a connection away from `from`
    pub fn record_traversal(&mut self, connection: ConnectionId, from: NodeId, turn: Turn) {
        let Some(to) = self.connections.get(&connection).and_then(|c| c.other_end(from)) else {
            return;
        };
        self.connection_activity.push(
            Traversal {
                connection,
                from,
                to,
            },
            turn,
        );
    }

    /// Recompute chokepoint, centre and connectivity flags
    ///
    /// The top-connectivity set holds every node whose degree reaches the
    /// degree of the `top_n`-th best connected node.
    pub fn recompute_flags(&mut self, top_n: usize) {
        let ids = self.node_ids();
        if ids.is_empty() {
            return;
        }

        let mut degrees: Vec<usize> = ids.iter().map(|id| self.degree(*id)).collect();
        degrees.sort_unstable_by(|a, b| b.cmp(a));
        let cutoff = degrees[top_n.clamp(1, degrees.len()) - 1];

        let eccentricities: Vec<usize> = ids.iter().map(|id| self.eccentricity(*id)).collect();
        let min_ecc = eccentricities.iter().copied().min().unwrap_or(0);

        for (i, id) in ids.iter().enumerate() {
            let flags = NodeFlags {
                centre: eccentricities[i] == min_ecc,
                chokepoint: self.is_articulation(*id),
                most_connected: self.degree(*id) >= cutoff,
            };
            if let Some(node) = self.nodes.get_mut(id) {
                node.flags = flags;
            }
        }
    }

    /// Longest shortest-path distance from a node
    fn eccentricity(&self, start: NodeId) -> usize {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut furthest = 0;
        while let Some((current, depth)) = queue.pop_front() {
            furthest = furthest.max(depth);
            for next in self.neighbours(current) {
                if seen.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        furthest
    }

    /// Whether removing `id` disconnects its neighbours from each other
    fn is_articulation(&self, id: NodeId) -> bool {
        let neighbours = self.neighbours(id);
        let Some(&first) = neighbours.first() else {
            return false;
        };

        let mut seen = HashSet::from([id, first]);
        let mut queue = VecDeque::from([first]);
        while let Some(current) = queue.pop_front() {
            for next in self.neighbours(current) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        neighbours.iter().any(|n| !seen.contains(n))
    }

    /// Fraction of connections with any security
    pub fn security_ratio(&self) -> f32 {
        if self.connections.is_empty() {
            return 1.0;
        }
        let secured = self
            .connections
            .values()
            .filter(|c| c.security > SecurityLevel::None)
            .count();
        secured as f32 / self.connections.len() as f32
    }
}

impl MapQuery for CityMap {
    fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    fn node_connections(&self, id: NodeId) -> Vec<ConnectionId> {
        self.adjacency.get(&id).cloned().unwrap_or_default()
    }

    fn neighbours(&self, id: NodeId) -> Vec<NodeId> {
        self.node_connections(id)
            .into_iter()
            .filter_map(|c| self.connections.get(&c).and_then(|c| c.other_end(id)))
            .collect()
    }

    fn near_neighbours(&self, id: NodeId) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = Vec::new();
        for first in self.neighbours(id) {
            if first != id && !found.contains(&first) {
                found.push(first);
            }
            for second in self.neighbours(first) {
                if second != id && !found.contains(&second) {
                    found.push(second);
                }
            }
        }
        found.sort_unstable();
        found
    }

    fn node_activity(&self) -> &RecencyQueue<NodeId> {
        &self.node_activity
    }

    fn connection_activity(&self) -> &RecencyQueue<Traversal> {
        &self.connection_activity
    }

    fn set_connection_security(&mut self, id: ConnectionId, level: SecurityLevel) -> Result<()> {
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or_else(|| PlannerError::missing_connection(id))?;
        connection.security = level;
        Ok(())
    }

    fn set_node_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| PlannerError::missing_node(id))?;
        node.flags = flags;
        Ok(())
    }
}

//! Collaborator interfaces the planner queries and commands
//!
//! The planner never owns the map, the team roster, the resource ledger or
//! the city. It reaches them through these traits, bundled per call in
//! [`Services`]. [`Sandbox`] is a complete in-memory implementation used by
//! tests, benchmarks and the demo binary.

pub mod map;
pub mod rng;
pub mod sandbox;

use serde::{Deserialize, Serialize};

use crate::ai::tracker::{RecencyQueue, Traversal};
use crate::core::error::Result;
use crate::core::types::{
    ConnectionId, NodeArc, NodeDatapoint, NodeId, SecurityLevel, Side, TargetId, TeamArc, TeamId,
    Turn,
};

pub use map::CityMap;
pub use rng::{RandomSource, ScriptedRng};
pub use sandbox::Sandbox;

/// Progress of a Resistance target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    /// Not yet available to the Resistance
    Dormant,
    /// Available and unresolved
    Live,
    /// Completed but its effects are still running
    Outstanding,
    /// Completed and finished
    Done,
}

/// A Resistance target sitting at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub id: TargetId,
    pub status: TargetStatus,
    /// Whether the Authority knows about it
    pub known: bool,
}

impl TargetInfo {
    pub fn is_known_live(&self) -> bool {
        self.known && self.status == TargetStatus::Live
    }
}

/// Per-node flags maintained by the map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags {
    /// Inside the designated central map region
    pub centre: bool,
    /// Removing the node would split the map
    pub chokepoint: bool,
    /// Member of the top-connectivity set
    pub most_connected: bool,
}

/// A district on the city map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub arc: NodeArc,
    pub stability: i32,
    pub security: i32,
    pub support: i32,
    pub flags: NodeFlags,
    /// Authority teams currently deployed here
    pub teams: Vec<TeamArc>,
    pub target: Option<TargetInfo>,
    /// The Resistance knows about the spider deployed here
    pub spider_known: bool,
    /// Resistance activity observed here
    pub activity_count: u32,
    pub activity_last_turn: Option<Turn>,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, arc: NodeArc, datapoint_max: i32) -> Self {
        Self {
            id,
            name: name.into(),
            arc,
            stability: datapoint_max,
            security: datapoint_max,
            support: datapoint_max,
            flags: NodeFlags::default(),
            teams: Vec::new(),
            target: None,
            spider_known: false,
            activity_count: 0,
            activity_last_turn: None,
        }
    }

    pub fn datapoint(&self, datapoint: NodeDatapoint) -> i32 {
        match datapoint {
            NodeDatapoint::Stability => self.stability,
            NodeDatapoint::Security => self.security,
            NodeDatapoint::Support => self.support,
        }
    }

    pub fn set_datapoint(&mut self, datapoint: NodeDatapoint, value: i32) {
        match datapoint {
            NodeDatapoint::Stability => self.stability = value,
            NodeDatapoint::Security => self.security = value,
            NodeDatapoint::Support => self.support = value,
        }
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn has_team(&self, arc: TeamArc) -> bool {
        self.teams.contains(&arc)
    }

    pub fn has_spider(&self) -> bool {
        self.has_team(TeamArc::Spider)
    }

    pub fn is_saturated(&self, capacity: usize) -> bool {
        self.teams.len() >= capacity
    }
}

/// An edge between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub a: NodeId,
    pub b: NodeId,
    pub security: SecurityLevel,
}

impl Connection {
    /// Endpoint opposite `from`, None if `from` isn't an endpoint
    pub fn other_end(&self, from: NodeId) -> Option<NodeId> {
        if self.a == from {
            Some(self.b)
        } else if self.b == from {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Read access to the city graph plus the few writes the planner makes
pub trait MapQuery {
    fn node_ids(&self) -> Vec<NodeId>;
    fn node(&self, id: NodeId) -> Option<&Node>;
    fn connection_ids(&self) -> Vec<ConnectionId>;
    fn connection(&self, id: ConnectionId) -> Option<&Connection>;
    /// Connections touching a node
    fn node_connections(&self, id: NodeId) -> Vec<ConnectionId>;
    fn neighbours(&self, id: NodeId) -> Vec<NodeId>;
    /// Nodes within two hops, excluding the node itself
    fn near_neighbours(&self, id: NodeId) -> Vec<NodeId>;
    fn node_activity(&self) -> &RecencyQueue<NodeId>;
    fn connection_activity(&self) -> &RecencyQueue<Traversal>;
    fn set_connection_security(&mut self, id: ConnectionId, level: SecurityLevel) -> Result<()>;
    fn set_node_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<()>;

    /// Nodes in the top-connectivity set
    fn most_connected(&self) -> Vec<NodeId> {
        self.node_ids()
            .into_iter()
            .filter(|id| self.node(*id).is_some_and(|n| n.flags.most_connected))
            .collect()
    }
}

/// Authority team roster
pub trait TeamPool {
    fn idle_count(&self, arc: TeamArc) -> usize;
    fn deployed_count(&self, arc: TeamArc) -> usize;
    /// Move one idle team of `arc` onto `node`
    fn deploy(&mut self, arc: TeamArc, node: NodeId) -> Result<TeamId>;
    /// Add a new idle team to the reserve
    fn add_team(&mut self, arc: TeamArc) -> TeamId;

    fn total_count(&self, arc: TeamArc) -> usize {
        self.idle_count(arc) + self.deployed_count(arc)
    }
}

/// Per-faction resource pools
pub trait Ledger {
    fn resources(&self, side: Side) -> i32;
    fn set_resources(&mut self, side: Side, amount: i32);
}

/// Authority-wide security posture declared by decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityMode {
    /// All points bulletin
    Apb,
    SecurityAlert,
}

/// City-wide state read and written by the decision layer
pub trait CityState {
    fn city_loyalty(&self) -> i32;
    fn set_city_loyalty(&mut self, loyalty: i32);
    /// Nodes in crisis this turn
    fn crisis_count(&self) -> usize;
    fn crisis_modifier(&self) -> i32;
    fn set_crisis_modifier(&mut self, modifier: i32);
    fn security_mode(&self) -> Option<SecurityMode>;
    fn declare_security_mode(&mut self, mode: SecurityMode);
    /// Whether an immediate-notice event happened this turn
    fn immediate_notice(&self) -> bool;
    fn authority_stressed(&self) -> bool;
    fn grant_stress_leave(&mut self);
    fn lobby_available(&self) -> bool;
    fn lobby_hq(&mut self);
}

/// Everything the planner touches in the game world
pub trait GameWorld: MapQuery + TeamPool + Ledger + CityState {}

impl<T: MapQuery + TeamPool + Ledger + CityState> GameWorld for T {}

/// Category of a player-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Deployment,
    Decision,
    Countermeasure,
    Policy,
    Security,
    Logistics,
    Warning,
}

/// Human readable message about a planner outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub turn: Turn,
    pub kind: NoticeKind,
    pub text: String,
}

/// Fire-and-forget sink for notices
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

impl Notifier for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}

/// Collaborators handed to each planner stage
pub struct Services<'a> {
    pub world: &'a mut dyn GameWorld,
    pub notifier: &'a mut dyn Notifier,
    pub rng: &'a mut dyn RandomSource,
}

impl<'a> Services<'a> {
    pub fn new(
        world: &'a mut dyn GameWorld,
        notifier: &'a mut dyn Notifier,
        rng: &'a mut dyn RandomSource,
    ) -> Self {
        Self {
            world,
            notifier,
            rng,
        }
    }

    pub fn notify(&mut self, turn: Turn, kind: NoticeKind, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!("[turn {}] {:?}: {}", turn, kind, text);
        self.notifier.notify(Notice { turn, kind, text });
    }
}

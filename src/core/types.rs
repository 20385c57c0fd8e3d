//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Game turn counter (planning time unit)
pub type Turn = u32;

/// Location identifier on the city map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Connection (graph edge) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

/// Identifier of a single team in the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u32);

/// Identifier of a Resistance target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub u32);

/// The two opposing factions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Authority,
    Resistance,
}

/// District type of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeArc {
    Corporate,
    Gated,
    Government,
    Industrial,
    Research,
    Sprawl,
    Utility,
}

impl NodeArc {
    pub const ALL: [NodeArc; 7] = [
        NodeArc::Corporate,
        NodeArc::Gated,
        NodeArc::Government,
        NodeArc::Industrial,
        NodeArc::Research,
        NodeArc::Sprawl,
        NodeArc::Utility,
    ];
}

/// Security level of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SecurityLevel {
    None,
    Low,
    Medium,
    High,
}

impl SecurityLevel {
    /// One level tighter, saturating at High
    pub fn raised(self) -> Self {
        match self {
            Self::None => Self::Low,
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }
}

/// Priority tier of a candidate task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Selection weight used by every weighted pool (Low 1, Medium 2, High 3)
    pub fn weight(self) -> usize {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High | Self::Critical => 3,
        }
    }

    /// One tier higher, saturating at Critical
    pub fn raised(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }
}

/// Authority team types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamArc {
    /// Restores node stability
    Civil,
    /// Restores node security
    Control,
    /// Restores node support
    Media,
    /// Searches nodes for Resistance targets
    Probe,
    /// Hidden watcher that exposes Resistance activity
    Spider,
    /// Hunts the Resistance player
    Erasure,
}

impl TeamArc {
    pub const ALL: [TeamArc; 6] = [
        TeamArc::Civil,
        TeamArc::Control,
        TeamArc::Media,
        TeamArc::Probe,
        TeamArc::Spider,
        TeamArc::Erasure,
    ];
}

/// Tracked per-node values, 0 is the worst possible value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeDatapoint {
    Stability,
    Security,
    Support,
}

impl NodeDatapoint {
    pub const ALL: [NodeDatapoint; 3] = [
        NodeDatapoint::Stability,
        NodeDatapoint::Security,
        NodeDatapoint::Support,
    ];

    /// Team type that remediates this datapoint
    pub fn remedy(self) -> TeamArc {
        match self {
            Self::Stability => TeamArc::Civil,
            Self::Security => TeamArc::Control,
            Self::Support => TeamArc::Media,
        }
    }
}

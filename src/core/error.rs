use thiserror::Error;

use crate::core::types::TeamArc;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Missing {kind}: {id}")]
    MissingReference { kind: &'static str, id: u32 },

    #[error("Insufficient resources: cost {cost}, available {available}")]
    InsufficientResources { cost: i32, available: i32 },

    #[error("No idle {0:?} team in reserve")]
    NoIdleTeam(TeamArc),

    #[error("Empty candidate pool: {0}")]
    EmptyCandidatePool(&'static str),

    #[error("Selection failed to converge: {remaining} tasks left, budget {budget}")]
    SelectionConvergenceFailure { remaining: usize, budget: usize },

    #[error("Decision blocked: {0}")]
    DecisionBlocked(&'static str),

    #[error("Hacking unavailable: {0}")]
    HackingUnavailable(&'static str),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl PlannerError {
    pub fn missing_node(id: crate::core::types::NodeId) -> Self {
        Self::MissingReference { kind: "node", id: id.0 }
    }

    pub fn missing_connection(id: crate::core::types::ConnectionId) -> Self {
        Self::MissingReference { kind: "connection", id: id.0 }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;

//! Candidate tasks the planner may commit to in a turn

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::{ConnectionId, NodeId, Priority, TeamArc};
use crate::security::CountermeasureKind;
use crate::world::SecurityMode;

/// Impact tier shared by policies and handouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub const ALL: [Impact; 3] = [Impact::Low, Impact::Medium, Impact::High];

    /// Index into the per-tier config arrays
    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Copies added to the pool, biasing towards higher impact
    pub fn copies(self) -> usize {
        self.index() + 1
    }

    pub fn priority(self) -> Priority {
        match self {
            Self::Low => Priority::Low,
            Self::Medium => Priority::Medium,
            Self::High => Priority::High,
        }
    }
}

/// Loyalty-costing policies that damp the chance of node crises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    Censorship,
    BanProtests,
    Curfew,
    Roadblocks,
    MartialLaw,
    EmergencyPowers,
}

impl PolicyKind {
    pub fn impact(self) -> Impact {
        match self {
            Self::Censorship | Self::BanProtests => Impact::Low,
            Self::Curfew | Self::Roadblocks => Impact::Medium,
            Self::MartialLaw | Self::EmergencyPowers => Impact::High,
        }
    }

    /// The two options available at an impact tier
    pub fn options(impact: Impact) -> [PolicyKind; 2] {
        match impact {
            Impact::Low => [Self::Censorship, Self::BanProtests],
            Impact::Medium => [Self::Curfew, Self::Roadblocks],
            Impact::High => [Self::MartialLaw, Self::EmergencyPowers],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Censorship => "Censorship",
            Self::BanProtests => "Ban Protests",
            Self::Curfew => "Curfew",
            Self::Roadblocks => "Roadblocks",
            Self::MartialLaw => "Martial Law",
            Self::EmergencyPowers => "Emergency Powers",
        }
    }
}

/// Loyalty-buying handouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandoutKind {
    Holiday,
    StreetParty,
    Subsidies,
    FoodDrive,
    Festival,
    Amnesty,
}

impl HandoutKind {
    pub fn impact(self) -> Impact {
        match self {
            Self::Holiday | Self::StreetParty => Impact::Low,
            Self::Subsidies | Self::FoodDrive => Impact::Medium,
            Self::Festival | Self::Amnesty => Impact::High,
        }
    }

    pub fn options(impact: Impact) -> [HandoutKind; 2] {
        match impact {
            Impact::Low => [Self::Holiday, Self::StreetParty],
            Impact::Medium => [Self::Subsidies, Self::FoodDrive],
            Impact::High => [Self::Festival, Self::Amnesty],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Holiday => "Holiday",
            Self::StreetParty => "Street Party",
            Self::Subsidies => "Subsidies",
            Self::FoodDrive => "Food Drive",
            Self::Festival => "Festival",
            Self::Amnesty => "Amnesty",
        }
    }
}

/// Every non-deployment action the Authority can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionId {
    SecurityMode(SecurityMode),
    ConnectionSecurity,
    RequestTeam(TeamArc),
    RequestResources,
    Policy(PolicyKind),
    Handout(HandoutKind),
    SecurityProtocol,
    Countermeasure(CountermeasureKind),
    StressLeave,
    LobbyHq,
}

impl DecisionId {
    pub fn name(self) -> &'static str {
        match self {
            Self::SecurityMode(SecurityMode::Apb) => "APB",
            Self::SecurityMode(SecurityMode::SecurityAlert) => "Security Alert",
            Self::ConnectionSecurity => "Connection Security",
            Self::RequestTeam(_) => "Request Team",
            Self::RequestResources => "Request Resources",
            Self::Policy(policy) => policy.name(),
            Self::Handout(handout) => handout.name(),
            Self::SecurityProtocol => "Security Protocol",
            Self::Countermeasure(kind) => kind.decision_name(),
            Self::StressLeave => "Stress Leave",
            Self::LobbyHq => "Lobby HQ",
        }
    }
}

/// What a task does when executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Deploy an idle team of this arc onto the task's node
    Deploy(TeamArc),
    Decision(DecisionId),
}

/// A unit of work the planner may commit to
///
/// Several clones of one task can sit in a pool at once to raise its draw
/// probability; clones share `sequence_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTask {
    pub sequence_id: u32,
    pub kind: TaskKind,
    pub node: Option<NodeId>,
    pub connection: Option<ConnectionId>,
    /// What is being done
    pub name0: String,
    /// Where, or to what
    pub name1: String,
    pub priority: Priority,
    /// Execution chance, 0..=100
    pub chance: u8,
}

impl CandidateTask {
    pub fn deploy(sequence_id: u32, arc: TeamArc, node: NodeId, node_name: &str, priority: Priority) -> Self {
        Self {
            sequence_id,
            kind: TaskKind::Deploy(arc),
            node: Some(node),
            connection: None,
            name0: format!("{:?} team", arc),
            name1: node_name.to_string(),
            priority,
            chance: 0,
        }
    }

    pub fn decision(sequence_id: u32, decision: DecisionId, priority: Priority) -> Self {
        Self {
            sequence_id,
            kind: TaskKind::Decision(decision),
            node: None,
            connection: None,
            name0: decision.name().to_string(),
            name1: String::new(),
            priority,
            chance: 0,
        }
    }

    pub fn with_connection(mut self, connection: ConnectionId, description: impl Into<String>) -> Self {
        self.connection = Some(connection);
        self.name1 = description.into();
        self
    }

    pub fn is_critical(&self) -> bool {
        self.priority == Priority::Critical
    }

    pub fn is_guaranteed(&self) -> bool {
        self.chance >= 100
    }

    pub fn decision_id(&self) -> Option<DecisionId> {
        match self.kind {
            TaskKind::Decision(id) => Some(id),
            TaskKind::Deploy(_) => None,
        }
    }
}

impl fmt::Display for CandidateTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name1.is_empty() {
            write!(f, "{} ({:?}, {}%)", self.name0, self.priority, self.chance)
        } else {
            write!(
                f,
                "{} -> {} ({:?}, {}%)",
                self.name0, self.name1, self.priority, self.chance
            )
        }
    }
}

/// Hands out sequence ids for one turn
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter(u32);

impl SequenceCounter {
    pub fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Push `copies` clones of `task` onto `pool`
pub fn push_weighted(pool: &mut Vec<CandidateTask>, task: CandidateTask, copies: usize) {
    for _ in 1..copies {
        pool.push(task.clone());
    }
    if copies > 0 {
        pool.push(task);
    }
}

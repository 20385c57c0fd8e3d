//! Authority AI: tracking, scoring, candidate pools, decisions, selection
//! and execution, chained together by [`AuthorityPlanner`].

pub mod context;
pub mod decisions;
pub mod executor;
pub mod personality;
pub mod planner;
pub mod pools;
pub mod scoring;
pub mod selector;
pub mod task;
pub mod tracker;

pub use context::{DatapointCategory, DatapointRecord, TurnContext};
pub use decisions::{DecisionCatalog, DecisionMetrics};
pub use executor::{ActionExecutor, TurnReport};
pub use personality::{load_personality, AuthorityPersonality};
pub use planner::AuthorityPlanner;
pub use scoring::{NodeScorer, ScoreProfile};
pub use selector::TurnSelector;
pub use task::{CandidateTask, DecisionId, TaskKind};

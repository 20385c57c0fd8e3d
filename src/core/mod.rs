pub mod config;
pub mod error;
pub mod types;

pub use config::{load_config, PlannerConfig};
pub use error::{PlannerError, Result};

//! Planner save data
//!
//! Everything the planner needs to resume mid-game: the security state, the
//! decision metrics, and the last turn's potential and final task lists.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ai::decisions::DecisionMetrics;
use crate::ai::task::CandidateTask;
use crate::core::error::Result;
use crate::security::SecurityState;

/// Bumped whenever the save layout changes
pub const SAVE_VERSION: u32 = 1;

/// Serializable planner state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSave {
    pub version: u32,
    pub security: SecurityState,
    pub metrics: DecisionMetrics,
    #[serde(default)]
    pub potential: Vec<CandidateTask>,
    #[serde(default)]
    pub final_tasks: Vec<CandidateTask>,
}

impl PlannerSave {
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write to a JSON file on disk
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read from a JSON file on disk
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

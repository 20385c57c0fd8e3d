//! Authority personality loaded from TOML
//!
//! A personality names the district type the Authority favours and the
//! traits that bend its countermeasure behaviour.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::types::NodeArc;

/// Trait modifiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitConfig {
    /// Countermeasure priority raised one tier
    pub countermeasure_boost: bool,
    /// Countermeasures run twice as long
    pub double_countermeasure_duration: bool,
    /// Added to every detection roll against the Resistance
    pub detection_bonus: i32,
}

/// Complete Authority personality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityPersonality {
    /// Name of this personality (set from filename)
    #[serde(default)]
    pub name: String,
    /// District type the Authority prefers to protect
    #[serde(default = "default_arc")]
    pub preferred_arc: NodeArc,
    #[serde(default)]
    pub traits: TraitConfig,
}

fn default_arc() -> NodeArc {
    NodeArc::Government
}

impl Default for AuthorityPersonality {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            preferred_arc: default_arc(),
            traits: TraitConfig::default(),
        }
    }
}

/// Load personality from TOML file
///
/// Loads from `data/ai_personalities/{name}.toml`
pub fn load_personality(name: &str) -> Result<AuthorityPersonality> {
    load_personality_from(&personality_path(name), name)
}

/// Load personality from an explicit path
pub fn load_personality_from(path: &Path, name: &str) -> Result<AuthorityPersonality> {
    let contents = fs::read_to_string(path)?;
    let mut personality: AuthorityPersonality = toml::from_str(&contents)?;
    personality.name = name.to_string();
    Ok(personality)
}

fn personality_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data/ai_personalities")
        .join(format!("{}.toml", name))
}

use crate::complexity::ComplexityLimits;
use crate::sections::DEFAULT_MIN_LEVEL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_min_section_level() -> u8 {
    DEFAULT_MIN_LEVEL
}

fn default_excerpt_width() -> usize {
    60
}

fn default_entry_excerpt_width() -> usize {
    50
}

fn default_subsection_pattern() -> String {
    "^### ".to_string()
}

/// Engine tuning. Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Headings at this level or deeper start sections
    #[serde(default = "default_min_section_level")]
    pub min_section_level: u8,
    /// Characters of the offending line quoted in `forbidden` errors
    #[serde(default = "default_excerpt_width")]
    pub excerpt_width: usize,
    /// Characters of the offending entry quoted in `entry_pattern` errors
    #[serde(default = "default_entry_excerpt_width")]
    pub entry_excerpt_width: usize,
    /// Subsection pattern used when a rule does not name one
    #[serde(default = "default_subsection_pattern")]
    pub default_subsection_pattern: String,
    #[serde(default)]
    pub complexity: ComplexityLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_section_level: default_min_section_level(),
            excerpt_width: default_excerpt_width(),
            entry_excerpt_width: default_entry_excerpt_width(),
            default_subsection_pattern: default_subsection_pattern(),
            complexity: ComplexityLimits::default(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: EngineConfig =
            serde_yaml::from_str(&content).with_context(|| format!("parsing config {path}"))?;
        Ok(config)
    }

    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|err| {
                tracing::warn!(path = p, error = %err, "failed to load config, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

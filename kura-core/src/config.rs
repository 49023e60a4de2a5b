use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::aggregate::AggregationMode;
use crate::tree::OrphanPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KuraConfig {
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckpointConfig {
    pub dir: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            dir: "./checkpoints".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TreeConfig {
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

/// Glyphs used when drawing the hierarchy as text.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TreeStyle {
    #[default]
    Unicode,
    Ascii,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default)]
    pub aggregation_mode: AggregationMode,
    #[serde(default)]
    pub tree_style: TreeStyle,
    #[serde(default = "default_preview_chars")]
    pub summary_preview_chars: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_preview_chars() -> usize {
    200
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            aggregation_mode: AggregationMode::default(),
            tree_style: TreeStyle::default(),
            summary_preview_chars: default_preview_chars(),
            log_level: default_log_level(),
        }
    }
}

impl KuraConfig {
    /// Load from a TOML file (optional) with `KURA_SECTION__KEY` env overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("KURA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        s.try_deserialize()
    }
}

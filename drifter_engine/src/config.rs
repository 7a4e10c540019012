//! Engine configuration.
//!
//! Loaded from an optional TOML file; every field has a sensible default so an empty file
//! (or no file at all) gives a playable engine.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub trace: TraceConfig,
    /// Fixed seed for event and walk randomness; `None` draws from OS entropy.
    pub random_seed: Option<u64>,
    pub display: DisplayConfig,
}

impl EngineConfig {
    /// Read configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or isn't valid configuration TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error on malformed TOML or unknown value types.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Per-module trace switches. Enabled modules log their step-by-step decisions at `trace` level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub tasks: bool,
    pub events: bool,
    pub npcs: bool,
    pub restrictions: bool,
    pub objects: bool,
    pub variables: bool,
    pub serializer: bool,
}

/// Player display preferences. These belong to the player, not the story, so saving and
/// restoring a game never changes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub bold_room_names: bool,
    pub verbose: bool,
    pub notify_score_change: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bold_room_names: true,
            verbose: false,
            notify_score_change: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.display.notify_score_change);
    }

    #[test]
    fn partial_config_overrides_fields() {
        let config = EngineConfig::from_toml(
            r"
random_seed = 7

[trace]
events = true

[display]
verbose = true
",
        )
        .unwrap();
        assert_eq!(config.random_seed, Some(7));
        assert!(config.trace.events);
        assert!(!config.trace.tasks);
        assert!(config.display.verbose);
        assert!(config.display.bold_room_names);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "random_seed = 99").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.random_seed, Some(99));
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(EngineConfig::from_toml("random_seed = \"soon\"").is_err());
    }
}

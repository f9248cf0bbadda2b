use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::{trace, warn};

use crate::command::{CommandMode, CommandSettings};
use crate::error::ConfigError;
use crate::fetcher::clean_metric;
use crate::threshold::Direction;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default)]
    pub graphite_base: String,

    /// Default seconds between checks (0 means "use the built-in default")
    #[serde(default)]
    pub check_interval: u64,

    /// Seconds before a graphite request is abandoned
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    #[serde(default)]
    pub command: CommandConfig,

    #[serde(default)]
    pub actions: BTreeMap<String, ActionConfig>,
}

/// How triggered commands are run
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandConfig {
    #[serde(default)]
    pub mode: CommandMode,

    /// Seconds a command may run before it is killed
    #[serde(default = "default_command_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            mode: CommandMode::default(),
            timeout: default_command_timeout(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionConfig {
    pub metric: String,
    pub threshold: f64,
    #[serde(default)]
    pub direction: String,
    pub command: String,
    #[serde(default)]
    pub check_interval: u64,
}

/// An action with every default applied, ready to be run
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedActionConfig {
    pub name: String,
    /// Metric with whitespace removed
    pub metric: String,
    pub threshold: f64,
    pub direction: Direction,
    pub command: String,
    /// Seconds between checks, always > 0
    pub interval: u64,
}

pub const DEFAULT_CHECK_INTERVAL: u64 = 60;

fn default_fetch_timeout() -> u64 {
    30
}

fn default_command_timeout() -> u64 {
    30
}

fn default_max_output_bytes() -> usize {
    64 * 1024
}

impl Config {
    /// Check everything that deserialization alone cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.graphite_base.trim().is_empty() {
            return Err(ConfigError::MissingGraphiteBase);
        }
        if self.fetch_timeout == 0 {
            return Err(ConfigError::ZeroDuration("FetchTimeout"));
        }
        if self.command.timeout == 0 {
            return Err(ConfigError::ZeroDuration("Command.Timeout"));
        }
        if self.actions.is_empty() {
            return Err(ConfigError::NoActions);
        }

        for (name, action) in &self.actions {
            let invalid = |reason: &str| ConfigError::InvalidAction {
                action: name.clone(),
                reason: reason.to_string(),
            };

            if clean_metric(&action.metric).is_empty() {
                return Err(invalid("Metric must not be empty"));
            }
            if action.command.trim().is_empty() {
                return Err(invalid("Command must not be empty"));
            }
            if !action.threshold.is_finite() {
                return Err(invalid("Threshold must be a finite number"));
            }
        }

        Ok(())
    }

    fn default_interval(&self) -> u64 {
        if self.check_interval == 0 {
            DEFAULT_CHECK_INTERVAL
        } else {
            self.check_interval
        }
    }

    /// Apply defaults and per-action overrides
    pub fn resolve_actions(&self) -> Vec<ResolvedActionConfig> {
        let default_interval = self.default_interval();

        self.actions
            .iter()
            .map(|(name, action)| {
                if !action.direction.is_empty() && !Direction::is_known(&action.direction) {
                    warn!(
                        action = %name,
                        direction = %action.direction,
                        "unknown direction, treating as \"below\""
                    );
                }

                let interval = if action.check_interval != 0 {
                    action.check_interval
                } else {
                    default_interval
                };

                ResolvedActionConfig {
                    name: name.clone(),
                    metric: clean_metric(&action.metric),
                    threshold: action.threshold,
                    direction: Direction::from_config(&action.direction),
                    command: action.command.clone(),
                    interval,
                }
            })
            .collect()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn command_settings(&self) -> CommandSettings {
        CommandSettings {
            mode: self.command.mode,
            timeout: Duration::from_secs(self.command.timeout),
            max_output_bytes: self.command.max_output_bytes,
        }
    }
}

/// Parse a configuration document; `.json` files are read as JSON, anything
/// else as TOML.
pub fn parse_config(content: &str, path: &Path) -> anyhow::Result<Config> {
    let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(content).context("invalid JSON configuration")?,
        _ => toml::from_str(content).context("invalid TOML configuration")?,
    };

    config.validate()?;
    Ok(config)
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    parse_config(&file_content, path).inspect(|config| trace!("loaded config: {config:?}"))
}

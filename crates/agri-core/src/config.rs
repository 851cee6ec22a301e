use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AgriError, Result};

/// Top-level configuration for the control service.
///
/// Loaded from `config/agri.toml` by default. Every field has a default so an
/// empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgriConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub execution_log: ExecutionLogConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl AgriConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AgriConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AgriError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the engine cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.workers.count == 0 {
            return Err(AgriError::Config("workers.count must be at least 1".into()));
        }
        if self.workers.queue_multiplier == 0 {
            return Err(AgriError::Config(
                "workers.queue_multiplier must be at least 1".into(),
            ));
        }
        for limit in &self.policy.limits {
            if let (Some(min), Some(max)) = (limit.min, limit.max) {
                if min > max {
                    return Err(AgriError::Config(format!(
                        "policy limit {}.{}: min {} exceeds max {}",
                        limit.task_type, limit.param, min, max
                    )));
                }
            }
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for the execution log and other runtime files.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8280,
        }
    }
}

/// Worker pool sizing. Read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers draining the intake queue.
    pub count: usize,
    /// Intake capacity as a multiple of `count`.
    pub queue_multiplier: usize,
}

impl WorkerConfig {
    pub fn queue_capacity(&self) -> usize {
        self.count.max(1) * self.queue_multiplier.max(1)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 4,
            queue_multiplier: 4,
        }
    }
}

/// Action template registry source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// YAML or JSON scenario file. Missing or invalid files fall back to
    /// the built-in table.
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: "config/scenarios.yaml".to_string(),
        }
    }
}

/// Execution log (JSON Lines audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLogConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for ExecutionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "data/execution.log".to_string(),
        }
    }
}

/// Site policy applied to task parameters before planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub limits: Vec<ParamLimit>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            limits: vec![ParamLimit {
                task_type: "irrigation".to_string(),
                param: "duration_min".to_string(),
                min: None,
                max: Some(60.0),
                on_violation: OnViolation::Clamp,
            }],
        }
    }
}

/// Numeric bound on one task parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamLimit {
    /// Task type the limit applies to; `*` matches every type.
    pub task_type: String,
    pub param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub on_violation: OnViolation,
}

impl ParamLimit {
    pub fn applies_to(&self, task_type: &str) -> bool {
        self.task_type == "*" || self.task_type == task_type
    }
}

/// What to do with an out-of-range parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnViolation {
    #[default]
    Clamp,
    Reject,
}

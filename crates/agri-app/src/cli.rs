//! CLI argument definitions for the `agri-control` binary.
//!
//! Priority resolution: CLI args > `AGRI_*` env vars > config file > defaults.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Agri Control: schedules field-device tasks and runs their action chains.
#[derive(Parser, Debug)]
#[command(name = "agri-control", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the control engine and its HTTP API (default).
    Serve(ServeArgs),
    /// Re-execute commands recorded in the execution log.
    Replay(ReplayArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve(ServeArgs::default())
    }
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Number of workers draining the task queue.
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,

    /// Scenario file with the action templates (.yaml, .yml or .json).
    #[arg(short = 'r', long = "registry")]
    pub registry: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ReplayArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Execution log to read. Defaults to the configured log path.
    #[arg(long = "log")]
    pub log: Option<PathBuf>,

    /// Only replay commands of this task.
    #[arg(long = "task")]
    pub task: Option<String>,

    /// Only replay commands of this trace.
    #[arg(long = "trace")]
    pub trace: Option<String>,

    /// Maximum number of commands to replay (0 = all).
    #[arg(long = "limit", default_value_t = 0)]
    pub limit: usize,
}

impl ServeArgs {
    /// Priority: --config flag > AGRI_CONFIG env var > ./config/agri.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        config_path(self.config.as_ref())
    }

    /// Priority: --port flag > AGRI_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        pick(self.port, env("AGRI_PORT"), config_port)
    }

    /// Priority: --workers flag > AGRI_WORKERS env var > config file value.
    pub fn resolve_workers(&self, config_workers: usize) -> usize {
        pick(self.workers, env("AGRI_WORKERS"), config_workers)
    }

    /// Priority: --registry flag > AGRI_REGISTRY env var > config file value.
    pub fn resolve_registry(&self, config_path: &str) -> PathBuf {
        pick(self.registry.clone(), env("AGRI_REGISTRY"), PathBuf::from(config_path))
    }

    /// Priority: --log-level flag > AGRI_LOG_LEVEL env var > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        pick(self.log_level.clone(), env("AGRI_LOG_LEVEL"), config_level.to_string())
    }
}

impl ReplayArgs {
    /// Priority: --config flag > AGRI_CONFIG env var > ./config/agri.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        config_path(self.config.as_ref())
    }

    /// Priority: --log flag > config file value.
    pub fn resolve_log_path(&self, config_path: &str) -> PathBuf {
        self.log
            .clone()
            .unwrap_or_else(|| PathBuf::from(config_path))
    }
}

fn config_path(flag: Option<&PathBuf>) -> PathBuf {
    pick(flag.cloned(), env("AGRI_CONFIG"), default_config_path())
}

/// Default config file path, relative to the working directory.
fn default_config_path() -> PathBuf {
    PathBuf::from("config").join("agri.toml")
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// First of: the flag, a parseable env value, the fallback.
fn pick<T: FromStr>(flag: Option<T>, env_value: Option<String>, fallback: T) -> T {
    flag.or_else(|| env_value.and_then(|v| v.trim().parse().ok()))
        .unwrap_or(fallback)
}

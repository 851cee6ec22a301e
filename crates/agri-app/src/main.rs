//! Agri Control binary - composition root.
//!
//! `serve`:
//! 1. Load configuration from TOML
//! 2. Load the action registry, falling back to the built-in table
//! 3. Open the execution log
//! 4. Start the control service (intake + worker pool)
//! 5. Serve the HTTP API until Ctrl-C, then drain the queue
//!
//! `replay` re-executes commands from the execution log.

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use agri_api::AppState;
use agri_control::replay::replay;
use agri_control::{
    ActionTemplateRegistry, ControlServiceBuilder, ReplayFilter, TracingDispatcher,
};
use agri_core::config::AgriConfig;
use agri_core::error::AgriError;
use agri_storage::JsonlExecutionLog;

use cli::{CliArgs, Command, ReplayArgs, ServeArgs};

/// Load the config file, keeping the failure to report once logging is up.
fn load_config(path: &Path) -> (AgriConfig, Option<AgriError>) {
    if !path.exists() {
        return (AgriConfig::default(), None);
    }
    match AgriConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (AgriConfig::default(), Some(e)),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = load_config(&config_file);

    init_tracing(&args.resolve_log_level(&config.general.log_level));
    tracing::info!("Starting Agri Control v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::info!(path = %config_file.display(), "Configuration resolved"),
    }

    config.workers.count = args.resolve_workers(config.workers.count);
    config.validate()?;
    let port = args.resolve_port(config.server.port);

    if let Err(e) = std::fs::create_dir_all(&config.general.data_dir) {
        tracing::error!(path = %config.general.data_dir, error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    // Registry.
    let registry_path = args.resolve_registry(&config.registry.path);
    let registry = Arc::new(ActionTemplateRegistry::with_defaults());
    if let Err(e) = registry.load_from_file(&registry_path) {
        tracing::warn!(
            path = %registry_path.display(),
            error = %e,
            "Registry file not loaded, using built-in templates"
        );
    }

    // Service.
    let mut builder = ControlServiceBuilder::from_config(&config)
        .registry(Arc::clone(&registry))
        .dispatcher(Arc::new(TracingDispatcher));

    if config.execution_log.enabled {
        match JsonlExecutionLog::open(&config.execution_log.path) {
            Ok(log) => builder = builder.execution_log(Arc::new(log)),
            Err(e) => tracing::warn!(error = %e, "Execution log disabled"),
        }
    }

    let service = Arc::new(builder.start());

    // === API server ===
    let state = AppState::new(Arc::clone(&service), port).with_registry_path(registry_path);
    let served = agri_api::start_server(&config.server.host, port, state, shutdown_signal()).await;

    service.shutdown().await;
    if let Err(e) = served {
        tracing::error!(
            host = %config.server.host,
            port,
            error = %e,
            "API server failed"
        );
        return Err(e.into());
    }

    tracing::info!("Agri Control stopped");
    Ok(())
}

async fn run_replay(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, load_error) = load_config(&args.resolve_config_path());
    init_tracing(&config.general.log_level);
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
    }

    let log_path = args.resolve_log_path(&config.execution_log.path);
    let entries = agri_storage::read_all(&log_path)?;

    let filter = ReplayFilter {
        task_id: args.task,
        trace_id: args.trace,
        limit: args.limit,
    };
    let report = replay(&entries, &filter, &TracingDispatcher).await;

    println!(
        "Replayed {} command(s) from {} ({} failed)",
        report.replayed,
        log_path.display(),
        report.failed
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    match args.command.unwrap_or_default() {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Replay(replay_args) => run_replay(replay_args).await,
    }
}

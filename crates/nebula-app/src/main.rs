//! The binary entry point for the Nebula explorer.

use std::process::ExitCode;

use clap::Parser;
use nebula_app::catalog::load_graph;
use nebula_app::platform::PlatformDirs;
use nebula_app::window;
use nebula_config::{CliArgs, Config};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve(args.config.as_deref()) {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to resolve platform directories: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = dirs.create_dirs() {
        eprintln!("Failed to create platform directories: {e}");
        return ExitCode::FAILURE;
    }

    let (mut config, config_error) = match Config::load_or_create(&dirs.config_dir) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_cli_overrides(&args);

    nebula_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    if let Some(e) = config_error {
        tracing::error!("Failed to load config, using defaults: {e}");
    }
    tracing::info!(
        config = %dirs.config_dir.display(),
        logs = %dirs.log_dir.display(),
        "Nebula explorer starting"
    );

    let graph = match load_graph(&config.graph) {
        Ok(graph) => graph,
        Err(e) => {
            tracing::error!("Failed to load graph: {e}");
            return ExitCode::FAILURE;
        }
    };

    match window::run(config, graph) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Event loop error: {e}");
            ExitCode::FAILURE
        }
    }
}

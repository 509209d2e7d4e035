//! # Modular Host
//!
//! Entry point: load configuration, register the bundled modules, run the
//! start-up phases and serve until Ctrl+C.
//!
//! ```text
//! host-runtime [-c <config.toml>]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use host_runtime::{Host, HostConfig, UsersModule};
use host_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

/// Modular Host: pluggable-module application server
#[derive(Parser, Debug)]
#[command(name = "host-runtime", version)]
#[command(about = "Run the modular host and its registered modules")]
struct Args {
    /// TOML configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

async fn run(args: Args) -> Result<()> {
    let config = HostConfig::load(args.config.as_deref()).context("loading configuration")?;

    init_telemetry(
        &TelemetryConfig::from_env().with_service_name(config.server.app_name.clone()),
    )
    .context("initializing telemetry")?;
    info!(
        "Starting {} v{}",
        config.server.app_name,
        env!("CARGO_PKG_VERSION")
    );

    let mut host = Host::new(config);
    host.register(Box::new(UsersModule::new()))?;
    host.initialize().await.context("initializing host")?;
    host.serve(shutdown_signal()).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{:#}", e);
        eprintln!("host-runtime: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_config_flag() {
        let short = Args::try_parse_from(["host-runtime", "-c", "host.toml"]).unwrap();
        let long = Args::try_parse_from(["host-runtime", "--config", "host.toml"]).unwrap();
        let none = Args::try_parse_from(["host-runtime"]).unwrap();

        assert_eq!(short.config, Some(PathBuf::from("host.toml")));
        assert_eq!(long.config, Some(PathBuf::from("host.toml")));
        assert!(none.config.is_none());
    }

    #[test]
    fn test_help_and_bad_arguments() {
        let help = Args::try_parse_from(["host-runtime", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);

        assert!(Args::try_parse_from(["host-runtime", "-c"]).is_err());
        assert!(Args::try_parse_from(["host-runtime", "--bogus"]).is_err());
    }
}

//! GateCheck daemon: hosts the verification engine behind the HTTP API.

mod config;
mod error;
mod logging;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use gatecheck_engine::VerificationEngine;
use gatecheck_rpc::{EngineMetrics, RpcServer};
use gatecheck_store_lmdb::LmdbEnvironment;

use config::ServiceConfig;
use error::DaemonError;
use logging::{init_logging, LogFormat};

const MAX_DBS: u32 = 16;

#[derive(Parser)]
#[command(
    name = "gatecheck-daemon",
    about = "GateCheck attendance verification daemon"
)]
struct Cli {
    /// Data directory for the LMDB environment.
    #[arg(long, env = "GATECHECK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Port for the HTTP API.
    #[arg(long, env = "GATECHECK_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Log format: "human" or "json".
    #[arg(long, env = "GATECHECK_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "GATECHECK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the verification service.
    Run,
    /// Print the effective configuration as TOML and exit.
    PrintConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A config file that fails to load is a hard error. Running a
    // verification service with thresholds other than the operator
    // intended is worse than not running at all.
    let base = match &cli.config {
        Some(path) => ServiceConfig::from_toml_file(&path.to_string_lossy())?,
        None => ServiceConfig::default(),
    };
    let config = ServiceConfig {
        data_dir: cli.data_dir.unwrap_or(base.data_dir),
        rpc_port: cli.rpc_port.unwrap_or(base.rpc_port),
        log_format: cli.log_format.unwrap_or(base.log_format),
        log_level: cli.log_level.unwrap_or(base.log_level),
        ..base
    };

    match cli.command {
        Command::PrintConfig => {
            print!("{}", config.to_toml_string());
            Ok(())
        }
        Command::Run => {
            run(config).await?;
            Ok(())
        }
    }
}

async fn run(config: ServiceConfig) -> Result<(), DaemonError> {
    init_logging(LogFormat::from_config(&config.log_format), &config.log_level);

    tracing::info!(
        "starting GateCheck daemon (RPC:{}, data:{})",
        config.rpc_port,
        config.data_dir.display()
    );

    std::fs::create_dir_all(&config.data_dir)?;
    let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.map_size())?;

    let engine = VerificationEngine::new(
        Arc::new(env.attempt_store()),
        Arc::new(env.directory_store()),
        config.engine,
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], config.rpc_port));
    let server = RpcServer::new(addr, engine, EngineMetrics::new());

    server.start_with_shutdown(shutdown_signal()).await?;

    tracing::info!("GateCheck daemon exited cleanly");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
        _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
    }
}

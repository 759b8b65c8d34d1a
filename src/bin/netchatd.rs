//! netchatd - Multi-client line chat server
//!
//! Clients connect with any line-oriented TCP tool (`nc`, `telnet`), pick a
//! unique name, and chat in a single shared room. The transcript of the
//! current run is replayed to everyone who joins.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (8989)
//! netchatd
//!
//! # Listen on another port
//! netchatd 2525
//!
//! # Load settings from a file, override the ceiling
//! netchatd --config netchat.toml --max-clients 20
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use netchatd::config::ServerConfig;
use netchatd::registry::spawn_registry;
use netchatd::server::ChatServer;

/// netchat server - line-oriented TCP chat
#[derive(Parser, Debug)]
#[command(name = "netchatd", version, about)]
struct Args {
    /// Port to listen on [default: 8989]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Chat transcript file (cleared at startup)
    #[arg(long, env = "NETCHAT_HISTORY", value_name = "FILE")]
    history: Option<PathBuf>,

    /// Welcome banner file
    #[arg(long, env = "NETCHAT_BANNER", value_name = "FILE")]
    banner: Option<PathBuf>,

    /// Maximum number of simultaneously joined clients
    #[arg(long)]
    max_clients: Option<usize>,
}

/// Layers file settings and command-line overrides over the defaults.
fn build_config(args: &Args) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(history) = &args.history {
        config.history_path = history.clone();
    }
    if let Some(banner) = &args.banner {
        config.banner_path = banner.clone();
    }
    if let Some(max_clients) = args.max_clients {
        config.max_clients = max_clients;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;
    run_server(config)
}

#[tokio::main]
async fn run_server(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("netchatd=info".parse()?)
                .add_directive("netchat_core=info".parse()?)
                .add_directive("netchat_protocol=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "netchat server starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry = spawn_registry(config.max_clients);
    info!(max_clients = config.max_clients, "Client registry started");

    let server = ChatServer::bind(&config, registry, cancel_token)
        .await
        .context("Failed to start chat server")?;

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("netchat server stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(argv)
    }

    #[test]
    fn test_no_arguments_uses_default_port() {
        let args = parse(&["netchatd"]).unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.port, 8989);
    }

    #[test]
    fn test_positional_port() {
        let args = parse(&["netchatd", "2525"]).unwrap();
        assert_eq!(build_config(&args).unwrap().port, 2525);
    }

    #[test]
    fn test_extra_arguments_are_a_usage_error() {
        let err = parse(&["netchatd", "2525", "extra"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_non_numeric_port_rejected() {
        assert!(parse(&["netchatd", "chat"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netchat.toml");
        std::fs::write(&path, "port = 7000\nmax_clients = 3\nhost = \"127.0.0.1\"\n").unwrap();
        let config_arg = path.to_string_lossy().into_owned();

        let args = parse(&["netchatd", "--config", &config_arg, "--max-clients", "5"]).unwrap();
        let config = build_config(&args).unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_clients, 5);
    }

    #[test]
    fn test_invalid_ceiling_rejected() {
        let args = parse(&["netchatd", "--max-clients", "0"]).unwrap();
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_missing_config_file_is_fatal() {
        let args = parse(&["netchatd", "--config", "/nonexistent/netchat.toml"]).unwrap();
        let err = build_config(&args).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/netchat.toml"));
    }
}

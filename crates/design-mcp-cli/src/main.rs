//! design-mcp: MCP server for a running design application
//!
//! Connects to the application's command endpoint, then exposes its shape,
//! frame, page and icon commands as MCP tools over stdio.

use anyhow::Result;
use clap::Parser;
use design_bridge::{BridgeConfig, CommandBridge, Endpoint};
use design_mcp_server::DesignMcpServer;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "design-mcp", version, about = "MCP server for a running design application")]
struct Cli {
    /// Application endpoint: tcp://host:port, host:port, or unix:///path/to.sock
    #[arg(long, env = "DESIGN_MCP_ENDPOINT", default_value = "tcp://127.0.0.1:4403")]
    endpoint: Endpoint,

    /// Deadline for each command, in milliseconds
    #[arg(long, env = "DESIGN_MCP_TIMEOUT_MS", default_value_t = 5_000)]
    timeout_ms: u64,

    /// Connection timeout, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    connect_timeout_ms: u64,

    /// Delay between connection attempts, in milliseconds
    #[arg(long, default_value_t = 2_000)]
    retry_interval_ms: u64,

    /// Exit instead of waiting when the application is not reachable at startup
    #[arg(long)]
    no_wait: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            command_timeout: Duration::from_millis(self.timeout_ms),
            ..Default::default()
        }
    }
}

/// Keep trying to reconnect whenever the application goes away
fn spawn_reconnect(bridge: CommandBridge, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            if bridge.is_connected() {
                continue;
            }
            match bridge.connect().await {
                Ok(()) => info!("Reconnected to design application"),
                Err(e) => debug!("Reconnect attempt failed: {}", e),
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries MCP
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = cli.bridge_config();
    let retry_interval = Duration::from_millis(cli.retry_interval_ms.max(100));
    info!(
        "Starting design-mcp (endpoint {}, command timeout {:?})",
        config.endpoint, config.command_timeout
    );

    let bridge = CommandBridge::new(config);

    loop {
        match bridge.connect().await {
            Ok(()) => break,
            Err(e) if cli.no_wait => return Err(e.into()),
            Err(e) => {
                warn!(
                    "Waiting for design application at {}... ({})",
                    cli.endpoint, e
                );
                sleep(retry_interval).await;
            }
        }
    }

    let reconnect = spawn_reconnect(bridge.clone(), retry_interval);

    let server = DesignMcpServer::new(bridge);
    let outcome = server.run_stdio().await;
    reconnect.abort();
    outcome?;

    info!("design-mcp shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["design-mcp"]);
        let config = cli.bridge_config();
        assert_eq!(config.endpoint, Endpoint::Tcp("127.0.0.1:4403".into()));
        assert_eq!(config.command_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "design-mcp",
            "--endpoint",
            "unix:///tmp/design.sock",
            "--timeout-ms",
            "250",
            "-vv",
        ]);
        assert_eq!(
            cli.endpoint,
            Endpoint::Unix(std::path::PathBuf::from("/tmp/design.sock"))
        );
        assert_eq!(cli.bridge_config().command_timeout, Duration::from_millis(250));
        assert_eq!(cli.verbose, 2);
    }
}

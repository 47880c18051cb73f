//! AGV vision gateway entry point.
//!
//! Waits for the fleet controller to connect on the configured port, then
//! keeps the connection served (scheduler + handshake echo) until Ctrl+C.
//! With `--demo-target` it also sends one command per period, alternating the
//! state between `1` and `0`, which is handy for checking a controller
//! end to end.
//!
//! # Usage
//!
//! ```text
//! agv-gateway [OPTIONS]
//!
//! Options:
//!   --config <PATH>          TOML config file [default: agv-gateway.toml]
//!   --bind <IP>              Interface to listen on (overrides the file)
//!   --port <PORT>            TCP port (overrides the file)
//!   --log-level <FILTER>     Log filter when RUST_LOG is unset
//!   --demo-target <ID>       Send alternating demo commands to this target
//!   --demo-period-ms <MS>    Demo send period [default: 1000]
//!   --print-config           Print the effective config and exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                | Option             |
//! |-------------------------|--------------------|
//! | `AGV_GATEWAY_CONFIG`    | `--config`         |
//! | `AGV_GATEWAY_BIND`      | `--bind`           |
//! | `AGV_GATEWAY_PORT`      | `--port`           |
//! | `AGV_GATEWAY_LOG`       | `--log-level`      |
//! | `AGV_DEMO_TARGET`       | `--demo-target`    |
//! | `AGV_DEMO_PERIOD_MS`    | `--demo-period-ms` |
//!
//! CLI args take precedence over environment variables, which take precedence
//! over the config file.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agv_core::TargetId;
use agv_gateway::{load_config, GatewayConfig, GatewayServer};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// AGV vision gateway.
///
/// Accepts one controller connection and speaks the 14-byte STX/ETX command
/// protocol to it.
#[derive(Debug, Parser)]
#[command(
    name = "agv-gateway",
    about = "Single-connection TCP gateway for the AGV vision protocol",
    version
)]
struct Cli {
    /// Path of the TOML config file.  A missing file means defaults.
    #[arg(long, default_value = "agv-gateway.toml", env = "AGV_GATEWAY_CONFIG")]
    config: PathBuf,

    /// IP address to listen on.
    #[arg(long, env = "AGV_GATEWAY_BIND")]
    bind: Option<IpAddr>,

    /// TCP port the controller connects to.
    #[arg(long, env = "AGV_GATEWAY_PORT")]
    port: Option<u16>,

    /// `tracing` filter used when `RUST_LOG` is unset (e.g. `debug`).
    #[arg(long, env = "AGV_GATEWAY_LOG")]
    log_level: Option<String>,

    /// Target id for the demonstration sender (0-999).
    #[arg(long, env = "AGV_DEMO_TARGET")]
    demo_target: Option<u32>,

    /// Milliseconds between demonstration sends.
    #[arg(long, default_value_t = 1000, env = "AGV_DEMO_PERIOD_MS")]
    demo_period_ms: u64,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

/// Demonstration sender settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Demo {
    target: TargetId,
    period: Duration,
}

impl Cli {
    /// Loads the config file and applies the CLI/env overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the merged
    /// result is invalid.
    fn load_gateway_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;
        self.apply_overrides(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut GatewayConfig) {
        if let Some(bind) = self.bind {
            config.network.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.log_level = level.clone();
        }
    }

    /// Returns the demo settings, if a demo target was given.
    ///
    /// # Errors
    ///
    /// Returns an error if the target id needs more than three digits or the
    /// period is zero.
    fn demo(&self) -> anyhow::Result<Option<Demo>> {
        let Some(target) = self.demo_target else {
            return Ok(None);
        };
        let target = TargetId::new(target).context("invalid --demo-target")?;
        anyhow::ensure!(self.demo_period_ms > 0, "--demo-period-ms must be greater than 0");
        Ok(Some(Demo {
            target,
            period: Duration::from_millis(self.demo_period_ms),
        }))
    }
}

/// State sent on the `n`th demo iteration (1-based): odd → `'1'`, even → `'0'`.
fn demo_state(n: u64) -> char {
    if n % 2 == 1 {
        '1'
    } else {
        '0'
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_gateway_config()?;
    let demo = cli.demo()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level)),
        )
        .init();

    info!(
        "AGV gateway starting: bind={}:{}, tick={}ms",
        config.network.bind_address, config.network.port, config.scheduler.tick_interval_ms
    );

    // Construction blocks until the controller connects; Ctrl+C aborts the wait.
    let server = tokio::select! {
        result = GatewayServer::construct_with(&config) => {
            result.context("failed to start gateway")?
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C before a controller connected");
            return Ok(());
        }
    };

    match demo {
        Some(demo) => run_demo(&server, demo).await,
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    }

    info!("initiating graceful shutdown");
    let report = server.shutdown().await;
    if let Some(exit) = &report.echo_exit {
        info!("echo responder ended: {exit}");
    }
    info!("AGV gateway stopped");
    Ok(())
}

/// Sends one demo command per period until Ctrl+C or a send error.
async fn run_demo(server: &GatewayServer, demo: Demo) {
    info!(
        target_id = %demo.target,
        period_ms = demo.period.as_millis() as u64,
        "demo sender started"
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(demo.period);
    let mut n: u64 = 1;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                let state = demo_state(n);
                if let Err(e) = server.send_command(u32::from(demo.target.get()), state).await {
                    error!("demo send failed, stopping: {e}");
                    break;
                }
                n += 1;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

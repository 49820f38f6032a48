//! Switchboard Signal Server
//!
//! WebSocket signaling relay for browser-to-browser WebRTC calls.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (0.0.0.0:5000, assets from ./public)
//! switchboard-signal
//!
//! # Explicit config file with a port override
//! switchboard-signal --config /etc/switchboard/config.toml --port 8080
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use switchboard_core::Config;
use switchboard_signal::SignalServer;

#[derive(Parser, Debug)]
#[command(name = "switchboard-signal")]
#[command(about = "WebRTC signaling relay")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SWITCHBOARD_PORT")]
    port: Option<u16>,

    /// Bind address
    #[arg(short, long, env = "SWITCHBOARD_BIND")]
    bind: Option<IpAddr>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, env = "SWITCHBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of static assets
    #[arg(long, env = "SWITCHBOARD_PUBLIC_DIR")]
    public_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::load(),
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(dir) = &self.public_dir {
            config.http.public_dir = dir.clone();
        }

        Ok(config)
    }

    /// Handle the print/write flags; returns true if the process should exit
    fn export_config(&self, config: &Config) -> anyhow::Result<bool> {
        if let Some(path) = &self.write_config {
            config
                .save_to(path)
                .with_context(|| format!("writing config to {}", path.display()))?;
            return Ok(true);
        }

        if self.print_config {
            print!("{}", config.to_toml()?);
            return Ok(true);
        }

        Ok(false)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    if args.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    let config = args.config()?;

    if args.export_config(&config)? {
        return Ok(());
    }

    info!("Starting Switchboard Signal Server");
    if config.http.serve_static {
        info!("Serving assets from {:?}", config.http.public_dir);
    }

    SignalServer::bind(config)
        .await?
        .serve_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

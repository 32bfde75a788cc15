//! Edge gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                     EDGE GATEWAY                     │
//!                      │                                                      │
//!  Client Request      │  ┌──────────┐    ┌──────────┐    ┌──────────────┐    │
//!  ────────────────────┼─▶│   http   │───▶│ routing  │───▶│ hyper client │────┼──▶ Backend
//!                      │  │  server  │    │ (prefix) │    └──────────────┘    │
//!                      │  └──────────┘    └────┬─────┘                        │
//!                      │                       │ load (lock-free)             │
//!                      │                  ┌────▼─────┐    ┌──────────────┐    │
//!                      │                  │ snapshot │◀───│  sync client │◀───┼─── Management
//!                      │                  │  store   │    │ (state mach.)│    │    Plane
//!                      │                  └────┬─────┘    └──────────────┘    │
//!                      │                       │ temp file + rename           │
//!                      │                  ┌────▼─────┐                        │
//!                      │                  │  backup  │                        │
//!                      │                  └──────────┘                        │
//!                      │                                                      │
//!                      │  health probes · admin API · metrics · lifecycle     │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use edge_gateway::config::load_config;
use edge_gateway::lifecycle::startup;
use edge_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "edge-gateway", version, about = "Management-plane driven edge gateway")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("edge-gateway: {}", e);
            std::process::exit(2);
        }
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gateway starting");

    startup::run(config).await?;
    Ok(())
}

// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `event-replicator`: replicate new event documents from MongoDB into Redis.
//!
//! Usage: `event-replicator [config.yml]`

use event_replicator::{logging, ReplicationConfig, ReplicationEngine};
use std::process::ExitCode;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    match run(&config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Replicator exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &str) -> event_replicator::Result<()> {
    let config = ReplicationConfig::from_yaml_file(config_path)?;
    info!(path = %config_path, "Configuration loaded");

    let mut engine = ReplicationEngine::connect(config).await?;
    engine.start()?;

    let trigger = engine.shutdown_trigger();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => trigger.trigger(),
            Err(e) => error!(error = %e, "Cannot listen for shutdown signal"),
        }
    });

    engine.wait().await
}

//! `event-ingest`: read newline-delimited JSON events from stdin and insert
//! them into MongoDB.
//!
//! Usage: `event-ingest [config.yml] < events.ndjson`
//!
//! Only the `store` and `formats` sections of the config are used. The first
//! error (invalid JSON, insert failure) terminates the process.

use event_replicator::{logging, EventIngestor, MongoStore, ReplicationConfig, TimestampFormat};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yml".to_string());

    match run(&config_path).await {
        Ok(count) => {
            info!(count, "Input exhausted");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Ingestion stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &str) -> event_replicator::Result<usize> {
    let config = ReplicationConfig::from_yaml_file(config_path)?;
    let store = MongoStore::connect(&config.store).await?;
    let ingestor = EventIngestor::new(Arc::new(store), TimestampFormat::new(&config.formats.store)?);

    ingestor.ingest_lines(BufReader::new(tokio::io::stdin())).await
}

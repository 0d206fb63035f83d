//! Storage setup and initialization

use anyhow::Result;
use std::sync::Arc;
use tubely_core::Config;
use tubely_storage::{create_storage, Storage};

/// Create the object store videos are published to.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage abstraction...");
    let storage = create_storage(config).await?;
    tracing::info!(
        backend = %storage.backend_type(),
        bucket = %storage.bucket(),
        "Storage abstraction initialized successfully"
    );

    Ok(storage)
}

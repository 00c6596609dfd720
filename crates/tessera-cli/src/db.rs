//! `tess db` commands

use std::path::Path;

use anyhow::{Context, Result};
use tessera_mongodb::{Datastore, DatastoreConfig};
use tracing::info;

/// Connects with the datastore configuration at `path`, pings the server
/// and prints the collections of the configured database
pub async fn ping(path: &Path) -> Result<()> {
    let config = DatastoreConfig::from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let datastore = Datastore::connect(&config)
        .await
        .context("failed to connect")?;
    datastore.ping().await.context("server did not answer ping")?;

    let names = datastore.list_collection_names().await?;
    info!("Pinged {}", datastore.database().name());
    println!("{}: reachable, {} collections", datastore.database().name(), names.len());
    for name in names {
        println!("  {}", name);
    }
    Ok(())
}

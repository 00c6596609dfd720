//! Driver client construction with pool configuration

use std::time::Duration;

use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// Connection pool configuration.
///
/// Durations are whole seconds so the struct reads naturally from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Minimum number of connections kept open (default: 5)
    pub min_pool_size: Option<u32>,
    /// Maximum number of connections (default: 20)
    pub max_pool_size: Option<u32>,
    /// Idle time before a connection is closed (default: none)
    pub max_idle_time_secs: Option<u64>,
    /// Connection timeout (default: 10s)
    pub connect_timeout_secs: Option<u64>,
    /// Server selection timeout (default: 30s)
    pub server_selection_timeout_secs: Option<u64>,
    /// Application name for server logs
    pub app_name: Option<String>,
    /// Pin the stable API version 1
    pub stable_api: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: Some(5),
            max_pool_size: Some(20),
            max_idle_time_secs: None,
            connect_timeout_secs: Some(10),
            server_selection_timeout_secs: Some(30),
            app_name: Some("tessera".to_string()),
            stable_api: false,
        }
    }
}

impl PoolConfig {
    /// Copy the configured values onto parsed driver options
    pub fn apply(&self, options: &mut ClientOptions) {
        if let Some(min) = self.min_pool_size {
            options.min_pool_size = Some(min);
        }
        if let Some(max) = self.max_pool_size {
            options.max_pool_size = Some(max);
        }
        if let Some(idle) = self.max_idle_time_secs {
            options.max_idle_time = Some(Duration::from_secs(idle));
        }
        if let Some(connect) = self.connect_timeout_secs {
            options.connect_timeout = Some(Duration::from_secs(connect));
        }
        if let Some(selection) = self.server_selection_timeout_secs {
            options.server_selection_timeout = Some(Duration::from_secs(selection));
        }
        if let Some(app) = &self.app_name {
            options.app_name = Some(app.clone());
        }
        if self.stable_api {
            options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        }
    }
}

/// Parse `uri`, apply `pool` and build a client. Also returns the default
/// database named in the URI, if any.
pub async fn connect(uri: &str, pool: &PoolConfig) -> Result<(Client, Option<String>)> {
    let mut options = ClientOptions::parse(uri).await?;
    pool.apply(&mut options);
    let default_database = options.default_database.clone();
    debug!(
        hosts = options.hosts.len(),
        app_name = ?options.app_name,
        "Creating client"
    );
    let client = Client::with_options(options)?;
    Ok((client, default_database))
}

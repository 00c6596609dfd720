//! Datastore configuration loaded from TOML
//!
//! ```toml
//! uri = "mongodb://localhost:27017"
//! database = "inventory"
//!
//! [pool]
//! max_pool_size = 10
//!
//! [mapper]
//! collection_naming = "snake_case"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_common::TesseraError;

use crate::connection::PoolConfig;
use crate::mapping::MapperOptions;
use crate::Result;

/// Everything [`Datastore::connect`](crate::Datastore::connect) needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatastoreConfig {
    pub uri: String,
    /// Database to use; falls back to the one named in `uri`
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub mapper: MapperOptions,
}

impl DatastoreConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: None,
            pool: PoolConfig::default(),
            mapper: MapperOptions::default(),
        }
    }

    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.database = Some(name.into());
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.uri.trim().is_empty() {
            return Err(TesseraError::Config("uri must not be empty".to_string()));
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TesseraError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::NamingStrategy;
    use std::io::Write;

    #[test]
    fn test_minimal() {
        let config = DatastoreConfig::from_toml_str("uri = \"mongodb://localhost\"").unwrap();
        assert_eq!(config, DatastoreConfig::new("mongodb://localhost"));
    }

    #[test]
    fn test_full() {
        let config = DatastoreConfig::from_toml_str(
            r#"
            uri = "mongodb://db.internal:27017"
            database = "inventory"

            [pool]
            max_pool_size = 10
            connect_timeout_secs = 3

            [mapper]
            collection_naming = "snake_case"
            allow_javascript = true
            "#,
        )
        .unwrap();
        assert_eq!(config.database.as_deref(), Some("inventory"));
        assert_eq!(config.pool.max_pool_size, Some(10));
        assert_eq!(config.pool.connect_timeout_secs, Some(3));
        assert_eq!(config.pool.min_pool_size, Some(5));
        assert_eq!(config.mapper.collection_naming, NamingStrategy::SnakeCase);
        assert!(config.mapper.allow_javascript);
        assert!(config.mapper.validate_queries);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            DatastoreConfig::from_toml_str("database = \"x\""),
            Err(TesseraError::Config(_))
        ));
        assert!(matches!(
            DatastoreConfig::from_toml_str("uri = \"  \""),
            Err(TesseraError::Config(_))
        ));
        assert!(matches!(
            DatastoreConfig::from_file("/nonexistent/tessera.toml"),
            Err(TesseraError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "uri = \"mongodb://localhost/reports\"").unwrap();
        let config = DatastoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.uri, "mongodb://localhost/reports");
        assert!(config.database.is_none());
    }
}

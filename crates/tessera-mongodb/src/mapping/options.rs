//! Mapper configuration

use serde::{Deserialize, Serialize};

use super::NamingStrategy;

/// Key under which the discriminator value is stored
pub const DEFAULT_DISCRIMINATOR_KEY: &str = "_t";

/// Options controlling how entities are mapped and how queries are checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// Naming applied to the type name when a model declares no collection
    pub collection_naming: NamingStrategy,
    /// Reject filter and update paths that do not resolve against the model
    pub validate_queries: bool,
    /// Permit `$where`, `$function` and `$accumulator`
    pub allow_javascript: bool,
    /// Keep `null` values when encoding entities
    pub store_nulls: bool,
    /// Keep empty arrays and documents when encoding entities
    pub store_empties: bool,
    /// Field holding the discriminator for models that declare one
    pub discriminator_key: String,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            collection_naming: NamingStrategy::Identity,
            validate_queries: true,
            allow_javascript: false,
            store_nulls: false,
            store_empties: false,
            discriminator_key: DEFAULT_DISCRIMINATOR_KEY.to_string(),
        }
    }
}

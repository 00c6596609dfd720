//! Index declarations for entity models

use std::time::Duration;

use bson::{Bson, Document as BsonDocument};
use mongodb::{options::IndexOptions, IndexModel};

use super::EntityModel;
use crate::Result;

/// Index key type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Ascending,
    Descending,
    Text,
    Hashed,
    Geo2dSphere,
}

impl IndexDirection {
    /// The value stored in the index key document
    pub fn to_bson(&self) -> Bson {
        match self {
            IndexDirection::Ascending => Bson::Int32(1),
            IndexDirection::Descending => Bson::Int32(-1),
            IndexDirection::Text => Bson::String("text".to_string()),
            IndexDirection::Hashed => Bson::String("hashed".to_string()),
            IndexDirection::Geo2dSphere => Bson::String("2dsphere".to_string()),
        }
    }
}

/// An index declared on an entity model.
///
/// Field names are property names; they are translated to stored names when
/// the index is created.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexDef {
    fields: Vec<(String, IndexDirection)>,
    name: Option<String>,
    unique: bool,
    sparse: bool,
    expire_after: Option<Duration>,
    partial_filter: Option<BsonDocument>,
}

impl IndexDef {
    /// Start an index with its first key
    pub fn on(field: impl Into<String>, direction: IndexDirection) -> Self {
        Self {
            fields: vec![(field.into(), direction)],
            ..Default::default()
        }
    }

    /// Add another key to a compound index
    pub fn and(mut self, field: impl Into<String>, direction: IndexDirection) -> Self {
        self.fields.push((field.into(), direction));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// TTL index: documents expire this long after the indexed date
    pub fn expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }

    pub fn partial_filter(mut self, filter: BsonDocument) -> Self {
        self.partial_filter = Some(filter);
        self
    }

    pub fn fields(&self) -> &[(String, IndexDirection)] {
        &self.fields
    }

    /// Build the key document, translating property names through the model
    pub fn keys(&self, model: &EntityModel) -> Result<BsonDocument> {
        let mut keys = BsonDocument::new();
        for (field, direction) in &self.fields {
            keys.insert(model.translate_path(field, true)?, direction.to_bson());
        }
        Ok(keys)
    }

    /// Convert into the driver's index model
    pub fn to_index_model(&self, model: &EntityModel) -> Result<IndexModel> {
        let options = IndexOptions::builder()
            .name(self.name.clone())
            .unique(self.unique.then_some(true))
            .sparse(self.sparse.then_some(true))
            .expire_after(self.expire_after)
            .partial_filter_expression(self.partial_filter.clone())
            .build();

        Ok(IndexModel::builder()
            .keys(self.keys(model)?)
            .options(options)
            .build())
    }
}

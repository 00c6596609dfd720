//! Entity mapping
//!
//! Types are mapped by declaration rather than discovery: each [`Entity`]
//! describes itself with an [`EntityModel`], and the [`Mapper`] caches those
//! models and performs the entity ↔ document conversion.

mod entity;
mod index;
mod model;
mod naming;
mod options;

pub use entity::Entity;
pub use index::{IndexDef, IndexDirection};
pub use model::{EntityModel, EntityModelBuilder, PropertyModel, ID_FIELD};
pub use naming::NamingStrategy;
pub use options::{MapperOptions, DEFAULT_DISCRIMINATOR_KEY};

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use tracing::debug;

use crate::Result;

/// Registry of entity models plus the mapping options they are used with.
#[derive(Debug)]
pub struct Mapper {
    options: MapperOptions,
    models: RwLock<HashMap<TypeId, Arc<EntityModel>>>,
}

impl Mapper {
    pub fn new(options: MapperOptions) -> Self {
        Self {
            options,
            models: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Register `T`, replacing any model cached for it
    pub fn map<T: Entity>(&self) -> Arc<EntityModel> {
        let model = Arc::new(T::model());
        debug!(
            entity = model.type_name(),
            collection = %model.collection_name(&self.options),
            "Mapped entity"
        );
        self.models.write().insert(TypeId::of::<T>(), model.clone());
        model
    }

    pub fn is_mapped<T: Entity>(&self) -> bool {
        self.models.read().contains_key(&TypeId::of::<T>())
    }

    /// Model for `T`, mapping it on first use
    pub fn model<T: Entity>(&self) -> Arc<EntityModel> {
        if let Some(model) = self.models.read().get(&TypeId::of::<T>()) {
            return model.clone();
        }
        self.map::<T>()
    }

    /// All registered models
    pub fn models(&self) -> Vec<Arc<EntityModel>> {
        let mut models: Vec<_> = self.models.read().values().cloned().collect();
        models.sort_by(|a, b| a.type_name().cmp(b.type_name()));
        models
    }

    pub fn collection_name<T: Entity>(&self) -> String {
        self.model::<T>().collection_name(&self.options)
    }

    /// Encode an entity, applying null/empty pruning and the discriminator
    pub fn to_document<T: Entity>(&self, entity: &T) -> Result<BsonDocument> {
        let mut document = entity.to_bson()?;
        prune(&mut document, &self.options);

        if let Some(discriminator) = self.model::<T>().discriminator() {
            document.insert(
                self.options.discriminator_key.clone(),
                Bson::String(discriminator.to_string()),
            );
        }
        Ok(document)
    }

    /// Decode a stored document and run the `post_load` hook
    pub fn from_document<T: Entity>(&self, mut document: BsonDocument) -> Result<T> {
        if self.model::<T>().discriminator().is_some() {
            document.remove(&self.options.discriminator_key);
        }
        let mut entity = T::from_bson(document)?;
        entity.post_load();
        Ok(entity)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(MapperOptions::default())
    }
}

/// Remove nulls and empty containers according to the options
fn prune(document: &mut BsonDocument, options: &MapperOptions) {
    let keys: Vec<String> = document.keys().cloned().collect();
    for key in keys {
        let remove = match document.get_mut(&key) {
            Some(Bson::Document(inner)) => {
                prune(inner, options);
                !options.store_empties && inner.is_empty()
            }
            Some(Bson::Array(items)) => {
                for item in items.iter_mut() {
                    if let Bson::Document(inner) = item {
                        prune(inner, options);
                    }
                }
                !options.store_empties && items.is_empty()
            }
            Some(Bson::Null) => !options.store_nulls,
            _ => false,
        };
        if remove {
            document.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Player {
        name: String,
        nickname: Option<String>,
        #[serde(default)]
        scores: Vec<i32>,
        #[serde(skip)]
        loaded: bool,
    }

    impl Entity for Player {
        fn model() -> EntityModel {
            EntityModel::builder("Player")
                .property("name")
                .property("nickname")
                .property("scores")
                .discriminator("player")
                .build()
        }

        fn post_load(&mut self) {
            self.loaded = true;
        }
    }

    fn player() -> Player {
        Player {
            name: "Ann".to_string(),
            nickname: None,
            scores: vec![],
            loaded: false,
        }
    }

    #[test]
    fn test_model_cached() {
        let mapper = Mapper::default();
        assert!(!mapper.is_mapped::<Player>());
        let first = mapper.model::<Player>();
        assert!(mapper.is_mapped::<Player>());
        let second = mapper.model::<Player>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(mapper.models().len(), 1);
    }

    #[test]
    fn test_to_document_prunes_and_tags() {
        let mapper = Mapper::default();
        let document = mapper.to_document(&player()).unwrap();
        assert_eq!(document, doc! { "name": "Ann", "_t": "player" });
    }

    #[test]
    fn test_to_document_keeps_nulls_when_configured() {
        let mapper = Mapper::new(MapperOptions {
            store_nulls: true,
            store_empties: true,
            ..Default::default()
        });
        let document = mapper.to_document(&player()).unwrap();
        assert_eq!(
            document,
            doc! { "name": "Ann", "nickname": null, "scores": [], "_t": "player" }
        );
    }

    #[test]
    fn test_from_document_runs_post_load() {
        let mapper = Mapper::default();
        let player: Player = mapper
            .from_document(doc! { "name": "Ann", "scores": [3, 4], "_t": "player" })
            .unwrap();
        assert!(player.loaded);
        assert_eq!(player.scores, vec![3, 4]);
    }

    #[test]
    fn test_prune_nested() {
        let mut document = doc! {
            "a": { "b": null, "c": [] },
            "d": [{ "e": null, "f": 1 }],
        };
        prune(&mut document, &MapperOptions::default());
        assert_eq!(document, doc! { "d": [{ "f": 1 }] });
    }
}

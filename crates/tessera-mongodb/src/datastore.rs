//! The datastore: entry point for saving, loading and querying entities

use std::any::type_name;
use std::sync::Arc;

use bson::{doc, Bson, Document as BsonDocument};
use mongodb::{Client, Collection, Database};
use tessera_common::TesseraError;
use tracing::{debug, info, instrument, warn};

use crate::aggregation::Aggregation;
use crate::codecs::CodecRegistry;
use crate::config::DatastoreConfig;
use crate::connection;
use crate::mapping::{Entity, EntityModel, Mapper, MapperOptions, ID_FIELD};
use crate::query::Query;
use crate::validation::ValidatedCollectionName;
use crate::Result;

/// A database handle plus the mapper and codecs used with it.
///
/// Cloning is cheap; clones share the driver client and the model cache.
#[derive(Debug, Clone)]
pub struct Datastore {
    client: Client,
    database: Database,
    mapper: Arc<Mapper>,
    codecs: Arc<CodecRegistry>,
}

impl Datastore {
    /// Connect using a [`DatastoreConfig`]
    #[instrument(skip(config), fields(database = ?config.database))]
    pub async fn connect(config: &DatastoreConfig) -> Result<Self> {
        let (client, default_database) = connection::connect(&config.uri, &config.pool).await?;
        let database = config
            .database
            .clone()
            .or(default_database)
            .ok_or_else(|| {
                TesseraError::Config(
                    "no database configured and none named in the connection string".to_string(),
                )
            })?;
        info!(database = %database, "Datastore ready");
        Ok(Self::new(client, &database, config.mapper.clone()))
    }

    /// Wrap an existing client
    pub fn new(client: Client, database: &str, options: MapperOptions) -> Self {
        let database = client.database(database);
        Self {
            client,
            database,
            mapper: Arc::new(Mapper::new(options)),
            codecs: Arc::new(CodecRegistry::with_defaults()),
        }
    }

    /// Replace the codec registry
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Arc::new(codecs);
        self
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Typed driver collection for `T`
    pub fn collection<T: Entity>(&self) -> Collection<T> {
        self.database.collection(&self.mapper.collection_name::<T>())
    }

    fn documents<T: Entity>(&self) -> Collection<BsonDocument> {
        self.database.collection(&self.mapper.collection_name::<T>())
    }

    /// Collection for writes, which create it if missing
    fn writable<T: Entity>(&self) -> Result<Collection<BsonDocument>> {
        let name = ValidatedCollectionName::new(&self.mapper.collection_name::<T>())?;
        Ok(self.database.collection(name.as_str()))
    }

    pub async fn ping(&self) -> Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TesseraError::Connection(format!("Ping failed: {}", e)))?;
        Ok(())
    }

    pub async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(self.database.list_collection_names().await?)
    }

    #[instrument(skip(self), fields(database = %self.database.name()))]
    pub async fn drop_database(&self) -> Result<()> {
        self.database.drop().await?;
        warn!("Database dropped");
        Ok(())
    }

    /// Insert or replace `entity`.
    ///
    /// Entities without an id are inserted and receive the generated id.
    /// For versioned entities the stored version must equal the entity's;
    /// the saved version is one higher (1 on the first save).
    ///
    /// # Errors
    /// [`TesseraError::VersionConflict`] when the stored version moved on or
    /// the document was deleted. The entity's version is left unchanged.
    #[instrument(skip(self, entity), fields(entity = type_name::<T>()))]
    pub async fn save<T: Entity>(&self, entity: &mut T) -> Result<()> {
        entity.pre_persist();
        let model = self.mapper.model::<T>();
        let previous = entity.version();
        let versioned = model.version_field().is_some();
        if versioned {
            entity.set_version(Some(previous.unwrap_or(0) + 1));
        }

        let result = match (entity.id(), previous) {
            (None, _) => self.insert_document(entity).await,
            (Some(_), None) if versioned => self.insert_document(entity).await,
            (Some(id), previous) => self.replace_document(entity, &model, id, previous).await,
        };
        match result {
            Ok(document) => {
                entity.post_persist(&document);
                Ok(())
            }
            Err(err) => {
                if versioned {
                    entity.set_version(previous);
                }
                Err(err)
            }
        }
    }

    /// Save each entity in order, stopping at the first error
    pub async fn save_many<T: Entity>(&self, entities: &mut [T]) -> Result<()> {
        for entity in entities.iter_mut() {
            self.save(entity).await?;
        }
        debug!(count = entities.len(), "Saved entities");
        Ok(())
    }

    /// Insert `entity` as a new document
    #[instrument(skip(self, entity), fields(entity = type_name::<T>()))]
    pub async fn insert<T: Entity>(&self, entity: &mut T) -> Result<()> {
        entity.pre_persist();
        let assigned = self.mapper.model::<T>().version_field().is_some() && entity.version().is_none();
        if assigned {
            entity.set_version(Some(1));
        }
        let document = match self.insert_document(entity).await {
            Ok(document) => document,
            Err(err) => {
                if assigned {
                    entity.set_version(None);
                }
                return Err(err);
            }
        };
        entity.post_persist(&document);
        Ok(())
    }

    async fn insert_document<T: Entity>(&self, entity: &mut T) -> Result<BsonDocument> {
        let mut document = self.mapper.to_document(entity)?;
        let result = self.writable::<T>()?.insert_one(&document).await?;
        if entity.id().is_none() {
            entity.set_id(result.inserted_id.clone());
        }
        if !document.contains_key(ID_FIELD) {
            document.insert(ID_FIELD, result.inserted_id);
        }
        debug!(collection = %self.mapper.collection_name::<T>(), "Inserted document");
        Ok(document)
    }

    async fn replace_document<T: Entity>(
        &self,
        entity: &T,
        model: &EntityModel,
        id: Bson,
        previous: Option<i64>,
    ) -> Result<BsonDocument> {
        let document = self.mapper.to_document(entity)?;
        let mut filter = doc! { ID_FIELD: id.clone() };
        let expected = model.version_field().zip(previous);
        if let Some((field, version)) = expected {
            filter.insert(field, version);
        }

        let result = self
            .writable::<T>()?
            .replace_one(filter, &document)
            .upsert(expected.is_none())
            .await?;
        if let Some((_, version)) = expected {
            if result.matched_count == 0 {
                return Err(TesseraError::VersionConflict(format!(
                    "{}/{} is no longer at version {}",
                    model.collection_name(self.mapper.options()),
                    id,
                    version
                )));
            }
        }
        debug!(
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "Replaced document"
        );
        Ok(document)
    }

    /// Replace the stored document with the same id. Returns whether one
    /// was found.
    #[instrument(skip(self, entity), fields(entity = type_name::<T>()))]
    pub async fn replace<T: Entity>(&self, entity: &T) -> Result<bool> {
        let id = require_id(entity)?;
        let document = self.mapper.to_document(entity)?;
        let result = self
            .writable::<T>()?
            .replace_one(doc! { ID_FIELD: id }, &document)
            .await?;
        Ok(result.matched_count > 0)
    }

    /// `$set` every non-null field of `entity` on the stored document.
    /// Versioned entities also get their stored version incremented.
    #[instrument(skip(self, entity), fields(entity = type_name::<T>()))]
    pub async fn merge<T: Entity>(&self, entity: &T) -> Result<bool> {
        let id = require_id(entity)?;
        let model = self.mapper.model::<T>();
        let mut fields = self.mapper.to_document(entity)?;
        fields.remove(ID_FIELD);
        remove_nulls(&mut fields);

        let mut update = BsonDocument::new();
        if let Some(version) = model.version_field() {
            fields.remove(version);
            update.insert("$inc", doc! { version: 1_i64 });
        }
        if !fields.is_empty() {
            update.insert("$set", fields);
        }
        if update.is_empty() {
            return Ok(false);
        }

        let result = self
            .writable::<T>()?
            .update_one(doc! { ID_FIELD: id }, update)
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Delete the stored document with the entity's id. Returns the number
    /// of deleted documents.
    #[instrument(skip(self, entity), fields(entity = type_name::<T>()))]
    pub async fn delete<T: Entity>(&self, entity: &T) -> Result<u64> {
        let id = require_id(entity)?;
        let result = self.writable::<T>()?.delete_one(doc! { ID_FIELD: id }).await?;
        Ok(result.deleted_count)
    }

    pub fn find<T: Entity>(&self) -> Query<T> {
        Query::new(self.documents::<T>(), Arc::clone(&self.mapper))
    }

    pub fn aggregate<T: Entity>(&self) -> Aggregation<T> {
        Aggregation::new(self.documents::<T>(), Arc::clone(&self.mapper))
    }

    /// Create the declared indexes of every mapped entity
    #[instrument(skip(self))]
    pub async fn ensure_indexes(&self) -> Result<()> {
        for model in self.mapper.models() {
            self.create_indexes(&model).await?;
        }
        Ok(())
    }

    /// Map `T` and create its declared indexes
    pub async fn ensure_indexes_for<T: Entity>(&self) -> Result<()> {
        let model = self.mapper.model::<T>();
        self.create_indexes(&model).await
    }

    async fn create_indexes(&self, model: &EntityModel) -> Result<()> {
        if model.indexes().is_empty() {
            return Ok(());
        }
        let indexes = model
            .indexes()
            .iter()
            .map(|index| index.to_index_model(model))
            .collect::<Result<Vec<_>>>()?;
        let name = ValidatedCollectionName::new(&model.collection_name(self.mapper.options()))?;
        let result = self
            .database
            .collection::<BsonDocument>(name.as_str())
            .create_indexes(indexes)
            .await?;
        info!(collection = %name, indexes = ?result.index_names, "Indexes ensured");
        Ok(())
    }
}

fn require_id<T: Entity>(entity: &T) -> Result<Bson> {
    entity.id().ok_or_else(|| {
        TesseraError::Query(format!("{} has no id", type_name::<T>()))
    })
}

fn remove_nulls(document: &mut BsonDocument) {
    let nulls: Vec<String> = document
        .iter()
        .filter(|(_, value)| matches!(value, Bson::Null))
        .map(|(key, _)| key.clone())
        .collect();
    for key in nulls {
        document.remove(&key);
    }
}

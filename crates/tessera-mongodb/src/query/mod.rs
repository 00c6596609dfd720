//! Typed queries over an entity's collection
//!
//! A [`Query`] collects filters and options, then runs one of the terminal
//! operations (`to_list`, `count`, `delete`, `update`, ...). Field names are
//! written as property paths and translated through the entity model.

pub mod filters;
pub mod options;
pub mod sort;
pub mod updates;

use std::marker::PhantomData;
use std::sync::Arc;

use bson::{Bson, Document as BsonDocument};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use mongodb::results::UpdateResult;
use mongodb::Collection;
use tessera_common::TesseraError;
use tracing::{debug, info, instrument};

use crate::encode::EncodeContext;
use crate::mapping::{Entity, EntityModel, Mapper};
use crate::validation::validate_query;
use crate::Result;

pub use filters::Filter;
pub use options::{DeleteOptions, FindOptions, ModifyOptions, UpdateOptions};
pub use sort::{Sort, SortOrder};
pub use updates::UpdateOperator;

/// A query against the collection of `T`
pub struct Query<T: Entity> {
    collection: Collection<BsonDocument>,
    mapper: Arc<Mapper>,
    model: Arc<EntityModel>,
    filters: Vec<Filter>,
    validate: bool,
    options: FindOptions,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("collection", &self.collection.name())
            .field("filters", &self.filters)
            .field("validate", &self.validate)
            .field("options", &self.options)
            .finish()
    }
}

impl<T: Entity> Query<T> {
    pub(crate) fn new(collection: Collection<BsonDocument>, mapper: Arc<Mapper>) -> Self {
        let model = mapper.model::<T>();
        let validate = mapper.options().validate_queries;
        Self {
            collection,
            mapper,
            model,
            filters: Vec::new(),
            validate,
            options: FindOptions::default(),
            _entity: PhantomData,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        self.filters.extend(filters);
        self
    }

    /// Pass unknown field paths through instead of failing
    pub fn disable_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    pub fn options(mut self, options: FindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn context(&self) -> EncodeContext<'_> {
        EncodeContext::new(&self.model, self.validate)
    }

    /// The encoded filter document
    pub fn to_document(&self) -> Result<BsonDocument> {
        let document = filters::combine(&self.filters, &self.context())?;
        validate_query(
            &Bson::Document(document.clone()),
            self.mapper.options().allow_javascript,
        )?;
        Ok(document)
    }

    #[instrument(skip(self), fields(collection = %self.collection.name()))]
    pub async fn count(&self) -> Result<u64> {
        let filter = self.to_document()?;
        let count = self.collection.count_documents(filter).await?;
        debug!(count, "Counted documents");
        Ok(count)
    }

    #[instrument(skip(self), fields(collection = %self.collection.name()))]
    pub async fn to_list(&self) -> Result<Vec<T>> {
        let filter = self.to_document()?;
        let options = self.options.to_find_options(&self.context())?;
        let mut cursor = self.collection.find(filter).with_options(options).await?;

        let mut results = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            results.push(self.mapper.from_document(document)?);
        }
        debug!(count = results.len(), "Query complete");
        Ok(results)
    }

    /// Stream matching entities as the cursor yields them
    pub async fn iter(&self) -> Result<BoxStream<'static, Result<T>>> {
        let filter = self.to_document()?;
        let options = self.options.to_find_options(&self.context())?;
        let cursor = self.collection.find(filter).with_options(options).await?;
        let mapper = Arc::clone(&self.mapper);
        Ok(cursor
            .map(move |document| mapper.from_document::<T>(document?))
            .boxed())
    }

    #[instrument(skip(self), fields(collection = %self.collection.name()))]
    pub async fn first(&self) -> Result<Option<T>> {
        let filter = self.to_document()?;
        let options = self.options.to_find_one_options(&self.context())?;
        match self.collection.find_one(filter).with_options(options).await? {
            Some(document) => Ok(Some(self.mapper.from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Delete the first match, or every match with [`DeleteOptions::multi`].
    /// Returns the number of deleted documents.
    #[instrument(skip(self), fields(collection = %self.collection.name(), multi = options.multi))]
    pub async fn delete(&self, options: DeleteOptions) -> Result<u64> {
        let filter = self.to_document()?;
        let result = if options.multi {
            self.collection.delete_many(filter).await?
        } else {
            self.collection.delete_one(filter).await?
        };
        info!(deleted = result.deleted_count, "Delete complete");
        Ok(result.deleted_count)
    }

    /// Delete the first match (under the query's sort) and return it
    #[instrument(skip(self), fields(collection = %self.collection.name()))]
    pub async fn find_and_delete(&self) -> Result<Option<T>> {
        let filter = self.to_document()?;
        let options = self.options.to_find_and_delete_options(&self.context())?;
        match self
            .collection
            .find_one_and_delete(filter)
            .with_options(options)
            .await?
        {
            Some(document) => Ok(Some(self.mapper.from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Prepare an update of the matching documents
    pub fn update<I>(self, updates: I) -> Update<T>
    where
        I: IntoIterator<Item = UpdateOperator>,
    {
        Update {
            query: self,
            updates: updates.into_iter().collect(),
        }
    }

    /// Prepare a find-and-modify of the first match
    pub fn modify<I>(self, updates: I) -> Modify<T>
    where
        I: IntoIterator<Item = UpdateOperator>,
    {
        Modify {
            query: self,
            updates: updates.into_iter().collect(),
        }
    }

    /// Encoded update document; versioned entities also get their version
    /// incremented unless the update already touches it
    fn update_document(&self, updates: &[UpdateOperator]) -> Result<BsonDocument> {
        let mut document = updates::encode_updates(updates, &self.context())?;
        if let Some(version) = self.model.version_field() {
            let touched = document
                .values()
                .any(|group| group.as_document().map_or(false, |fields| fields.contains_key(version)));
            if !touched {
                if !document.contains_key("$inc") {
                    document.insert("$inc", BsonDocument::new());
                }
                document
                    .get_document_mut("$inc")
                    .map_err(|e| TesseraError::Internal(e.to_string()))?
                    .insert(version, 1_i64);
            }
        }
        validate_query(
            &Bson::Document(document.clone()),
            self.mapper.options().allow_javascript,
        )?;
        Ok(document)
    }
}

/// A pending update built by [`Query::update`]
#[derive(Debug)]
pub struct Update<T: Entity> {
    query: Query<T>,
    updates: Vec<UpdateOperator>,
}

impl<T: Entity> Update<T> {
    /// The encoded update document
    pub fn to_document(&self) -> Result<BsonDocument> {
        self.query.update_document(&self.updates)
    }

    #[instrument(skip(self), fields(
        collection = %self.query.collection.name(),
        multi = options.multi,
        upsert = options.upsert
    ))]
    pub async fn execute(&self, options: UpdateOptions) -> Result<UpdateResult> {
        let filter = self.query.to_document()?;
        let update = self.to_document()?;

        let result = if options.multi {
            self.query
                .collection
                .update_many(filter, update)
                .upsert(options.upsert)
                .await?
        } else {
            self.query
                .collection
                .update_one(filter, update)
                .upsert(options.upsert)
                .await?
        };
        info!(
            matched = result.matched_count,
            modified = result.modified_count,
            "Update complete"
        );
        Ok(result)
    }
}

/// A pending find-and-modify built by [`Query::modify`]
#[derive(Debug)]
pub struct Modify<T: Entity> {
    query: Query<T>,
    updates: Vec<UpdateOperator>,
}

impl<T: Entity> Modify<T> {
    pub fn to_document(&self) -> Result<BsonDocument> {
        self.query.update_document(&self.updates)
    }

    /// Apply the update to the first match and return the entity before or
    /// after it, per [`ModifyOptions::return_new`]
    #[instrument(skip(self), fields(collection = %self.query.collection.name()))]
    pub async fn execute(&self, options: ModifyOptions) -> Result<Option<T>> {
        let filter = self.query.to_document()?;
        let update = self.to_document()?;
        let driver_options = options.to_driver(&self.query.options, &self.query.context())?;

        match self
            .query
            .collection
            .find_one_and_update(filter, update)
            .with_options(driver_options)
            .await?
        {
            Some(document) => Ok(Some(self.query.mapper.from_document(document)?)),
            None => Ok(None),
        }
    }
}

//! Aggregation pipelines
//!
//! [`expressions`] builds operator expressions, [`stages`] builds the stages
//! they are used in, and [`Aggregation`] runs a pipeline against the
//! collection of an entity.

pub mod expressions;
pub mod stages;

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use bson::{Bson, Document as BsonDocument};
use futures::stream::TryStreamExt;
use mongodb::options::{AggregateOptions, Collation};
use mongodb::Collection;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::encode::EncodeContext;
use crate::mapping::{Entity, EntityModel, Mapper};
use crate::validation::validate_pipeline;
use crate::Result;

pub use stages::{Pipeline, Stage};

/// Options passed to the driver's `aggregate`
#[derive(Debug, Clone, Default)]
pub struct AggregationOptions {
    pub allow_disk_use: Option<bool>,
    pub batch_size: Option<u32>,
    pub max_time: Option<Duration>,
    pub comment: Option<String>,
    pub collation: Option<Collation>,
}

impl AggregationOptions {
    pub fn allow_disk_use(mut self, allow: bool) -> Self {
        self.allow_disk_use = Some(allow);
        self
    }

    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn collation(mut self, collation: Collation) -> Self {
        self.collation = Some(collation);
        self
    }

    fn to_driver(&self) -> AggregateOptions {
        let mut options = AggregateOptions::default();
        options.allow_disk_use = self.allow_disk_use;
        options.batch_size = self.batch_size;
        options.max_time = self.max_time;
        options.comment = self.comment.clone().map(Bson::String);
        options.collation = self.collation.clone();
        options
    }
}

/// A pipeline over the collection of `T`.
///
/// Field references are translated through the model of `T` without
/// validation: later stages routinely refer to fields computed earlier.
pub struct Aggregation<T: Entity> {
    collection: Collection<BsonDocument>,
    mapper: Arc<Mapper>,
    model: Arc<EntityModel>,
    pipeline: Pipeline,
    options: AggregationOptions,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> std::fmt::Debug for Aggregation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregation")
            .field("collection", &self.collection.name())
            .field("pipeline", &self.pipeline)
            .field("options", &self.options)
            .finish()
    }
}

impl<T: Entity> Aggregation<T> {
    pub(crate) fn new(collection: Collection<BsonDocument>, mapper: Arc<Mapper>) -> Self {
        let model = mapper.model::<T>();
        Self {
            collection,
            mapper,
            model,
            pipeline: Pipeline::new(),
            options: AggregationOptions::default(),
            _entity: PhantomData,
        }
    }

    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.pipeline.push(stage);
        self
    }

    /// Append every stage of `pipeline`
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline.extend(pipeline);
        self
    }

    pub fn options(mut self, options: AggregationOptions) -> Self {
        self.options = options;
        self
    }

    /// The encoded stages, checked for JavaScript operators
    pub fn to_pipeline(&self) -> Result<Vec<BsonDocument>> {
        let ctx = EncodeContext::new(&self.model, false);
        let stages = self.pipeline.encode(&ctx)?;
        validate_pipeline(&stages, self.mapper.options().allow_javascript)?;
        Ok(stages)
    }

    /// Run the pipeline and deserialize each result document as `R`
    #[instrument(skip(self), fields(collection = %self.collection.name(), stages = self.pipeline.len()))]
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        let documents = self.execute_documents().await?;
        documents
            .into_iter()
            .map(|document| Ok(bson::from_document(document)?))
            .collect()
    }

    /// Run the pipeline and return the raw result documents
    #[instrument(skip(self), fields(collection = %self.collection.name(), stages = self.pipeline.len()))]
    pub async fn execute_documents(&self) -> Result<Vec<BsonDocument>> {
        let stages = self.to_pipeline()?;
        let cursor = self
            .collection
            .aggregate(stages)
            .with_options(self.options.to_driver())
            .await?;
        let results: Vec<BsonDocument> = cursor.try_collect().await?;
        debug!(count = results.len(), "Aggregation complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_to_driver() {
        let options = AggregationOptions::default()
            .allow_disk_use(true)
            .batch_size(100)
            .max_time(Duration::from_secs(5))
            .comment("report")
            .to_driver();
        assert_eq!(options.allow_disk_use, Some(true));
        assert_eq!(options.batch_size, Some(100));
        assert_eq!(options.max_time, Some(Duration::from_secs(5)));
        assert_eq!(options.comment, Some(Bson::String("report".to_string())));
        assert!(options.collation.is_none());
    }
}

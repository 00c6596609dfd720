//! Aggregation pipeline stages
//!
//! Every stage encodes to a single-key document `{ $name: body }`. Field
//! paths given to a stage are translated through the entity model of the
//! aggregation; pipelines that run against other collections (`$lookup`,
//! `$unionWith`) are encoded without a model.

mod grouping;
mod joins;
mod output;
mod selection;
mod shaping;

pub use grouping::{bucket, bucket_auto, count, group, sort_by_count, Bucket, BucketAuto, Count, Group, SortByCount};
pub use joins::{facet, graph_lookup, lookup, union_with, Facet, GraphLookup, Lookup, UnionWith};
pub use output::{merge, out, Merge, Out, WhenMatched, WhenNotMatched};
pub use selection::{documents, limit, match_, redact, sample, skip, sort, Documents, Limit, Match, Redact, Sample, Skip, SortStage};
pub use shaping::{
    add_fields, project, replace_root, replace_with, set, unset, unwind, AddFields, Project,
    ReplaceRoot, ReplaceWith, Unset, Unwind,
};

use bson::{Bson, Document as BsonDocument};

use crate::encode::EncodeContext;
use crate::Result;

/// A pipeline stage
pub trait Stage: std::fmt::Debug + Send + Sync {
    /// Stage operator, e.g. `"$group"`
    fn name(&self) -> &'static str;

    /// The value stored under the operator name
    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson>;

    fn encode(&self, ctx: &EncodeContext<'_>) -> Result<BsonDocument> {
        let mut out = BsonDocument::new();
        out.insert(self.name(), self.encode_body(ctx)?);
        Ok(out)
    }
}

/// An ordered list of stages
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push<S: Stage + 'static>(&mut self, stage: S) {
        self.stages.push(Box::new(stage));
    }

    /// Append the stages of `other`
    pub fn extend(&mut self, other: Pipeline) {
        self.stages.extend(other.stages);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    pub fn encode(&self, ctx: &EncodeContext<'_>) -> Result<Vec<BsonDocument>> {
        self.stages.iter().map(|stage| stage.encode(ctx)).collect()
    }

    pub(crate) fn encode_bson(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(Bson::Array(
            self.encode(ctx)?.into_iter().map(Bson::Document).collect(),
        ))
    }
}

/// Every stage operator a builder can produce, sorted
pub const STAGE_OPERATORS: &[&str] = &[
    "$addFields", "$bucket", "$bucketAuto", "$count", "$documents", "$facet",
    "$graphLookup", "$group", "$limit", "$lookup", "$match", "$merge", "$out",
    "$project", "$redact", "$replaceRoot", "$replaceWith", "$sample", "$set",
    "$skip", "$sort", "$sortByCount", "$unionWith", "$unset", "$unwind",
];

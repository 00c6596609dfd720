//! Stages that read other collections or fan out into sub-pipelines

use bson::{Bson, Document as BsonDocument};

use super::{Pipeline, Stage};
use crate::aggregation::expressions::{DocumentExpression, Expression};
use crate::encode::EncodeContext;
use crate::query::filters::{self, Filter};
use crate::Result;

/// `$lookup` from another collection of the same database.
///
/// Use `local_field`/`foreign_field` for an equality match, a `pipeline`
/// for anything else, or both.
pub fn lookup(from: impl Into<String>) -> Lookup {
    Lookup {
        from: from.into(),
        local_field: None,
        foreign_field: None,
        let_: DocumentExpression::new(),
        pipeline: None,
        as_: None,
    }
}

#[derive(Debug)]
pub struct Lookup {
    from: String,
    local_field: Option<String>,
    foreign_field: Option<String>,
    let_: DocumentExpression,
    pipeline: Option<Pipeline>,
    as_: Option<String>,
}

impl Lookup {
    pub fn local_field(mut self, field: impl Into<String>) -> Self {
        self.local_field = Some(field.into());
        self
    }

    /// Stored name in the joined collection; not translated
    pub fn foreign_field(mut self, field: impl Into<String>) -> Self {
        self.foreign_field = Some(field.into());
        self
    }

    /// Bind a variable for the sub-pipeline
    pub fn let_(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.let_ = self.let_.field(name, value);
        self
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn as_(mut self, name: impl Into<String>) -> Self {
        self.as_ = Some(name.into());
        self
    }
}

impl Stage for Lookup {
    fn name(&self) -> &'static str {
        "$lookup"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        body.insert("from", self.from.clone());
        if let Some(local) = &self.local_field {
            body.insert("localField", ctx.lenient().path(local)?);
        }
        if let Some(foreign) = &self.foreign_field {
            body.insert("foreignField", foreign.clone());
        }
        if !self.let_.is_empty() {
            body.insert("let", self.let_.encode(ctx));
        }
        if let Some(pipeline) = &self.pipeline {
            body.insert("pipeline", pipeline.encode_bson(&EncodeContext::detached())?);
        }
        if let Some(as_) = &self.as_ {
            body.insert("as", as_.clone());
        }
        Ok(Bson::Document(body))
    }
}

/// `$graphLookup`: recursive search over `from`
pub fn graph_lookup(from: impl Into<String>) -> GraphLookup {
    GraphLookup {
        from: from.into(),
        start_with: None,
        connect_from_field: None,
        connect_to_field: None,
        as_: None,
        max_depth: None,
        depth_field: None,
        restrict_search_with_match: Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphLookup {
    from: String,
    start_with: Option<Expression>,
    connect_from_field: Option<String>,
    connect_to_field: Option<String>,
    as_: Option<String>,
    max_depth: Option<i32>,
    depth_field: Option<String>,
    restrict_search_with_match: Vec<Filter>,
}

impl GraphLookup {
    pub fn start_with(mut self, expression: impl Into<Expression>) -> Self {
        self.start_with = Some(expression.into());
        self
    }

    pub fn connect_from_field(mut self, field: impl Into<String>) -> Self {
        self.connect_from_field = Some(field.into());
        self
    }

    pub fn connect_to_field(mut self, field: impl Into<String>) -> Self {
        self.connect_to_field = Some(field.into());
        self
    }

    pub fn as_(mut self, name: impl Into<String>) -> Self {
        self.as_ = Some(name.into());
        self
    }

    pub fn max_depth(mut self, depth: i32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn depth_field(mut self, field: impl Into<String>) -> Self {
        self.depth_field = Some(field.into());
        self
    }

    /// Conditions on the documents visited in `from`
    pub fn restrict_search_with_match<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        self.restrict_search_with_match.extend(filters);
        self
    }
}

impl Stage for GraphLookup {
    fn name(&self) -> &'static str {
        "$graphLookup"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        body.insert("from", self.from.clone());
        if let Some(start) = &self.start_with {
            body.insert("startWith", start.encode(ctx));
        }
        if let Some(field) = &self.connect_from_field {
            body.insert("connectFromField", field.clone());
        }
        if let Some(field) = &self.connect_to_field {
            body.insert("connectToField", field.clone());
        }
        if let Some(as_) = &self.as_ {
            body.insert("as", as_.clone());
        }
        if let Some(depth) = self.max_depth {
            body.insert("maxDepth", depth);
        }
        if let Some(field) = &self.depth_field {
            body.insert("depthField", field.clone());
        }
        if !self.restrict_search_with_match.is_empty() {
            body.insert(
                "restrictSearchWithMatch",
                filters::combine(&self.restrict_search_with_match, &EncodeContext::detached())?,
            );
        }
        Ok(Bson::Document(body))
    }
}

/// `$facet`: several pipelines over the same input
pub fn facet() -> Facet {
    Facet { fields: Vec::new() }
}

#[derive(Debug)]
pub struct Facet {
    fields: Vec<(String, Pipeline)>,
}

impl Facet {
    pub fn field(mut self, name: impl Into<String>, pipeline: Pipeline) -> Self {
        self.fields.push((name.into(), pipeline));
        self
    }
}

impl Stage for Facet {
    fn name(&self) -> &'static str {
        "$facet"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        for (name, pipeline) in &self.fields {
            body.insert(name.clone(), pipeline.encode_bson(ctx)?);
        }
        Ok(Bson::Document(body))
    }
}

/// `$unionWith`: append the documents of another collection
pub fn union_with(collection: impl Into<String>) -> UnionWith {
    UnionWith {
        collection: collection.into(),
        pipeline: None,
    }
}

#[derive(Debug)]
pub struct UnionWith {
    collection: String,
    pipeline: Option<Pipeline>,
}

impl UnionWith {
    /// Stages applied to the other collection before the union
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }
}

impl Stage for UnionWith {
    fn name(&self) -> &'static str {
        "$unionWith"
    }

    fn encode_body(&self, _ctx: &EncodeContext<'_>) -> Result<Bson> {
        match &self.pipeline {
            None => Ok(Bson::String(self.collection.clone())),
            Some(pipeline) => {
                let mut body = BsonDocument::new();
                body.insert("coll", self.collection.clone());
                body.insert("pipeline", pipeline.encode_bson(&EncodeContext::detached())?);
                Ok(Bson::Document(body))
            }
        }
    }
}

//! Terminal stages that write results to a collection

use bson::{Bson, Document as BsonDocument};

use super::{Pipeline, Stage};
use crate::aggregation::expressions::{DocumentExpression, Expression};
use crate::encode::EncodeContext;
use crate::Result;

/// Action of `$merge` when a result matches an existing document
#[derive(Debug)]
pub enum WhenMatched {
    Replace,
    KeepExisting,
    Merge,
    Fail,
    /// Update the existing document with a pipeline; `$$new` is the result
    Pipeline(Pipeline),
}

/// Action of `$merge` when a result matches nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenNotMatched {
    Insert,
    Discard,
    Fail,
}

impl WhenNotMatched {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhenNotMatched::Insert => "insert",
            WhenNotMatched::Discard => "discard",
            WhenNotMatched::Fail => "fail",
        }
    }
}

impl WhenMatched {
    fn encode(&self) -> Result<Bson> {
        let action = match self {
            WhenMatched::Replace => "replace",
            WhenMatched::KeepExisting => "keepExisting",
            WhenMatched::Merge => "merge",
            WhenMatched::Fail => "fail",
            WhenMatched::Pipeline(pipeline) => {
                return pipeline.encode_bson(&EncodeContext::detached());
            }
        };
        Ok(Bson::String(action.to_string()))
    }
}

fn target(database: Option<&String>, collection: &str) -> Bson {
    match database {
        None => Bson::String(collection.to_string()),
        Some(db) => {
            let mut out = BsonDocument::new();
            out.insert("db", db.clone());
            out.insert("coll", collection);
            Bson::Document(out)
        }
    }
}

/// `$merge` into a collection
pub fn merge(into: impl Into<String>) -> Merge {
    Merge {
        into: into.into(),
        database: None,
        on: Vec::new(),
        let_: DocumentExpression::new(),
        when_matched: None,
        when_not_matched: None,
    }
}

#[derive(Debug)]
pub struct Merge {
    into: String,
    database: Option<String>,
    on: Vec<String>,
    let_: DocumentExpression,
    when_matched: Option<WhenMatched>,
    when_not_matched: Option<WhenNotMatched>,
}

impl Merge {
    /// Target a collection in another database
    pub fn into_db(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Identifier fields used to find the matching document
    pub fn on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Variables for a [`WhenMatched::Pipeline`]
    pub fn let_(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.let_ = self.let_.field(name, value);
        self
    }

    pub fn when_matched(mut self, action: WhenMatched) -> Self {
        self.when_matched = Some(action);
        self
    }

    pub fn when_not_matched(mut self, action: WhenNotMatched) -> Self {
        self.when_not_matched = Some(action);
        self
    }
}

impl Stage for Merge {
    fn name(&self) -> &'static str {
        "$merge"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        body.insert("into", target(self.database.as_ref(), &self.into));
        match self.on.as_slice() {
            [] => {}
            [single] => {
                body.insert("on", single.clone());
            }
            many => {
                body.insert("on", many.to_vec());
            }
        }
        if !self.let_.is_empty() {
            body.insert("let", self.let_.encode(ctx));
        }
        if let Some(action) = &self.when_matched {
            body.insert("whenMatched", action.encode()?);
        }
        if let Some(action) = self.when_not_matched {
            body.insert("whenNotMatched", action.as_str());
        }
        Ok(Bson::Document(body))
    }
}

/// `$out`: replace a collection with the results
pub fn out(collection: impl Into<String>) -> Out {
    Out {
        collection: collection.into(),
        database: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Out {
    collection: String,
    database: Option<String>,
}

impl Out {
    pub fn out_db(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

impl Stage for Out {
    fn name(&self) -> &'static str {
        "$out"
    }

    fn encode_body(&self, _ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(target(self.database.as_ref(), &self.collection))
    }
}

//! Stages that select, order or supply documents

use bson::{Bson, Document as BsonDocument};

use super::Stage;
use crate::aggregation::expressions::Expression;
use crate::encode::EncodeContext;
use crate::query::filters::{self, Filter};
use crate::query::sort::{sort_document, Sort};
use crate::Result;

/// `$documents`: literal input documents
pub fn documents(documents: Vec<BsonDocument>) -> Documents {
    Documents { documents }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Documents {
    documents: Vec<BsonDocument>,
}

impl Stage for Documents {
    fn name(&self) -> &'static str {
        "$documents"
    }

    fn encode_body(&self, _ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(Bson::Array(
            self.documents.iter().cloned().map(Bson::Document).collect(),
        ))
    }
}

/// `$limit`
pub fn limit(n: i64) -> Limit {
    Limit { n }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    n: i64,
}

impl Stage for Limit {
    fn name(&self) -> &'static str {
        "$limit"
    }

    fn encode_body(&self, _ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(Bson::Int64(self.n))
    }
}

/// `$match` with the same filters a [`Query`](crate::query::Query) takes
pub fn match_<I>(filters: I) -> Match
where
    I: IntoIterator<Item = Filter>,
{
    Match {
        filters: filters.into_iter().collect(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    filters: Vec<Filter>,
}

impl Stage for Match {
    fn name(&self) -> &'static str {
        "$match"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(Bson::Document(filters::combine(&self.filters, ctx)?))
    }
}

/// `$redact`; the expression resolves to `$$DESCEND`, `$$PRUNE` or `$$KEEP`
pub fn redact(expression: impl Into<Expression>) -> Redact {
    Redact {
        expression: expression.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Redact {
    expression: Expression,
}

impl Stage for Redact {
    fn name(&self) -> &'static str {
        "$redact"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(self.expression.encode(ctx))
    }
}

/// `$sample`
pub fn sample(size: i64) -> Sample {
    Sample { size }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    size: i64,
}

impl Stage for Sample {
    fn name(&self) -> &'static str {
        "$sample"
    }

    fn encode_body(&self, _ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        body.insert("size", self.size);
        Ok(Bson::Document(body))
    }
}

/// `$skip`
pub fn skip(n: i64) -> Skip {
    Skip { n }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skip {
    n: i64,
}

impl Stage for Skip {
    fn name(&self) -> &'static str {
        "$skip"
    }

    fn encode_body(&self, _ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(Bson::Int64(self.n))
    }
}

/// `$sort`; keys apply in the order added
pub fn sort() -> SortStage {
    SortStage { sorts: Vec::new() }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortStage {
    sorts: Vec<Sort>,
}

impl SortStage {
    pub fn ascending(mut self, field: impl Into<String>) -> Self {
        self.sorts.push(Sort::ascending(field));
        self
    }

    pub fn descending(mut self, field: impl Into<String>) -> Self {
        self.sorts.push(Sort::descending(field));
        self
    }

    /// Sort by text search score, exposed as `field`
    pub fn meta(mut self, field: impl Into<String>) -> Self {
        self.sorts.push(Sort::meta_text_score(field));
        self
    }

    pub fn by(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }
}

impl Stage for SortStage {
    fn name(&self) -> &'static str {
        "$sort"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(Bson::Document(sort_document(&self.sorts, &ctx.lenient())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::expressions::{comparison, conditional};
    use crate::mapping::EntityModel;
    use crate::query::filters::{eq, gte};
    use bson::doc;

    #[test]
    fn test_match_translates_paths() {
        let model = EntityModel::builder("Game")
            .mapped_property("gameId", "game_id")
            .build();
        let ctx = EncodeContext::new(&model, true);
        let stage = match_([eq("gameId", "G1"), gte("score", 10)]);
        // score is not declared, so validation rejects it
        assert!(stage.encode(&ctx).is_err());
        assert_eq!(
            match_([eq("gameId", "G1")]).encode(&ctx).unwrap(),
            doc! { "$match": { "game_id": "G1" } }
        );
    }

    #[test]
    fn test_sort_stage() {
        let stage = sort().descending("score").ascending("playerId").meta("relevance");
        assert_eq!(
            stage.encode(&EncodeContext::detached()).unwrap(),
            doc! { "$sort": { "score": -1, "playerId": 1, "relevance": { "$meta": "textScore" } } }
        );
    }

    #[test]
    fn test_simple_stages() {
        let ctx = EncodeContext::detached();
        assert_eq!(sample(3).encode(&ctx).unwrap(), doc! { "$sample": { "size": 3_i64 } });
        assert_eq!(skip(10).encode(&ctx).unwrap(), doc! { "$skip": 10_i64 });
        assert_eq!(
            documents(vec![doc! { "x": 10 }, doc! { "x": 2 }]).encode(&ctx).unwrap(),
            doc! { "$documents": [{ "x": 10 }, { "x": 2 }] }
        );
    }

    #[test]
    fn test_redact() {
        let stage = redact(conditional::condition(
            comparison::eq("$level", 5),
            "$$PRUNE",
            "$$DESCEND",
        ));
        assert_eq!(
            stage.encode(&EncodeContext::detached()).unwrap(),
            doc! {
                "$redact": {
                    "$cond": { "if": { "$eq": ["$level", 5] }, "then": "$$PRUNE", "else": "$$DESCEND" }
                }
            }
        );
    }
}

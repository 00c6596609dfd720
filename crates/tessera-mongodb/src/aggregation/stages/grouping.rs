//! Grouping stages

use bson::{Bson, Document as BsonDocument};

use super::Stage;
use crate::aggregation::expressions::{DocumentExpression, Expression};
use crate::encode::EncodeContext;
use crate::Result;

/// `$group`; without an id every document lands in one group
pub fn group() -> Group {
    Group {
        id: None,
        fields: DocumentExpression::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    id: Option<Expression>,
    fields: DocumentExpression,
}

impl Group {
    /// Group key; pass a [`document()`](crate::aggregation::expressions::document)
    /// for a compound key
    pub fn id(mut self, id: impl Into<Expression>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// An output field computed by an accumulator
    pub fn field(mut self, name: impl Into<String>, accumulator: impl Into<Expression>) -> Self {
        self.fields = self.fields.field(name, accumulator);
        self
    }
}

impl Stage for Group {
    fn name(&self) -> &'static str {
        "$group"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        body.insert(
            "_id",
            self.id.as_ref().map(|id| id.encode(ctx)).unwrap_or(Bson::Null),
        );
        body.extend(self.fields.encode(ctx));
        Ok(Bson::Document(body))
    }
}

/// `$bucket` over explicit boundaries
pub fn bucket(group_by: impl Into<Expression>) -> Bucket {
    Bucket {
        group_by: group_by.into(),
        boundaries: Vec::new(),
        default: None,
        output: DocumentExpression::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    group_by: Expression,
    boundaries: Vec<Bson>,
    default: Option<Bson>,
    output: DocumentExpression,
}

impl Bucket {
    /// Sorted lower bounds; the last value is the exclusive upper bound
    pub fn boundaries<I, V>(mut self, boundaries: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.boundaries = boundaries.into_iter().map(Into::into).collect();
        self
    }

    /// Bucket id for values outside the boundaries
    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn output(mut self, name: impl Into<String>, accumulator: impl Into<Expression>) -> Self {
        self.output = self.output.field(name, accumulator);
        self
    }
}

impl Stage for Bucket {
    fn name(&self) -> &'static str {
        "$bucket"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        body.insert("groupBy", self.group_by.encode(ctx));
        body.insert("boundaries", self.boundaries.clone());
        if let Some(default) = &self.default {
            body.insert("default", default.clone());
        }
        if !self.output.is_empty() {
            body.insert("output", self.output.encode(ctx));
        }
        Ok(Bson::Document(body))
    }
}

/// `$bucketAuto` into `buckets` evenly filled buckets
pub fn bucket_auto(group_by: impl Into<Expression>, buckets: i32) -> BucketAuto {
    BucketAuto {
        group_by: group_by.into(),
        buckets,
        granularity: None,
        output: DocumentExpression::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketAuto {
    group_by: Expression,
    buckets: i32,
    granularity: Option<String>,
    output: DocumentExpression,
}

impl BucketAuto {
    /// Preferred number series, e.g. `"R5"`, `"1-2-5"`, `"POWERSOF2"`
    pub fn granularity(mut self, granularity: impl Into<String>) -> Self {
        self.granularity = Some(granularity.into());
        self
    }

    pub fn output(mut self, name: impl Into<String>, accumulator: impl Into<Expression>) -> Self {
        self.output = self.output.field(name, accumulator);
        self
    }
}

impl Stage for BucketAuto {
    fn name(&self) -> &'static str {
        "$bucketAuto"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        let mut body = BsonDocument::new();
        body.insert("groupBy", self.group_by.encode(ctx));
        body.insert("buckets", self.buckets);
        if !self.output.is_empty() {
            body.insert("output", self.output.encode(ctx));
        }
        if let Some(granularity) = &self.granularity {
            body.insert("granularity", granularity.clone());
        }
        Ok(Bson::Document(body))
    }
}

/// `$count`: a single document holding the number of inputs under `name`
pub fn count(name: impl Into<String>) -> Count {
    Count { name: name.into() }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Count {
    name: String,
}

impl Stage for Count {
    fn name(&self) -> &'static str {
        "$count"
    }

    fn encode_body(&self, _ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(Bson::String(self.name.clone()))
    }
}

/// `$sortByCount`
pub fn sort_by_count(expression: impl Into<Expression>) -> SortByCount {
    SortByCount {
        expression: expression.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortByCount {
    expression: Expression,
}

impl Stage for SortByCount {
    fn name(&self) -> &'static str {
        "$sortByCount"
    }

    fn encode_body(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(self.expression.encode(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::expressions::{accumulator, array, document, field};
    use bson::doc;

    fn ctx() -> EncodeContext<'static> {
        EncodeContext::detached()
    }

    #[test]
    fn test_group_with_compound_id() {
        let stage = group()
            .id(document().field("gameId", field("gameId")))
            .field("gamescores", accumulator::first_n(3, field("score")));
        assert_eq!(
            stage.encode(&ctx()).unwrap(),
            doc! {
                "$group": {
                    "_id": { "gameId": "$gameId" },
                    "gamescores": { "$firstN": { "input": "$score", "n": 3 } }
                }
            }
        );
    }

    #[test]
    fn test_group_without_id() {
        let stage = group().field(
            "firstFive",
            accumulator::first_n(5, array::array(["$playerId", "$score"])),
        );
        assert_eq!(
            stage.encode(&ctx()).unwrap(),
            doc! {
                "$group": {
                    "_id": null,
                    "firstFive": { "$firstN": { "input": ["$playerId", "$score"], "n": 5 } }
                }
            }
        );
    }

    #[test]
    fn test_bucket() {
        let stage = bucket(field("price"))
            .boundaries([0, 200, 400])
            .default_value("Other")
            .output("count", accumulator::sum(1));
        assert_eq!(
            stage.encode(&ctx()).unwrap(),
            doc! {
                "$bucket": {
                    "groupBy": "$price",
                    "boundaries": [0, 200, 400],
                    "default": "Other",
                    "output": { "count": { "$sum": 1 } }
                }
            }
        );
    }

    #[test]
    fn test_bucket_auto() {
        let stage = bucket_auto(field("price"), 4).granularity("R5");
        assert_eq!(
            stage.encode(&ctx()).unwrap(),
            doc! { "$bucketAuto": { "groupBy": "$price", "buckets": 4, "granularity": "R5" } }
        );
    }

    #[test]
    fn test_count_and_sort_by_count() {
        assert_eq!(count("passing_scores").encode(&ctx()).unwrap(), doc! { "$count": "passing_scores" });
        assert_eq!(
            sort_by_count(field("tags")).encode(&ctx()).unwrap(),
            doc! { "$sortByCount": "$tags" }
        );
    }
}

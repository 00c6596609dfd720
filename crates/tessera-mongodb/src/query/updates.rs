//! Update operators
//!
//! Operators are grouped by name when encoded, so
//! `[set("a", 1), set("b", 2), inc("n", 1)]` becomes
//! `{ $set: { a: 1, b: 2 }, $inc: { n: 1 } }`.

use bson::{doc, Bson, Document as BsonDocument};
use tessera_common::TesseraError;

use super::filters::{self, Filter};
use super::sort::{sort_document, Sort};
use crate::encode::EncodeContext;
use crate::validation::ValidatedFieldName;
use crate::Result;

/// Which end of the array `$pop` removes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopPosition {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
enum PushSort {
    Direction(i32),
    Fields(Vec<Sort>),
}

#[derive(Debug, Clone, PartialEq)]
struct ArrayValues {
    values: Vec<Bson>,
    each: bool,
    position: Option<i32>,
    slice: Option<i32>,
    sort: Option<PushSort>,
}

impl ArrayValues {
    fn single(value: Bson) -> Self {
        Self {
            values: vec![value],
            each: false,
            position: None,
            slice: None,
            sort: None,
        }
    }

    fn each(values: Vec<Bson>) -> Self {
        Self {
            values,
            each: true,
            position: None,
            slice: None,
            sort: None,
        }
    }

    fn has_modifiers(&self) -> bool {
        self.each || self.position.is_some() || self.slice.is_some() || self.sort.is_some()
    }

    fn encode(&self, nested: &EncodeContext<'_>) -> Result<Bson> {
        if !self.has_modifiers() {
            return Ok(self.values.first().cloned().unwrap_or(Bson::Null));
        }
        let mut out = doc! { "$each": self.values.clone() };
        if let Some(position) = self.position {
            out.insert("$position", position);
        }
        if let Some(slice) = self.slice {
            out.insert("$slice", slice);
        }
        match &self.sort {
            Some(PushSort::Direction(direction)) => {
                out.insert("$sort", *direction);
            }
            Some(PushSort::Fields(sorts)) => {
                out.insert("$sort", sort_document(sorts, nested)?);
            }
            None => {}
        }
        Ok(Bson::Document(out))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum UpdateValue {
    Value(Bson),
    /// `$inc` by the negated amount
    Decrement(Bson),
    Unset,
    Rename(String),
    CurrentDate { timestamp: bool },
    Array(ArrayValues),
    PullMatching(Vec<Filter>),
    Bit(&'static str, Bson),
}

/// A single update operation on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperator {
    operator: &'static str,
    field: String,
    value: UpdateValue,
}

impl UpdateOperator {
    fn new(operator: &'static str, field: impl Into<String>, value: UpdateValue) -> Self {
        Self {
            operator,
            field: field.into(),
            value,
        }
    }

    pub fn operator(&self) -> &'static str {
        self.operator
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// `$currentDate` as a timestamp instead of a date
    pub fn timestamp(mut self) -> Self {
        if let UpdateValue::CurrentDate { ref mut timestamp } = self.value {
            *timestamp = true;
        }
        self
    }

    /// `$push` insert position
    pub fn position(mut self, position: i32) -> Self {
        if let Some(values) = self.push_values() {
            values.position = Some(position);
        }
        self
    }

    /// `$push` array length cap after the push
    pub fn slice(mut self, slice: i32) -> Self {
        if let Some(values) = self.push_values() {
            values.slice = Some(slice);
        }
        self
    }

    /// Sort scalar elements after a `$push`: `1` or `-1`
    pub fn sort(mut self, direction: i32) -> Self {
        if let Some(values) = self.push_values() {
            values.sort = Some(PushSort::Direction(direction));
        }
        self
    }

    /// Sort document elements after a `$push`
    pub fn sort_by<I>(mut self, sorts: I) -> Self
    where
        I: IntoIterator<Item = Sort>,
    {
        if let Some(values) = self.push_values() {
            values.sort = Some(PushSort::Fields(sorts.into_iter().collect()));
        }
        self
    }

    fn push_values(&mut self) -> Option<&mut ArrayValues> {
        match (&mut self.value, self.operator) {
            (UpdateValue::Array(values), "$push") => Some(values),
            _ => None,
        }
    }

    fn encode_value(&self, ctx: &EncodeContext<'_>) -> Result<Bson> {
        Ok(match &self.value {
            UpdateValue::Value(value) => value.clone(),
            UpdateValue::Decrement(value) => negate(value).ok_or_else(|| {
                TesseraError::Query(format!(
                    "Cannot decrement '{}' by {}: not a negatable number",
                    self.field, value
                ))
            })?,
            UpdateValue::Unset => Bson::String(String::new()),
            UpdateValue::Rename(new_name) => Bson::String(ctx.lenient().path(new_name)?),
            UpdateValue::CurrentDate { timestamp: false } => Bson::Boolean(true),
            UpdateValue::CurrentDate { timestamp: true } => {
                Bson::Document(doc! { "$type": "timestamp" })
            }
            UpdateValue::Array(values) => values.encode(&ctx.nested(&self.field))?,
            UpdateValue::PullMatching(conditions) => {
                Bson::Document(filters::element_conditions(conditions, &ctx.nested(&self.field))?)
            }
            UpdateValue::Bit(op, value) => {
                let mut out = BsonDocument::new();
                out.insert(*op, value.clone());
                Bson::Document(out)
            }
        })
    }
}

fn negate(value: &Bson) -> Option<Bson> {
    match value {
        Bson::Int32(n) => n.checked_neg().map(Bson::Int32),
        Bson::Int64(n) => n.checked_neg().map(Bson::Int64),
        Bson::Double(n) => Some(Bson::Double(-n)),
        _ => None,
    }
}

/// Encode a list of update operators into an update document.
///
/// # Errors
/// An empty list, or the same field twice under one operator, is a
/// [`TesseraError::Query`].
pub fn encode_updates(updates: &[UpdateOperator], ctx: &EncodeContext<'_>) -> Result<BsonDocument> {
    if updates.is_empty() {
        return Err(TesseraError::Query("No update operators given".to_string()));
    }

    let mut out = BsonDocument::new();
    for update in updates {
        let path = ValidatedFieldName::new(&ctx.path(&update.field)?, false)?.into_string();
        let value = update.encode_value(ctx)?;

        if !out.contains_key(update.operator) {
            out.insert(update.operator, BsonDocument::new());
        }
        let group = out
            .get_document_mut(update.operator)
            .map_err(|e| TesseraError::Internal(e.to_string()))?;
        if group.contains_key(&path) {
            return Err(TesseraError::Query(format!(
                "Field '{}' appears more than once under {}",
                path, update.operator
            )));
        }
        group.insert(path, value);
    }
    Ok(out)
}

pub fn set(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$set", field, UpdateValue::Value(value.into()))
}

/// `$setOnInsert`: only applied when an upsert inserts
pub fn set_on_insert(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$setOnInsert", field, UpdateValue::Value(value.into()))
}

pub fn unset(field: impl Into<String>) -> UpdateOperator {
    UpdateOperator::new("$unset", field, UpdateValue::Unset)
}

pub fn inc(field: impl Into<String>, amount: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$inc", field, UpdateValue::Value(amount.into()))
}

/// `$inc` by `-amount`
pub fn dec(field: impl Into<String>, amount: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$inc", field, UpdateValue::Decrement(amount.into()))
}

pub fn mul(field: impl Into<String>, factor: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$mul", field, UpdateValue::Value(factor.into()))
}

pub fn min(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$min", field, UpdateValue::Value(value.into()))
}

pub fn max(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$max", field, UpdateValue::Value(value.into()))
}

pub fn rename(field: impl Into<String>, new_name: impl Into<String>) -> UpdateOperator {
    UpdateOperator::new("$rename", field, UpdateValue::Rename(new_name.into()))
}

/// `$currentDate`; see [`UpdateOperator::timestamp`]
pub fn current_date(field: impl Into<String>) -> UpdateOperator {
    UpdateOperator::new(
        "$currentDate",
        field,
        UpdateValue::CurrentDate { timestamp: false },
    )
}

pub fn add_to_set(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new(
        "$addToSet",
        field,
        UpdateValue::Array(ArrayValues::single(value.into())),
    )
}

/// `$addToSet` with `$each`
pub fn add_to_set_each<I, V>(field: impl Into<String>, values: I) -> UpdateOperator
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    UpdateOperator::new(
        "$addToSet",
        field,
        UpdateValue::Array(ArrayValues::each(values.into_iter().map(Into::into).collect())),
    )
}

/// `$push`; any modifier switches to the `$each` form
pub fn push(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new(
        "$push",
        field,
        UpdateValue::Array(ArrayValues::single(value.into())),
    )
}

/// `$push` with `$each`
pub fn push_each<I, V>(field: impl Into<String>, values: I) -> UpdateOperator
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    UpdateOperator::new(
        "$push",
        field,
        UpdateValue::Array(ArrayValues::each(values.into_iter().map(Into::into).collect())),
    )
}

pub fn pop(field: impl Into<String>, position: PopPosition) -> UpdateOperator {
    let value = match position {
        PopPosition::First => -1,
        PopPosition::Last => 1,
    };
    UpdateOperator::new("$pop", field, UpdateValue::Value(Bson::Int32(value)))
}

/// `$pull` of every element equal to `value`
pub fn pull(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$pull", field, UpdateValue::Value(value.into()))
}

/// `$pull` of every element matching `conditions`
pub fn pull_matching<I>(field: impl Into<String>, conditions: I) -> UpdateOperator
where
    I: IntoIterator<Item = Filter>,
{
    UpdateOperator::new(
        "$pull",
        field,
        UpdateValue::PullMatching(conditions.into_iter().collect()),
    )
}

pub fn pull_all<I, V>(field: impl Into<String>, values: I) -> UpdateOperator
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    UpdateOperator::new(
        "$pullAll",
        field,
        UpdateValue::Value(Bson::Array(values.into_iter().map(Into::into).collect())),
    )
}

pub fn bit_and(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$bit", field, UpdateValue::Bit("and", value.into()))
}

pub fn bit_or(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$bit", field, UpdateValue::Bit("or", value.into()))
}

pub fn bit_xor(field: impl Into<String>, value: impl Into<Bson>) -> UpdateOperator {
    UpdateOperator::new("$bit", field, UpdateValue::Bit("xor", value.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::EntityModel;
    use crate::query::filters::gte;

    fn encode(updates: &[UpdateOperator]) -> Result<BsonDocument> {
        encode_updates(updates, &EncodeContext::detached())
    }

    #[test]
    fn test_grouped_by_operator() {
        let document = encode(&[set("a", 1), inc("n", 2), set("b", "x"), unset("c")]).unwrap();
        assert_eq!(
            document,
            doc! { "$set": { "a": 1, "b": "x" }, "$inc": { "n": 2 }, "$unset": { "c": "" } }
        );
    }

    #[test]
    fn test_empty_and_duplicate_rejected() {
        assert!(encode(&[]).is_err());
        let err = encode(&[set("a", 1), set("a", 2)]).unwrap_err();
        assert!(matches!(err, TesseraError::Query(_)));
        // same field under different operators is left to the server
        assert!(encode(&[set("a", 1), inc("a", 1)]).is_ok());
    }

    #[test]
    fn test_invalid_field_names_rejected() {
        let err = encode(&[set("$where", 1)]).unwrap_err();
        assert!(matches!(err, TesseraError::Validation(_)));
        assert!(encode(&[set("", 1)]).is_err());
        assert!(encode(&[set("items.$.qty", 1)]).is_ok());
    }

    #[test]
    fn test_dec() {
        assert_eq!(encode(&[dec("stock", 3)]).unwrap(), doc! { "$inc": { "stock": -3 } });
        assert_eq!(encode(&[dec("ratio", 0.5)]).unwrap(), doc! { "$inc": { "ratio": -0.5 } });
        assert!(encode(&[dec("stock", "three")]).is_err());
        assert!(matches!(encode(&[dec("stock", i32::MIN)]), Err(TesseraError::Query(_))));
        assert!(matches!(encode(&[dec("stock", i64::MIN)]), Err(TesseraError::Query(_))));
        assert_eq!(
            encode(&[dec("stock", i32::MAX)]).unwrap(),
            doc! { "$inc": { "stock": -i32::MAX } }
        );
    }

    #[test]
    fn test_current_date() {
        assert_eq!(
            encode(&[current_date("lastModified"), current_date("cancellation.date").timestamp()])
                .unwrap(),
            doc! {
                "$currentDate": {
                    "lastModified": true,
                    "cancellation.date": { "$type": "timestamp" }
                }
            }
        );
    }

    #[test]
    fn test_push_modifiers() {
        let update = push_each("quizzes", vec![doc! { "wk": 5, "score": 8 }])
            .sort_by([Sort::descending("score")])
            .slice(3);
        assert_eq!(
            encode(&[update]).unwrap(),
            doc! {
                "$push": {
                    "quizzes": {
                        "$each": [{ "wk": 5, "score": 8 }],
                        "$slice": 3,
                        "$sort": { "score": -1 }
                    }
                }
            }
        );

        // a single value with a modifier still needs $each
        let update = push("scores", 89).position(0);
        assert_eq!(
            encode(&[update]).unwrap(),
            doc! { "$push": { "scores": { "$each": [89], "$position": 0 } } }
        );
        assert_eq!(encode(&[push("scores", 89)]).unwrap(), doc! { "$push": { "scores": 89 } });
    }

    #[test]
    fn test_add_to_set_each() {
        assert_eq!(
            encode(&[add_to_set_each("tags", ["camera", "electronics"])]).unwrap(),
            doc! { "$addToSet": { "tags": { "$each": ["camera", "electronics"] } } }
        );
        // modifiers other than $each are push-only
        assert_eq!(
            encode(&[add_to_set("tags", "camera").slice(2)]).unwrap(),
            doc! { "$addToSet": { "tags": "camera" } }
        );
    }

    #[test]
    fn test_pop_pull_bit() {
        assert_eq!(
            encode(&[pop("scores", PopPosition::First)]).unwrap(),
            doc! { "$pop": { "scores": -1 } }
        );
        assert_eq!(
            encode(&[pull_matching("votes", [gte("", 6)])]).unwrap(),
            doc! { "$pull": { "votes": { "$gte": 6 } } }
        );
        assert_eq!(
            encode(&[pull_all("scores", [0, 5])]).unwrap(),
            doc! { "$pullAll": { "scores": [0, 5] } }
        );
        assert_eq!(
            encode(&[bit_and("expdata", 10)]).unwrap(),
            doc! { "$bit": { "expdata": { "and": 10 } } }
        );
    }

    #[test]
    fn test_paths_translated() {
        let model = EntityModel::builder("Employee")
            .mapped_property("firstName", "first_name")
            .mapped_property("salary", "pay")
            .build();
        let ctx = EncodeContext::new(&model, true);
        let document =
            encode_updates(&[set("firstName", "Ada"), rename("salary", "wage")], &ctx).unwrap();
        assert_eq!(
            document,
            doc! { "$set": { "first_name": "Ada" }, "$rename": { "pay": "wage" } }
        );
        assert!(encode_updates(&[set("unknown", 1)], &ctx).is_err());
    }
}

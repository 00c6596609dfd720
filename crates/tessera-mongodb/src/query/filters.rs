//! Query filters
//!
//! Each constructor builds one [`Filter`]; [`combine`] turns a list of them
//! into the filter document sent to the server.
//!
//! ```ignore
//! use tessera_mongodb::query::filters::{eq, gte, regex};
//!
//! let filters = [eq("gameId", "G1"), gte("score", 30), regex("playerId", "^PlayerA").options("i")];
//! // { "gameId": "G1", "score": { "$gte": 30 }, "playerId": { "$regex": "^PlayerA", "$options": "i" } }
//! ```

use std::collections::HashSet;

use bson::{Bson, Document as BsonDocument};
use tessera_common::TesseraError;

use crate::aggregation::expressions::Expression;
use crate::encode::EncodeContext;
use crate::Result;

/// Field-level query operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal; written as `{ field: value }` unless negated
    Eq,
    /// Not equal
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Value in list
    In,
    /// Value not in list
    Nin,
    /// Field presence
    Exists,
    /// BSON type check
    Type,
    /// Array length
    Size,
    /// Array contains all values
    All,
    /// Modulo with remainder
    Mod,
    BitsAllSet,
    BitsAnySet,
    BitsAllClear,
    BitsAnyClear,
}

impl FilterOperator {
    /// Returns the server operator name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "$eq",
            FilterOperator::Ne => "$ne",
            FilterOperator::Gt => "$gt",
            FilterOperator::Gte => "$gte",
            FilterOperator::Lt => "$lt",
            FilterOperator::Lte => "$lte",
            FilterOperator::In => "$in",
            FilterOperator::Nin => "$nin",
            FilterOperator::Exists => "$exists",
            FilterOperator::Type => "$type",
            FilterOperator::Size => "$size",
            FilterOperator::All => "$all",
            FilterOperator::Mod => "$mod",
            FilterOperator::BitsAllSet => "$bitsAllSet",
            FilterOperator::BitsAnySet => "$bitsAnySet",
            FilterOperator::BitsAllClear => "$bitsAllClear",
            FilterOperator::BitsAnyClear => "$bitsAnyClear",
        }
    }
}

/// Logical combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Nor,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "$and",
            LogicalOperator::Or => "$or",
            LogicalOperator::Nor => "$nor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterKind {
    Field {
        field: String,
        operator: FilterOperator,
        value: Bson,
    },
    Regex {
        field: String,
        pattern: String,
        options: Option<String>,
    },
    ElemMatch {
        field: String,
        filters: Vec<Filter>,
    },
    Logical {
        operator: LogicalOperator,
        filters: Vec<Filter>,
    },
    Expr(Expression),
    Text {
        search: String,
        language: Option<String>,
        case_sensitive: Option<bool>,
        diacritic_sensitive: Option<bool>,
    },
    Where(String),
    JsonSchema(BsonDocument),
    Comment(String),
}

/// A single query filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    kind: FilterKind,
    negated: bool,
}

impl Filter {
    fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            negated: false,
        }
    }

    fn field(field: impl Into<String>, operator: FilterOperator, value: impl Into<Bson>) -> Self {
        Self::new(FilterKind::Field {
            field: field.into(),
            operator,
            value: value.into(),
        })
    }

    /// Wrap the operator in `$not`. Only field filters can be negated.
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Operator name at the top of the encoded filter, for validation
    pub fn operator_name(&self) -> &'static str {
        match &self.kind {
            FilterKind::Field { operator, .. } => operator.as_str(),
            FilterKind::Regex { .. } => "$regex",
            FilterKind::ElemMatch { .. } => "$elemMatch",
            FilterKind::Logical { operator, .. } => operator.as_str(),
            FilterKind::Expr(_) => "$expr",
            FilterKind::Text { .. } => "$text",
            FilterKind::Where(_) => "$where",
            FilterKind::JsonSchema(_) => "$jsonSchema",
            FilterKind::Comment(_) => "$comment",
        }
    }

    /// Regex flags (`i`, `m`, `x`, `s`); ignored by other filters
    pub fn options(mut self, flags: impl Into<String>) -> Self {
        if let FilterKind::Regex { ref mut options, .. } = self.kind {
            *options = Some(flags.into());
        }
        self
    }

    /// Text search language; ignored by other filters
    pub fn language(mut self, value: impl Into<String>) -> Self {
        if let FilterKind::Text { ref mut language, .. } = self.kind {
            *language = Some(value.into());
        }
        self
    }

    /// Case sensitive text search; ignored by other filters
    pub fn case_sensitive(mut self, value: bool) -> Self {
        if let FilterKind::Text {
            ref mut case_sensitive,
            ..
        } = self.kind
        {
            *case_sensitive = Some(value);
        }
        self
    }

    /// Diacritic sensitive text search; ignored by other filters
    pub fn diacritic_sensitive(mut self, value: bool) -> Self {
        if let FilterKind::Text {
            ref mut diacritic_sensitive,
            ..
        } = self.kind
        {
            *diacritic_sensitive = Some(value);
        }
        self
    }

    /// Encode this filter, translating field names through `ctx`
    pub fn encode(&self, ctx: &EncodeContext<'_>) -> Result<BsonDocument> {
        let mut out = BsonDocument::new();
        match &self.kind {
            FilterKind::Field {
                field,
                operator,
                value,
            } => {
                let path = field_path(ctx, field)?;
                if *operator == FilterOperator::Eq && !self.negated {
                    out.insert(path, value.clone());
                } else {
                    let mut body = BsonDocument::new();
                    body.insert(operator.as_str(), value.clone());
                    out.insert(path, self.negate(body));
                }
            }
            FilterKind::Regex {
                field,
                pattern,
                options,
            } => {
                let mut body = BsonDocument::new();
                body.insert("$regex", pattern.clone());
                if let Some(options) = options {
                    body.insert("$options", options.clone());
                }
                out.insert(field_path(ctx, field)?, self.negate(body));
            }
            FilterKind::ElemMatch { field, filters } => {
                let body = element_conditions(filters, &ctx.nested(field))?;
                let mut elem_match = BsonDocument::new();
                elem_match.insert("$elemMatch", body);
                out.insert(field_path(ctx, field)?, self.negate(elem_match));
            }
            FilterKind::Logical { operator, filters } => {
                self.reject_negation()?;
                let encoded = filters
                    .iter()
                    .map(|f| f.encode(ctx).map(Bson::Document))
                    .collect::<Result<Vec<_>>>()?;
                out.insert(operator.as_str(), encoded);
            }
            FilterKind::Expr(expression) => {
                self.reject_negation()?;
                out.insert("$expr", expression.encode(ctx));
            }
            FilterKind::Text {
                search,
                language,
                case_sensitive,
                diacritic_sensitive,
            } => {
                self.reject_negation()?;
                let mut body = BsonDocument::new();
                body.insert("$search", search.clone());
                if let Some(language) = language {
                    body.insert("$language", language.clone());
                }
                if let Some(value) = case_sensitive {
                    body.insert("$caseSensitive", *value);
                }
                if let Some(value) = diacritic_sensitive {
                    body.insert("$diacriticSensitive", *value);
                }
                out.insert("$text", body);
            }
            FilterKind::Where(code) => {
                self.reject_negation()?;
                out.insert("$where", code.clone());
            }
            FilterKind::JsonSchema(schema) => {
                self.reject_negation()?;
                out.insert("$jsonSchema", schema.clone());
            }
            FilterKind::Comment(comment) => {
                self.reject_negation()?;
                out.insert("$comment", comment.clone());
            }
        }
        Ok(out)
    }

    fn reject_negation(&self) -> Result<()> {
        if self.negated {
            return Err(TesseraError::Query(format!(
                "{} filters cannot be negated",
                self.operator_name()
            )));
        }
        Ok(())
    }

    fn negate(&self, body: BsonDocument) -> BsonDocument {
        if self.negated {
            let mut not = BsonDocument::new();
            not.insert("$not", body);
            not
        } else {
            body
        }
    }
}

fn field_path(ctx: &EncodeContext<'_>, field: &str) -> Result<String> {
    if field.is_empty() {
        Ok(String::new())
    } else {
        ctx.path(field)
    }
}

/// Conditions on array elements (`$elemMatch`, `$pull`).
///
/// Filters with an empty field name apply to the element itself, so their
/// operators are lifted to the top level: `gte("", 80)` gives `{ $gte: 80 }`.
pub(crate) fn element_conditions(
    filters: &[Filter],
    ctx: &EncodeContext<'_>,
) -> Result<BsonDocument> {
    let mut body = BsonDocument::new();
    for filter in filters {
        for (key, value) in filter.encode(ctx)? {
            match (key.is_empty(), value) {
                (true, Bson::Document(conditions)) => body.extend(conditions),
                (_, value) => {
                    body.insert(key, value);
                }
            }
        }
    }
    Ok(body)
}

/// Encode a list of filters into one filter document.
///
/// Filters are merged into a single document when their top-level keys are
/// distinct; otherwise they are wrapped in `$and`.
pub fn combine(filters: &[Filter], ctx: &EncodeContext<'_>) -> Result<BsonDocument> {
    let encoded = filters
        .iter()
        .map(|f| f.encode(ctx))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    let distinct = encoded
        .iter()
        .flat_map(|document| document.keys())
        .all(|key| seen.insert(key.as_str()));

    if distinct {
        Ok(encoded.into_iter().fold(BsonDocument::new(), |mut acc, d| {
            acc.extend(d);
            acc
        }))
    } else {
        let mut out = BsonDocument::new();
        out.insert(
            "$and",
            encoded.into_iter().map(Bson::Document).collect::<Vec<_>>(),
        );
        Ok(out)
    }
}

pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::Eq, value)
}

pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::Ne, value)
}

pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::Gt, value)
}

pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::Gte, value)
}

pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::Lt, value)
}

pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::Lte, value)
}

pub fn in_<I, V>(field: impl Into<String>, values: I) -> Filter
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    Filter::field(field, FilterOperator::In, to_array(values))
}

pub fn nin<I, V>(field: impl Into<String>, values: I) -> Filter
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    Filter::field(field, FilterOperator::Nin, to_array(values))
}

/// `{ field: { $exists: true } }`; use [`Filter::not`] for absence
pub fn exists(field: impl Into<String>) -> Filter {
    Filter::field(field, FilterOperator::Exists, true)
}

/// `$type` with a type alias (`"string"`) or number
pub fn type_(field: impl Into<String>, bson_type: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::Type, bson_type)
}

pub fn size(field: impl Into<String>, len: i32) -> Filter {
    Filter::field(field, FilterOperator::Size, len)
}

pub fn all<I, V>(field: impl Into<String>, values: I) -> Filter
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    Filter::field(field, FilterOperator::All, to_array(values))
}

/// `$elemMatch`. Conditions built with an empty field name (`gte("", 80)`)
/// apply to the array element itself.
pub fn elem_match<I>(field: impl Into<String>, filters: I) -> Filter
where
    I: IntoIterator<Item = Filter>,
{
    Filter::new(FilterKind::ElemMatch {
        field: field.into(),
        filters: filters.into_iter().collect(),
    })
}

/// `$regex`; add flags with [`Filter::options`]
pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Filter {
    Filter::new(FilterKind::Regex {
        field: field.into(),
        pattern: pattern.into(),
        options: None,
    })
}

pub fn mod_(field: impl Into<String>, divisor: i64, remainder: i64) -> Filter {
    Filter::field(
        field,
        FilterOperator::Mod,
        Bson::Array(vec![Bson::Int64(divisor), Bson::Int64(remainder)]),
    )
}

/// `$bitsAllSet`: a numeric mask, BinData, or array of bit positions
pub fn bits_all_set(field: impl Into<String>, mask: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::BitsAllSet, mask)
}

pub fn bits_any_set(field: impl Into<String>, mask: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::BitsAnySet, mask)
}

pub fn bits_all_clear(field: impl Into<String>, mask: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::BitsAllClear, mask)
}

pub fn bits_any_clear(field: impl Into<String>, mask: impl Into<Bson>) -> Filter {
    Filter::field(field, FilterOperator::BitsAnyClear, mask)
}

pub fn and<I>(filters: I) -> Filter
where
    I: IntoIterator<Item = Filter>,
{
    logical(LogicalOperator::And, filters)
}

pub fn or<I>(filters: I) -> Filter
where
    I: IntoIterator<Item = Filter>,
{
    logical(LogicalOperator::Or, filters)
}

pub fn nor<I>(filters: I) -> Filter
where
    I: IntoIterator<Item = Filter>,
{
    logical(LogicalOperator::Nor, filters)
}

/// `$expr`: an aggregation expression evaluated per document
pub fn expr(expression: impl Into<Expression>) -> Filter {
    Filter::new(FilterKind::Expr(expression.into()))
}

/// `$text` search; see [`Filter::language`] and friends for options
pub fn text(search: impl Into<String>) -> Filter {
    Filter::new(FilterKind::Text {
        search: search.into(),
        language: None,
        case_sensitive: None,
        diacritic_sensitive: None,
    })
}

/// `$where` with a JavaScript predicate; rejected unless JavaScript is allowed
pub fn where_(code: impl Into<String>) -> Filter {
    Filter::new(FilterKind::Where(code.into()))
}

pub fn json_schema(schema: BsonDocument) -> Filter {
    Filter::new(FilterKind::JsonSchema(schema))
}

pub fn comment(comment: impl Into<String>) -> Filter {
    Filter::new(FilterKind::Comment(comment.into()))
}

fn logical<I>(operator: LogicalOperator, filters: I) -> Filter
where
    I: IntoIterator<Item = Filter>,
{
    Filter::new(FilterKind::Logical {
        operator,
        filters: filters.into_iter().collect(),
    })
}

fn to_array<I, V>(values: I) -> Bson
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    Bson::Array(values.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::expressions::comparison;
    use crate::mapping::EntityModel;
    use bson::doc;

    fn detached() -> EncodeContext<'static> {
        EncodeContext::detached()
    }

    #[test]
    fn test_eq_is_plain_value() {
        assert_eq!(eq("name", "Ava").encode(&detached()).unwrap(), doc! { "name": "Ava" });
    }

    #[test]
    fn test_field_operators() {
        assert_eq!(gte("score", 30).encode(&detached()).unwrap(), doc! { "score": { "$gte": 30 } });
        assert_eq!(
            in_("tags", ["a", "b"]).encode(&detached()).unwrap(),
            doc! { "tags": { "$in": ["a", "b"] } }
        );
        assert_eq!(
            mod_("qty", 4, 0).encode(&detached()).unwrap(),
            doc! { "qty": { "$mod": [4_i64, 0_i64] } }
        );
        assert_eq!(
            bits_all_set("flags", vec![1, 5]).encode(&detached()).unwrap(),
            doc! { "flags": { "$bitsAllSet": [1, 5] } }
        );
    }

    #[test]
    fn test_negation() {
        assert_eq!(
            gt("price", 1).not().encode(&detached()).unwrap(),
            doc! { "price": { "$not": { "$gt": 1 } } }
        );
        assert_eq!(
            eq("price", 1).not().encode(&detached()).unwrap(),
            doc! { "price": { "$not": { "$eq": 1 } } }
        );
        assert_eq!(
            exists("email").not().encode(&detached()).unwrap(),
            doc! { "email": { "$not": { "$exists": true } } }
        );
        assert!(or([eq("a", 1)]).not().encode(&detached()).is_err());
    }

    #[test]
    fn test_regex_options() {
        assert_eq!(
            regex("name", "^ac").options("i").encode(&detached()).unwrap(),
            doc! { "name": { "$regex": "^ac", "$options": "i" } }
        );
    }

    #[test]
    fn test_elem_match_operator_only() {
        let filter = elem_match("results", [gte("", 80), lt("", 85)]);
        assert_eq!(
            filter.encode(&detached()).unwrap(),
            doc! { "results": { "$elemMatch": { "$gte": 80, "$lt": 85 } } }
        );
    }

    #[test]
    fn test_elem_match_translates_embedded_paths() {
        let line = EntityModel::builder("Line").mapped_property("product", "sku").build();
        let model = EntityModel::builder("Order").embedded("lines", line).build();
        let ctx = EncodeContext::new(&model, true);
        let filter = elem_match("lines", [eq("product", "xyz"), gte("qty", 5)]);
        // qty is unknown on Line, so validation fails
        assert!(filter.encode(&ctx).is_err());

        let filter = elem_match("lines", [eq("product", "xyz")]);
        assert_eq!(
            filter.encode(&ctx).unwrap(),
            doc! { "lines": { "$elemMatch": { "sku": "xyz" } } }
        );
    }

    #[test]
    fn test_logical_and_text() {
        let filter = or([lt("qty", 20), eq("sale", true)]);
        assert_eq!(
            filter.encode(&detached()).unwrap(),
            doc! { "$or": [{ "qty": { "$lt": 20 } }, { "sale": true }] }
        );

        let search = text("coffee").language("es").case_sensitive(true);
        assert_eq!(
            search.encode(&detached()).unwrap(),
            doc! { "$text": { "$search": "coffee", "$language": "es", "$caseSensitive": true } }
        );
    }

    #[test]
    fn test_expr() {
        let filter = expr(comparison::gt("$spent", "$budget"));
        assert_eq!(
            filter.encode(&detached()).unwrap(),
            doc! { "$expr": { "$gt": ["$spent", "$budget"] } }
        );
    }

    #[test]
    fn test_combine_merges_distinct_keys() {
        let filters = [eq("gameId", "G1"), gte("score", 30)];
        assert_eq!(
            combine(&filters, &detached()).unwrap(),
            doc! { "gameId": "G1", "score": { "$gte": 30 } }
        );
        assert_eq!(combine(&[], &detached()).unwrap(), doc! {});
    }

    #[test]
    fn test_combine_duplicate_keys_use_and() {
        let filters = [gte("score", 30), lte("score", 90)];
        assert_eq!(
            combine(&filters, &detached()).unwrap(),
            doc! { "$and": [{ "score": { "$gte": 30 } }, { "score": { "$lte": 90 } }] }
        );
    }

    #[test]
    fn test_paths_translated_and_validated() {
        let model = EntityModel::builder("Game")
            .mapped_property("gameId", "game_id")
            .build();
        let ctx = EncodeContext::new(&model, true);
        assert_eq!(eq("gameId", "G1").encode(&ctx).unwrap(), doc! { "game_id": "G1" });
        assert!(eq("missing", 1).encode(&ctx).is_err());
        assert_eq!(
            eq("missing", 1).encode(&ctx.lenient()).unwrap(),
            doc! { "missing": 1 }
        );
    }
}

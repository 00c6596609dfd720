//! Aggregation expressions
//!
//! An [`Expression`] is a small value tree that encodes to the BSON form of a
//! single pipeline operator. Builder functions live in one module per operator
//! family (`accumulator`, `arithmetic`, `array`, ...) and mostly do nothing but
//! pick the operator name and argument shape.
//!
//! ```ignore
//! use tessera_mongodb::aggregation::expressions::{accumulator, array};
//!
//! let top_three = accumulator::first_n(3, array::array(["$playerId", "$score"]));
//! // { "$firstN": { "input": ["$playerId", "$score"], "n": 3 } }
//! ```

pub mod accumulator;
pub mod arithmetic;
pub mod array;
pub mod boolean;
pub mod comparison;
pub mod conditional;
pub mod date;
pub mod object;
pub mod set;
pub mod string;
pub mod types;

use bson::{oid::ObjectId, Bson, Document as BsonDocument};

use crate::encode::EncodeContext;

/// An aggregation expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A constant written as-is; strings starting with `$` act as field paths
    Value(Bson),
    /// A field reference, translated through the entity model when encoded
    Field(String),
    /// An expression object: `{ name: <expr>, ... }`
    Document(DocumentExpression),
    /// An array whose items are expressions
    Array(Vec<Expression>),
    /// A `$operator` application
    Operation(Operation),
}

/// A named operator with its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    name: &'static str,
    args: Args,
}

/// Argument shapes an operator can take
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    /// `{ $op: <expr> }`
    Single(Box<Expression>),
    /// `{ $op: [<expr>, ...] }`
    List(Vec<Expression>),
    /// `{ $op: { key: <expr>, ... } }`; keys are written in order
    Named(Vec<(&'static str, Expression)>),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &Args {
        &self.args
    }
}

impl Expression {
    /// `{ name: <arg> }`
    pub fn single(name: &'static str, arg: impl Into<Expression>) -> Self {
        Self::op(name, Args::Single(Box::new(arg.into())))
    }

    /// `{ name: [args...] }`
    pub fn list<I, E>(name: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        Self::op(name, Args::List(args.into_iter().map(Into::into).collect()))
    }

    pub fn named(name: &'static str, args: Vec<(&'static str, Expression)>) -> Self {
        Self::op(name, Args::Named(args))
    }

    pub fn op(name: &'static str, args: Args) -> Self {
        Expression::Operation(Operation { name, args })
    }

    /// Operator name, if this is an operator application
    pub fn operator(&self) -> Option<&'static str> {
        match self {
            Expression::Operation(op) => Some(op.name),
            _ => None,
        }
    }

    /// Add a named argument to an operator built with [`Expression::named`].
    ///
    /// Used by the optional-argument setters (`timezone`, `place`, ...).
    /// A repeated key replaces the earlier value. Other expressions are
    /// returned unchanged.
    pub fn with_arg(mut self, key: &'static str, value: impl Into<Expression>) -> Self {
        if let Expression::Operation(Operation {
            args: Args::Named(ref mut args),
            ..
        }) = self
        {
            let value = value.into();
            match args.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => args.push((key, value)),
            }
        }
        self
    }

    /// Encode with field references translated through `ctx`
    pub fn encode(&self, ctx: &EncodeContext<'_>) -> Bson {
        match self {
            Expression::Value(value) => value.clone(),
            Expression::Field(path) => Bson::String(ctx.field_ref(path)),
            Expression::Document(document) => Bson::Document(document.encode(ctx)),
            Expression::Array(items) => {
                Bson::Array(items.iter().map(|item| item.encode(ctx)).collect())
            }
            Expression::Operation(op) => {
                let mut out = BsonDocument::new();
                out.insert(op.name, op.args.encode(ctx));
                Bson::Document(out)
            }
        }
    }

    /// Encode without a model
    pub fn to_bson(&self) -> Bson {
        self.encode(&EncodeContext::detached())
    }
}

impl Args {
    fn encode(&self, ctx: &EncodeContext<'_>) -> Bson {
        match self {
            Args::Single(arg) => arg.encode(ctx),
            Args::List(args) => Bson::Array(args.iter().map(|a| a.encode(ctx)).collect()),
            Args::Named(args) => {
                let mut out = BsonDocument::new();
                for (key, value) in args {
                    out.insert(*key, value.encode(ctx));
                }
                Bson::Document(out)
            }
        }
    }
}

/// An expression object built field by field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentExpression {
    fields: Vec<(String, Expression)>,
}

impl DocumentExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field; a repeated name replaces the earlier value in place
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    pub fn fields(&self) -> &[(String, Expression)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn encode(&self, ctx: &EncodeContext<'_>) -> BsonDocument {
        let mut out = BsonDocument::new();
        for (name, value) in &self.fields {
            out.insert(name.clone(), value.encode(ctx));
        }
        out
    }
}

impl From<DocumentExpression> for Expression {
    fn from(document: DocumentExpression) -> Self {
        Expression::Document(document)
    }
}

impl From<Bson> for Expression {
    fn from(value: Bson) -> Self {
        Expression::Value(value)
    }
}

impl From<BsonDocument> for Expression {
    fn from(value: BsonDocument) -> Self {
        Expression::Value(Bson::Document(value))
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Value(Bson::String(value.to_string()))
    }
}

impl From<String> for Expression {
    fn from(value: String) -> Self {
        Expression::Value(Bson::String(value))
    }
}

impl From<i32> for Expression {
    fn from(value: i32) -> Self {
        Expression::Value(Bson::Int32(value))
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Value(Bson::Int64(value))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Value(Bson::Double(value))
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Value(Bson::Boolean(value))
    }
}

impl From<ObjectId> for Expression {
    fn from(value: ObjectId) -> Self {
        Expression::Value(Bson::ObjectId(value))
    }
}

impl<E: Into<Expression>> From<Vec<E>> for Expression {
    fn from(items: Vec<E>) -> Self {
        Expression::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Reference a field by property path: `field("score")` → `"$score"`
pub fn field(path: impl Into<String>) -> Expression {
    Expression::Field(path.into())
}

/// A constant value
pub fn value(value: impl Into<Bson>) -> Expression {
    Expression::Value(value.into())
}

/// `$literal`: a value the server must not evaluate
pub fn literal(value: impl Into<Bson>) -> Expression {
    Expression::single("$literal", Expression::Value(value.into()))
}

/// Start an expression object
pub fn document() -> DocumentExpression {
    DocumentExpression::new()
}

/// `$let`: bind variables for use in `in_`
pub fn let_(vars: DocumentExpression, in_: impl Into<Expression>) -> Expression {
    Expression::named("$let", vec![("vars", vars.into()), ("in", in_.into())])
}

/// `$meta`: e.g. `"textScore"`, `"indexKey"`
pub fn meta(keyword: &str) -> Expression {
    Expression::single("$meta", keyword)
}

/// `$rand`: a float in [0, 1)
pub fn rand() -> Expression {
    Expression::named("$rand", Vec::new())
}

/// Every operator name an expression builder can produce, sorted
pub const EXPRESSION_OPERATORS: &[&str] = &[
    "$abs", "$accumulator", "$add", "$addToSet", "$allElementsTrue", "$and",
    "$anyElementTrue", "$arrayElemAt", "$arrayToObject", "$avg", "$bottom",
    "$bottomN", "$ceil", "$cmp", "$concat", "$concatArrays", "$cond", "$convert",
    "$count", "$dateAdd", "$dateDiff", "$dateFromParts", "$dateFromString",
    "$dateToString", "$dateTrunc", "$dayOfMonth", "$dayOfWeek", "$dayOfYear",
    "$divide", "$eq", "$exp", "$filter", "$first", "$firstN", "$floor",
    "$function", "$getField", "$gt", "$gte", "$hour", "$ifNull", "$in",
    "$indexOfArray", "$indexOfBytes", "$indexOfCP", "$isArray", "$isNumber",
    "$last", "$lastN", "$let", "$literal", "$ln", "$log", "$log10", "$lt", "$lte",
    "$ltrim", "$map", "$max", "$maxN", "$mergeObjects", "$meta", "$millisecond",
    "$min", "$minN", "$minute", "$mod", "$month", "$multiply", "$ne", "$not",
    "$objectToArray", "$or", "$pow", "$push", "$rand", "$range", "$reduce",
    "$regexFind", "$regexFindAll", "$regexMatch", "$replaceAll", "$replaceOne",
    "$reverseArray", "$round", "$rtrim", "$second", "$setDifference",
    "$setEquals", "$setField", "$setIntersection", "$setIsSubset", "$setUnion",
    "$size", "$slice", "$sortArray", "$split", "$sqrt", "$stdDevPop",
    "$stdDevSamp", "$strLenBytes", "$strLenCP", "$strcasecmp", "$substr",
    "$substrBytes", "$substrCP", "$subtract", "$sum", "$switch", "$toBool",
    "$toDate", "$toDecimal", "$toDouble", "$toInt", "$toLong", "$toLower",
    "$toObjectId", "$toString", "$toUpper", "$top", "$topN", "$trim", "$trunc",
    "$type", "$unsetField", "$week", "$year", "$zip",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::EntityModel;
    use bson::{bson, doc};

    #[test]
    fn test_value_and_field() {
        assert_eq!(Expression::from("$score").to_bson(), bson!("$score"));
        assert_eq!(field("score").to_bson(), bson!("$score"));
        assert_eq!(value(5).to_bson(), bson!(5));
    }

    #[test]
    fn test_field_translated_through_model() {
        let model = EntityModel::builder("Game")
            .mapped_property("gameId", "game_id")
            .build();
        let ctx = EncodeContext::new(&model, true);
        assert_eq!(field("gameId").encode(&ctx), bson!("$game_id"));
        // plain strings are never rewritten
        assert_eq!(Expression::from("$gameId").encode(&ctx), bson!("$gameId"));
    }

    #[test]
    fn test_single_and_list_shapes() {
        assert_eq!(Expression::single("$sum", "$a").to_bson(), bson!({ "$sum": "$a" }));
        // a vector argument becomes an array expression
        assert_eq!(
            Expression::single("$sum", vec!["$a", "$b"]).to_bson(),
            bson!({ "$sum": ["$a", "$b"] })
        );
        assert_eq!(
            Expression::list("$add", [field("a"), 2.into()]).to_bson(),
            bson!({ "$add": ["$a", 2] })
        );
    }

    #[test]
    fn test_document_expression_replaces_duplicates() {
        let d = document().field("a", 1).field("b", 2).field("a", 3);
        assert_eq!(Expression::from(d).to_bson(), bson!({ "a": 3, "b": 2 }));
    }

    #[test]
    fn test_with_arg_on_named() {
        let e = Expression::named("$round", vec![("x", 1.into())]).with_arg("place", 2);
        assert_eq!(e.to_bson(), bson!({ "$round": { "x": 1, "place": 2 } }));
        // ignored for other shapes
        let s = Expression::single("$abs", 1).with_arg("place", 2);
        assert_eq!(s.to_bson(), bson!({ "$abs": 1 }));
    }

    #[test]
    fn test_let_literal_meta_rand() {
        let e = let_(document().field("total", field("price")), "$$total");
        assert_eq!(
            e.to_bson(),
            bson!({ "$let": { "vars": { "total": "$price" }, "in": "$$total" } })
        );
        assert_eq!(literal("$1").to_bson(), bson!({ "$literal": "$1" }));
        assert_eq!(meta("textScore").to_bson(), bson!({ "$meta": "textScore" }));
        assert_eq!(rand().to_bson(), Bson::Document(doc! { "$rand": {} }));
    }

    #[test]
    fn test_operator_list_sorted_and_unique() {
        let mut sorted = EXPRESSION_OPERATORS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, EXPRESSION_OPERATORS);
    }
}

//! Accumulator expressions
//!
//! Used as field values in `$group`, `$bucket`, `$bucketAuto` and
//! `$setWindowFields`; several also work as plain expressions in `$project`.

use bson::{Bson, Document as BsonDocument};

use super::Expression;
use crate::query::Sort;

/// `$accumulator`: a user-defined JavaScript accumulator.
///
/// Rejected by pipeline validation unless JavaScript is allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    init: String,
    init_args: Option<Vec<Expression>>,
    accumulate: String,
    accumulate_args: Vec<Expression>,
    merge: String,
    finalize: Option<String>,
    lang: String,
}

impl Accumulator {
    /// Arguments passed to the init function
    pub fn init_args<I, E>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        self.init_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Function run on the final state
    pub fn finalize(mut self, function: impl Into<String>) -> Self {
        self.finalize = Some(function.into());
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

impl From<Accumulator> for Expression {
    fn from(acc: Accumulator) -> Self {
        let mut args = vec![("init", Expression::from(acc.init))];
        if let Some(init_args) = acc.init_args {
            args.push(("initArgs", Expression::Array(init_args)));
        }
        args.push(("accumulate", acc.accumulate.into()));
        args.push(("accumulateArgs", Expression::Array(acc.accumulate_args)));
        args.push(("merge", acc.merge.into()));
        if let Some(finalize) = acc.finalize {
            args.push(("finalize", finalize.into()));
        }
        args.push(("lang", acc.lang.into()));
        Expression::named("$accumulator", args)
    }
}

/// `$accumulator`
pub fn accumulator<I, E>(
    init: impl Into<String>,
    accumulate: impl Into<String>,
    accumulate_args: I,
    merge: impl Into<String>,
) -> Accumulator
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Accumulator {
        init: init.into(),
        init_args: None,
        accumulate: accumulate.into(),
        accumulate_args: accumulate_args.into_iter().map(Into::into).collect(),
        merge: merge.into(),
        finalize: None,
        lang: "js".to_string(),
    }
}

/// `$addToSet`: unique values per group, in no defined order
pub fn add_to_set(value: impl Into<Expression>) -> Expression {
    Expression::single("$addToSet", value)
}

/// `$avg`: pass a `Vec` to average several expressions
pub fn avg(value: impl Into<Expression>) -> Expression {
    Expression::single("$avg", value)
}

/// `$bottom`: the last element of the group under `sort_by`
pub fn bottom<I>(output: impl Into<Expression>, sort_by: I) -> Expression
where
    I: IntoIterator<Item = Sort>,
{
    Expression::named(
        "$bottom",
        vec![("output", output.into()), ("sortBy", sort_spec(sort_by))],
    )
}

/// `$bottomN`: the last `n` elements of the group under `sort_by`
pub fn bottom_n<I>(n: impl Into<Expression>, output: impl Into<Expression>, sort_by: I) -> Expression
where
    I: IntoIterator<Item = Sort>,
{
    Expression::named(
        "$bottomN",
        vec![
            ("output", output.into()),
            ("sortBy", sort_spec(sort_by)),
            ("n", n.into()),
        ],
    )
}

/// `$count`: number of documents in the group
pub fn count() -> Expression {
    Expression::named("$count", Vec::new())
}

/// `$first`: value from the first document of the group
pub fn first(value: impl Into<Expression>) -> Expression {
    Expression::single("$first", value)
}

/// `$firstN`: the first `n` values of the group
pub fn first_n(n: impl Into<Expression>, input: impl Into<Expression>) -> Expression {
    n_expression("$firstN", n, input)
}

/// `$function`: a custom JavaScript function.
///
/// Rejected by pipeline validation unless JavaScript is allowed.
pub fn function<I, E>(body: impl Into<String>, args: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    let body: String = body.into();
    Expression::named(
        "$function",
        vec![
            ("body", body.into()),
            ("args", Expression::Array(args.into_iter().map(Into::into).collect())),
            ("lang", "js".into()),
        ],
    )
}

/// `$last`: value from the last document of the group
pub fn last(value: impl Into<Expression>) -> Expression {
    Expression::single("$last", value)
}

/// `$lastN`: the last `n` values of the group
pub fn last_n(n: impl Into<Expression>, input: impl Into<Expression>) -> Expression {
    n_expression("$lastN", n, input)
}

/// `$max`
pub fn max(value: impl Into<Expression>) -> Expression {
    Expression::single("$max", value)
}

/// `$maxN`: the `n` largest values
pub fn max_n(n: impl Into<Expression>, input: impl Into<Expression>) -> Expression {
    n_expression("$maxN", n, input)
}

/// `$min`
pub fn min(value: impl Into<Expression>) -> Expression {
    Expression::single("$min", value)
}

/// `$minN`: the `n` smallest values
pub fn min_n(n: impl Into<Expression>, input: impl Into<Expression>) -> Expression {
    n_expression("$minN", n, input)
}

/// `$push`: all values of the group, in order.
///
/// Pass a [`document()`](super::document) to push one object per input
/// document.
pub fn push(value: impl Into<Expression>) -> Expression {
    Expression::single("$push", value)
}

/// `$stdDevPop`
pub fn std_dev_pop(value: impl Into<Expression>) -> Expression {
    Expression::single("$stdDevPop", value)
}

/// `$stdDevSamp`
pub fn std_dev_samp(value: impl Into<Expression>) -> Expression {
    Expression::single("$stdDevSamp", value)
}

/// `$sum`: non-numeric values are ignored; pass a `Vec` to add several
/// expressions per document
pub fn sum(value: impl Into<Expression>) -> Expression {
    Expression::single("$sum", value)
}

/// `$top`: the first element of the group under `sort_by`
pub fn top<I>(output: impl Into<Expression>, sort_by: I) -> Expression
where
    I: IntoIterator<Item = Sort>,
{
    Expression::named(
        "$top",
        vec![("output", output.into()), ("sortBy", sort_spec(sort_by))],
    )
}

/// `$topN`: the first `n` elements of the group under `sort_by`
pub fn top_n<I>(n: impl Into<Expression>, output: impl Into<Expression>, sort_by: I) -> Expression
where
    I: IntoIterator<Item = Sort>,
{
    Expression::named(
        "$topN",
        vec![
            ("output", output.into()),
            ("sortBy", sort_spec(sort_by)),
            ("n", n.into()),
        ],
    )
}

fn n_expression(
    name: &'static str,
    n: impl Into<Expression>,
    input: impl Into<Expression>,
) -> Expression {
    Expression::named(name, vec![("input", input.into()), ("n", n.into())])
}

/// All sort keys merged into one document, in the order given
fn sort_spec<I>(sorts: I) -> Expression
where
    I: IntoIterator<Item = Sort>,
{
    let mut spec = BsonDocument::new();
    for sort in sorts {
        spec.insert(sort.field().to_string(), sort.order_value());
    }
    Expression::Value(Bson::Document(spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::expressions::{array::array, comparison, conditional, document, field};
    use bson::bson;

    #[test]
    fn test_simple_accumulators() {
        assert_eq!(sum(1).to_bson(), bson!({ "$sum": 1 }));
        assert_eq!(sum(vec!["$a", "$b"]).to_bson(), bson!({ "$sum": ["$a", "$b"] }));
        assert_eq!(avg("$score").to_bson(), bson!({ "$avg": "$score" }));
        assert_eq!(add_to_set(field("tag")).to_bson(), bson!({ "$addToSet": "$tag" }));
        assert_eq!(count().to_bson(), bson!({ "$count": {} }));
    }

    #[test]
    fn test_first_n_with_array_input() {
        let e = first_n(3, array(["$playerId", "$score"]));
        assert_eq!(
            e.to_bson(),
            bson!({ "$firstN": { "input": ["$playerId", "$score"], "n": 3 } })
        );
    }

    #[test]
    fn test_first_n_with_computed_n() {
        let e = first_n(
            conditional::condition(comparison::eq("$gameId", "G2"), 1, 3),
            "$score",
        );
        assert_eq!(
            e.to_bson(),
            bson!({
                "$firstN": {
                    "input": "$score",
                    "n": { "$cond": { "if": { "$eq": ["$gameId", "G2"] }, "then": 1, "else": 3 } }
                }
            })
        );
    }

    #[test]
    fn test_top_merges_sorts() {
        let e = top(
            array(["$playerId", "$score"]),
            [Sort::descending("score"), Sort::ascending("playerId")],
        );
        assert_eq!(
            e.to_bson(),
            bson!({
                "$top": {
                    "output": ["$playerId", "$score"],
                    "sortBy": { "score": -1, "playerId": 1 }
                }
            })
        );
    }

    #[test]
    fn test_bottom_n() {
        let e = bottom_n(3, array(["$playerId", "$score"]), [Sort::descending("score")]);
        assert_eq!(
            e.to_bson(),
            bson!({
                "$bottomN": {
                    "output": ["$playerId", "$score"],
                    "sortBy": { "score": -1 },
                    "n": 3
                }
            })
        );
    }

    #[test]
    fn test_push_document() {
        let e = push(document().field("item", "$item").field("qty", "$quantity"));
        assert_eq!(
            e.to_bson(),
            bson!({ "$push": { "item": "$item", "qty": "$quantity" } })
        );
    }

    #[test]
    fn test_accumulator_argument_order() {
        let e: Expression = accumulator(
            "function() { return { count: 0, sum: 0 } }",
            "function(state, n) { return { count: state.count + 1, sum: state.sum + n } }",
            ["$copies"],
            "function(a, b) { return { count: a.count + b.count, sum: a.sum + b.sum } }",
        )
        .finalize("function(state) { return state.sum / state.count }")
        .into();

        let bson = e.to_bson();
        let body = bson.as_document().unwrap().get_document("$accumulator").unwrap();
        let keys: Vec<&str> = body.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["init", "accumulate", "accumulateArgs", "merge", "finalize", "lang"]
        );
        assert_eq!(body.get_str("lang").unwrap(), "js");
    }

    #[test]
    fn test_function() {
        let e = function("function(name) { return name.length }", [field("name")]);
        assert_eq!(
            e.to_bson(),
            bson!({
                "$function": {
                    "body": "function(name) { return name.length }",
                    "args": ["$name"],
                    "lang": "js"
                }
            })
        );
    }
}

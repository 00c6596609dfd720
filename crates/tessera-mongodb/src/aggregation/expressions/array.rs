//! Array expressions

use super::{Expression, DocumentExpression};

/// An array literal whose items are expressions
pub fn array<I, E>(items: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::Array(items.into_iter().map(Into::into).collect())
}

/// `$arrayElemAt`
pub fn array_elem_at(array: impl Into<Expression>, index: impl Into<Expression>) -> Expression {
    Expression::list("$arrayElemAt", [array.into(), index.into()])
}

/// `$arrayToObject`
pub fn array_to_object(array: impl Into<Expression>) -> Expression {
    Expression::single("$arrayToObject", array)
}

/// `$concatArrays`
pub fn concat_arrays<I, E>(arrays: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$concatArrays", arrays)
}

/// Alias of [`array_elem_at`]
pub fn element_at(array: impl Into<Expression>, index: impl Into<Expression>) -> Expression {
    array_elem_at(array, index)
}

/// `$filter`; `as_` and `limit` are optional
pub fn filter(input: impl Into<Expression>, cond: impl Into<Expression>) -> FilterExpression {
    FilterExpression {
        input: input.into(),
        cond: cond.into(),
        as_: None,
        limit: None,
    }
}

/// `$first` (array form)
pub fn first(array: impl Into<Expression>) -> Expression {
    Expression::single("$first", array)
}

/// `$in`: whether `value` is an element of `array`
pub fn in_(value: impl Into<Expression>, array: impl Into<Expression>) -> Expression {
    Expression::list("$in", [value.into(), array.into()])
}

/// `$indexOfArray`; `start`/`end` are optional
pub fn index_of_array(array: impl Into<Expression>, search: impl Into<Expression>) -> IndexOfArray {
    IndexOfArray {
        array: array.into(),
        search: search.into(),
        start: None,
        end: None,
    }
}

/// `$isArray`
pub fn is_array(value: impl Into<Expression>) -> Expression {
    Expression::list("$isArray", [value.into()])
}

/// `$last` (array form)
pub fn last(array: impl Into<Expression>) -> Expression {
    Expression::single("$last", array)
}

/// `$map`; `as_` is optional
pub fn map(input: impl Into<Expression>, in_: impl Into<Expression>) -> MapExpression {
    MapExpression {
        input: input.into(),
        as_: None,
        in_: in_.into(),
    }
}

/// `$objectToArray`
pub fn object_to_array(object: impl Into<Expression>) -> Expression {
    Expression::single("$objectToArray", object)
}

/// `$range`; pass a step with [`range_step`]
pub fn range(start: impl Into<Expression>, end: impl Into<Expression>) -> Expression {
    Expression::list("$range", [start.into(), end.into()])
}

/// `$range` with an explicit step
pub fn range_step(
    start: impl Into<Expression>,
    end: impl Into<Expression>,
    step: impl Into<Expression>,
) -> Expression {
    Expression::list("$range", [start.into(), end.into(), step.into()])
}

/// `$reduce`
pub fn reduce(
    input: impl Into<Expression>,
    initial_value: impl Into<Expression>,
    in_: impl Into<Expression>,
) -> Expression {
    Expression::named(
        "$reduce",
        vec![
            ("input", input.into()),
            ("initialValue", initial_value.into()),
            ("in", in_.into()),
        ],
    )
}

/// `$reverseArray`
pub fn reverse_array(array: impl Into<Expression>) -> Expression {
    Expression::single("$reverseArray", array)
}

/// `$size`
pub fn size(array: impl Into<Expression>) -> Expression {
    Expression::single("$size", array)
}

/// `$slice` from the start (positive `n`) or end (negative `n`)
pub fn slice(array: impl Into<Expression>, n: impl Into<Expression>) -> Expression {
    Expression::list("$slice", [array.into(), n.into()])
}

/// `$slice` starting at `position`
pub fn slice_from(
    array: impl Into<Expression>,
    position: impl Into<Expression>,
    n: impl Into<Expression>,
) -> Expression {
    Expression::list("$slice", [array.into(), position.into(), n.into()])
}

/// `$sortArray`; `sort_by` is `1`/`-1` or a document of field orders
pub fn sort_array(input: impl Into<Expression>, sort_by: impl Into<Expression>) -> Expression {
    Expression::named(
        "$sortArray",
        vec![("input", input.into()), ("sortBy", sort_by.into())],
    )
}

/// `$zip`; see [`ZipExpression`]
pub fn zip<I, E>(inputs: I) -> ZipExpression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    ZipExpression {
        inputs: inputs.into_iter().map(Into::into).collect(),
        use_longest_length: false,
        defaults: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    input: Expression,
    cond: Expression,
    as_: Option<String>,
    limit: Option<Expression>,
}

impl FilterExpression {
    /// Variable name for the current element (default `this`)
    pub fn as_(mut self, name: impl Into<String>) -> Self {
        self.as_ = Some(name.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Expression>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

impl From<FilterExpression> for Expression {
    fn from(f: FilterExpression) -> Self {
        let mut args = vec![("input", f.input)];
        if let Some(as_) = f.as_ {
            args.push(("as", as_.into()));
        }
        args.push(("cond", f.cond));
        if let Some(limit) = f.limit {
            args.push(("limit", limit));
        }
        Expression::named("$filter", args)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapExpression {
    input: Expression,
    as_: Option<String>,
    in_: Expression,
}

impl MapExpression {
    pub fn as_(mut self, name: impl Into<String>) -> Self {
        self.as_ = Some(name.into());
        self
    }
}

impl From<MapExpression> for Expression {
    fn from(m: MapExpression) -> Self {
        let mut args = vec![("input", m.input)];
        if let Some(as_) = m.as_ {
            args.push(("as", as_.into()));
        }
        args.push(("in", m.in_));
        Expression::named("$map", args)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexOfArray {
    array: Expression,
    search: Expression,
    start: Option<Expression>,
    end: Option<Expression>,
}

impl IndexOfArray {
    pub fn start(mut self, start: impl Into<Expression>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Only meaningful together with a start
    pub fn end(mut self, end: impl Into<Expression>) -> Self {
        self.end = Some(end.into());
        self
    }
}

impl From<IndexOfArray> for Expression {
    fn from(i: IndexOfArray) -> Self {
        let mut args = vec![i.array, i.search];
        if let Some(start) = i.start {
            args.push(start);
            args.extend(i.end);
        }
        Expression::list("$indexOfArray", args)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZipExpression {
    inputs: Vec<Expression>,
    use_longest_length: bool,
    defaults: Option<Expression>,
}

impl ZipExpression {
    pub fn use_longest_length(mut self) -> Self {
        self.use_longest_length = true;
        self
    }

    pub fn defaults(mut self, defaults: impl Into<Expression>) -> Self {
        self.defaults = Some(defaults.into());
        self
    }
}

impl From<ZipExpression> for Expression {
    fn from(z: ZipExpression) -> Self {
        let mut args = vec![("inputs", Expression::Array(z.inputs))];
        if z.use_longest_length {
            args.push(("useLongestLength", true.into()));
        }
        if let Some(defaults) = z.defaults {
            args.push(("defaults", defaults));
        }
        Expression::named("$zip", args)
    }
}

/// Document-valued sort specification for [`sort_array`]
pub fn sort_by() -> DocumentExpression {
    DocumentExpression::new()
}

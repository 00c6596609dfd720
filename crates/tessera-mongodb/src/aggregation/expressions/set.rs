//! Set expressions

use super::Expression;

/// `$allElementsTrue`
pub fn all_elements_true(array: impl Into<Expression>) -> Expression {
    Expression::list("$allElementsTrue", [array.into()])
}

/// `$anyElementTrue`
pub fn any_element_true(array: impl Into<Expression>) -> Expression {
    Expression::list("$anyElementTrue", [array.into()])
}

/// `$setDifference`: elements of `first` missing from `second`
pub fn set_difference(first: impl Into<Expression>, second: impl Into<Expression>) -> Expression {
    Expression::list("$setDifference", [first.into(), second.into()])
}

/// `$setEquals`
pub fn set_equals<I, E>(arrays: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$setEquals", arrays)
}

/// `$setIntersection`
pub fn set_intersection<I, E>(arrays: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$setIntersection", arrays)
}

/// `$setIsSubset`
pub fn set_is_subset(first: impl Into<Expression>, second: impl Into<Expression>) -> Expression {
    Expression::list("$setIsSubset", [first.into(), second.into()])
}

/// `$setUnion`
pub fn set_union<I, E>(arrays: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$setUnion", arrays)
}

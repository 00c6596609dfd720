//! Boolean expressions

use super::Expression;

/// `$and`
pub fn and<I, E>(values: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$and", values)
}

/// `$or`
pub fn or<I, E>(values: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$or", values)
}

/// `$not`
pub fn not(value: impl Into<Expression>) -> Expression {
    Expression::list("$not", [value.into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::expressions::comparison::{gt, lt};
    use bson::bson;

    #[test]
    fn test_and_or_not() {
        let e = and([gt("$qty", 100), lt("$qty", 250)]);
        assert_eq!(
            e.to_bson(),
            bson!({ "$and": [{ "$gt": ["$qty", 100] }, { "$lt": ["$qty", 250] }] })
        );
        assert_eq!(
            or([true, false]).to_bson(),
            bson!({ "$or": [true, false] })
        );
        assert_eq!(not(gt("$qty", 250)).to_bson(), bson!({ "$not": [{ "$gt": ["$qty", 250] }] }));
    }
}

//! Comparison expressions
//!
//! Each takes two arguments and encodes as `{ $op: [a, b] }`.

use super::Expression;

macro_rules! comparison {
    ($(#[$doc:meta])* $fn_name:ident, $op:literal) => {
        $(#[$doc])*
        pub fn $fn_name(a: impl Into<Expression>, b: impl Into<Expression>) -> Expression {
            Expression::list($op, [a.into(), b.into()])
        }
    };
}

comparison!(
    /// `$cmp`: -1, 0 or 1
    cmp, "$cmp"
);
comparison!(
    /// `$eq`
    eq, "$eq"
);
comparison!(
    /// `$gt`
    gt, "$gt"
);
comparison!(
    /// `$gte`
    gte, "$gte"
);
comparison!(
    /// `$lt`
    lt, "$lt"
);
comparison!(
    /// `$lte`
    lte, "$lte"
);
comparison!(
    /// `$ne`
    ne, "$ne"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::expressions::field;
    use bson::bson;

    #[test]
    fn test_comparisons() {
        assert_eq!(eq("$gameId", "G2").to_bson(), bson!({ "$eq": ["$gameId", "G2"] }));
        assert_eq!(cmp(field("qty"), 250).to_bson(), bson!({ "$cmp": ["$qty", 250] }));
        assert_eq!(ne("$a", "$b").to_bson(), bson!({ "$ne": ["$a", "$b"] }));
        assert_eq!(lte("$a", 1.5).to_bson(), bson!({ "$lte": ["$a", 1.5] }));
    }
}

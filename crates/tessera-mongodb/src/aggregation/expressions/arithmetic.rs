//! Arithmetic expressions

use super::Expression;

/// `$abs`
pub fn abs(value: impl Into<Expression>) -> Expression {
    Expression::single("$abs", value)
}

/// `$add`: numbers, or one date plus milliseconds
pub fn add<I, E>(values: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$add", values)
}

/// `$ceil`
pub fn ceil(value: impl Into<Expression>) -> Expression {
    Expression::single("$ceil", value)
}

/// `$divide`
pub fn divide(dividend: impl Into<Expression>, divisor: impl Into<Expression>) -> Expression {
    pair("$divide", dividend, divisor)
}

/// `$exp`: e raised to the exponent
pub fn exp(value: impl Into<Expression>) -> Expression {
    Expression::single("$exp", value)
}

/// `$floor`
pub fn floor(value: impl Into<Expression>) -> Expression {
    Expression::single("$floor", value)
}

/// `$ln`
pub fn ln(value: impl Into<Expression>) -> Expression {
    Expression::single("$ln", value)
}

/// `$log`
pub fn log(number: impl Into<Expression>, base: impl Into<Expression>) -> Expression {
    pair("$log", number, base)
}

/// `$log10`
pub fn log10(value: impl Into<Expression>) -> Expression {
    Expression::single("$log10", value)
}

/// `$mod`
pub fn mod_(dividend: impl Into<Expression>, divisor: impl Into<Expression>) -> Expression {
    pair("$mod", dividend, divisor)
}

/// `$multiply`
pub fn multiply<I, E>(values: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$multiply", values)
}

/// `$pow`
pub fn pow(number: impl Into<Expression>, exponent: impl Into<Expression>) -> Expression {
    pair("$pow", number, exponent)
}

/// `$round`; see [`RoundExpression::place`]
pub fn round(value: impl Into<Expression>) -> RoundExpression {
    RoundExpression {
        name: "$round",
        value: value.into(),
        place: None,
    }
}

/// `$sqrt`
pub fn sqrt(value: impl Into<Expression>) -> Expression {
    Expression::single("$sqrt", value)
}

/// `$subtract`: numbers, dates, or a date minus milliseconds
pub fn subtract(minuend: impl Into<Expression>, subtrahend: impl Into<Expression>) -> Expression {
    pair("$subtract", minuend, subtrahend)
}

/// `$trunc`; see [`RoundExpression::place`]
pub fn trunc(value: impl Into<Expression>) -> RoundExpression {
    RoundExpression {
        name: "$trunc",
        value: value.into(),
        place: None,
    }
}

/// `$round` / `$trunc` with an optional decimal place.
///
/// Without a place the operator takes the short form `{ $round: [x] }`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundExpression {
    name: &'static str,
    value: Expression,
    place: Option<Expression>,
}

impl RoundExpression {
    pub fn place(mut self, place: impl Into<Expression>) -> Self {
        self.place = Some(place.into());
        self
    }
}

impl From<RoundExpression> for Expression {
    fn from(round: RoundExpression) -> Self {
        let mut args = vec![round.value];
        args.extend(round.place);
        Expression::list(round.name, args)
    }
}

fn pair(name: &'static str, a: impl Into<Expression>, b: impl Into<Expression>) -> Expression {
    Expression::list(name, [a.into(), b.into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::expressions::field;
    use bson::bson;

    #[test]
    fn test_list_operators() {
        assert_eq!(
            add([field("price"), field("fee")]).to_bson(),
            bson!({ "$add": ["$price", "$fee"] })
        );
        assert_eq!(
            multiply(["$price", "$quantity"]).to_bson(),
            bson!({ "$multiply": ["$price", "$quantity"] })
        );
    }

    #[test]
    fn test_pair_operators() {
        assert_eq!(divide("$hours", 8).to_bson(), bson!({ "$divide": ["$hours", 8] }));
        assert_eq!(mod_("$hours", "$tasks").to_bson(), bson!({ "$mod": ["$hours", "$tasks"] }));
        assert_eq!(log("$int", 2).to_bson(), bson!({ "$log": ["$int", 2] }));
        assert_eq!(subtract("$a", 5).to_bson(), bson!({ "$subtract": ["$a", 5] }));
    }

    #[test]
    fn test_single_operators() {
        assert_eq!(abs("$x").to_bson(), bson!({ "$abs": "$x" }));
        assert_eq!(sqrt(field("x")).to_bson(), bson!({ "$sqrt": "$x" }));
    }

    #[test]
    fn test_round_and_trunc() {
        let r: Expression = round("$value").place(1).into();
        assert_eq!(r.to_bson(), bson!({ "$round": ["$value", 1] }));
        let t: Expression = trunc("$value").into();
        assert_eq!(t.to_bson(), bson!({ "$trunc": ["$value"] }));
    }
}

//! Type expressions

use super::Expression;

/// `$convert`; see [`ConvertExpression`]
pub fn convert(input: impl Into<Expression>, to: impl Into<Expression>) -> ConvertExpression {
    ConvertExpression {
        input: input.into(),
        to: to.into(),
        on_error: None,
        on_null: None,
    }
}

/// `$isNumber`
pub fn is_number(value: impl Into<Expression>) -> Expression {
    Expression::single("$isNumber", value)
}

/// `$toBool`
pub fn to_bool(value: impl Into<Expression>) -> Expression {
    Expression::single("$toBool", value)
}

/// `$toDate`
pub fn to_date(value: impl Into<Expression>) -> Expression {
    Expression::single("$toDate", value)
}

/// `$toDecimal`
pub fn to_decimal(value: impl Into<Expression>) -> Expression {
    Expression::single("$toDecimal", value)
}

/// `$toDouble`
pub fn to_double(value: impl Into<Expression>) -> Expression {
    Expression::single("$toDouble", value)
}

/// `$toInt`
pub fn to_int(value: impl Into<Expression>) -> Expression {
    Expression::single("$toInt", value)
}

/// `$toLong`
pub fn to_long(value: impl Into<Expression>) -> Expression {
    Expression::single("$toLong", value)
}

/// `$toObjectId`
pub fn to_object_id(value: impl Into<Expression>) -> Expression {
    Expression::single("$toObjectId", value)
}

/// `$toString`
pub fn to_string(value: impl Into<Expression>) -> Expression {
    Expression::single("$toString", value)
}

/// `$type`: the BSON type name of the value
pub fn type_(value: impl Into<Expression>) -> Expression {
    Expression::single("$type", value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertExpression {
    input: Expression,
    to: Expression,
    on_error: Option<Expression>,
    on_null: Option<Expression>,
}

impl ConvertExpression {
    /// Returned instead of failing the pipeline
    pub fn on_error(mut self, value: impl Into<Expression>) -> Self {
        self.on_error = Some(value.into());
        self
    }

    pub fn on_null(mut self, value: impl Into<Expression>) -> Self {
        self.on_null = Some(value.into());
        self
    }
}

impl From<ConvertExpression> for Expression {
    fn from(c: ConvertExpression) -> Self {
        let mut args = vec![("input", c.input), ("to", c.to)];
        if let Some(on_error) = c.on_error {
            args.push(("onError", on_error));
        }
        if let Some(on_null) = c.on_null {
            args.push(("onNull", on_null));
        }
        Expression::named("$convert", args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::bson;

    #[test]
    fn test_convert() {
        let e: Expression = convert("$price", "decimal")
            .on_error("Error")
            .on_null(0)
            .into();
        assert_eq!(
            e.to_bson(),
            bson!({ "$convert": { "input": "$price", "to": "decimal", "onError": "Error", "onNull": 0 } })
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(to_int("$qty").to_bson(), bson!({ "$toInt": "$qty" }));
        assert_eq!(to_object_id("$_id").to_bson(), bson!({ "$toObjectId": "$_id" }));
        assert_eq!(type_("$a").to_bson(), bson!({ "$type": "$a" }));
        assert_eq!(is_number("$reading").to_bson(), bson!({ "$isNumber": "$reading" }));
    }
}

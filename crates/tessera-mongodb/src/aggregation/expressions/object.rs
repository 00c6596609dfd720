//! Object expressions

use super::Expression;

/// `$mergeObjects`; later documents win on conflicting fields
pub fn merge_objects<I, E>(documents: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$mergeObjects", documents)
}

/// `$getField` on the current document
pub fn get_field(field: impl Into<Expression>) -> GetField {
    GetField {
        field: field.into(),
        input: None,
    }
}

/// `$setField`
pub fn set_field(
    field: impl Into<Expression>,
    input: impl Into<Expression>,
    value: impl Into<Expression>,
) -> Expression {
    Expression::named(
        "$setField",
        vec![
            ("field", field.into()),
            ("input", input.into()),
            ("value", value.into()),
        ],
    )
}

/// `$unsetField`
pub fn unset_field(field: impl Into<Expression>, input: impl Into<Expression>) -> Expression {
    Expression::named(
        "$unsetField",
        vec![("field", field.into()), ("input", input.into())],
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetField {
    field: Expression,
    input: Option<Expression>,
}

impl GetField {
    /// Read from `input` instead of `$$CURRENT`
    pub fn input(mut self, input: impl Into<Expression>) -> Self {
        self.input = Some(input.into());
        self
    }
}

impl From<GetField> for Expression {
    fn from(g: GetField) -> Self {
        let mut args = vec![("field", g.field)];
        if let Some(input) = g.input {
            args.push(("input", input));
        }
        Expression::named("$getField", args)
    }
}

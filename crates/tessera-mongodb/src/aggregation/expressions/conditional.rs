//! Conditional expressions

use super::Expression;

/// `$cond`: `then` when `if_` is true, otherwise `else_`
pub fn condition(
    if_: impl Into<Expression>,
    then: impl Into<Expression>,
    else_: impl Into<Expression>,
) -> Expression {
    Expression::named(
        "$cond",
        vec![("if", if_.into()), ("then", then.into()), ("else", else_.into())],
    )
}

/// `$ifNull`: the first non-null input, else the replacement (last item)
pub fn if_null<I, E>(inputs: I, replacement: impl Into<Expression>) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    let mut args: Vec<Expression> = inputs.into_iter().map(Into::into).collect();
    args.push(replacement.into());
    Expression::list("$ifNull", args)
}

/// `$switch`: add branches with [`SwitchExpression::branch`]
pub fn switch() -> SwitchExpression {
    SwitchExpression {
        branches: Vec::new(),
        default: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchExpression {
    branches: Vec<(Expression, Expression)>,
    default: Option<Expression>,
}

impl SwitchExpression {
    pub fn branch(mut self, case: impl Into<Expression>, then: impl Into<Expression>) -> Self {
        self.branches.push((case.into(), then.into()));
        self
    }

    /// Value when no branch matches; without one the server errors
    pub fn default(mut self, value: impl Into<Expression>) -> Self {
        self.default = Some(value.into());
        self
    }
}

impl From<SwitchExpression> for Expression {
    fn from(s: SwitchExpression) -> Self {
        let branches = s
            .branches
            .into_iter()
            .map(|(case, then)| {
                Expression::Document(
                    super::document().field("case", case).field("then", then),
                )
            })
            .collect();
        let mut args = vec![("branches", Expression::Array(branches))];
        if let Some(default) = s.default {
            args.push(("default", default));
        }
        Expression::named("$switch", args)
    }
}

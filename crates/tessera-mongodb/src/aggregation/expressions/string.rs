//! String expressions

use super::Expression;

/// `$concat`
pub fn concat<I, E>(parts: I) -> Expression
where
    I: IntoIterator<Item = E>,
    E: Into<Expression>,
{
    Expression::list("$concat", parts)
}

/// `$indexOfBytes`
pub fn index_of_bytes(string: impl Into<Expression>, substring: impl Into<Expression>) -> IndexOf {
    IndexOf::new("$indexOfBytes", string.into(), substring.into())
}

/// `$indexOfCP`
pub fn index_of_cp(string: impl Into<Expression>, substring: impl Into<Expression>) -> IndexOf {
    IndexOf::new("$indexOfCP", string.into(), substring.into())
}

/// `$ltrim`
pub fn ltrim(input: impl Into<Expression>) -> TrimExpression {
    TrimExpression::new("$ltrim", input.into())
}

/// `$regexFind`
pub fn regex_find(input: impl Into<Expression>, regex: impl Into<Expression>) -> RegexExpression {
    RegexExpression::new("$regexFind", input.into(), regex.into())
}

/// `$regexFindAll`
pub fn regex_find_all(
    input: impl Into<Expression>,
    regex: impl Into<Expression>,
) -> RegexExpression {
    RegexExpression::new("$regexFindAll", input.into(), regex.into())
}

/// `$regexMatch`
pub fn regex_match(input: impl Into<Expression>, regex: impl Into<Expression>) -> RegexExpression {
    RegexExpression::new("$regexMatch", input.into(), regex.into())
}

/// `$replaceAll`
pub fn replace_all(
    input: impl Into<Expression>,
    find: impl Into<Expression>,
    replacement: impl Into<Expression>,
) -> Expression {
    replace("$replaceAll", input, find, replacement)
}

/// `$replaceOne`: only the first match
pub fn replace_one(
    input: impl Into<Expression>,
    find: impl Into<Expression>,
    replacement: impl Into<Expression>,
) -> Expression {
    replace("$replaceOne", input, find, replacement)
}

/// `$rtrim`
pub fn rtrim(input: impl Into<Expression>) -> TrimExpression {
    TrimExpression::new("$rtrim", input.into())
}

/// `$split`
pub fn split(input: impl Into<Expression>, delimiter: impl Into<Expression>) -> Expression {
    Expression::list("$split", [input.into(), delimiter.into()])
}

/// `$strLenBytes`
pub fn str_len_bytes(input: impl Into<Expression>) -> Expression {
    Expression::single("$strLenBytes", input)
}

/// `$strLenCP`
pub fn str_len_cp(input: impl Into<Expression>) -> Expression {
    Expression::single("$strLenCP", input)
}

/// `$strcasecmp`
pub fn strcasecmp(first: impl Into<Expression>, second: impl Into<Expression>) -> Expression {
    Expression::list("$strcasecmp", [first.into(), second.into()])
}

/// `$substr` (deprecated by the server in favour of `$substrBytes`)
pub fn substr(
    input: impl Into<Expression>,
    start: impl Into<Expression>,
    length: impl Into<Expression>,
) -> Expression {
    Expression::list("$substr", [input.into(), start.into(), length.into()])
}

/// `$substrBytes`
pub fn substr_bytes(
    input: impl Into<Expression>,
    start: impl Into<Expression>,
    length: impl Into<Expression>,
) -> Expression {
    Expression::list("$substrBytes", [input.into(), start.into(), length.into()])
}

/// `$substrCP`
pub fn substr_cp(
    input: impl Into<Expression>,
    start: impl Into<Expression>,
    length: impl Into<Expression>,
) -> Expression {
    Expression::list("$substrCP", [input.into(), start.into(), length.into()])
}

/// `$toLower`
pub fn to_lower(input: impl Into<Expression>) -> Expression {
    Expression::single("$toLower", input)
}

/// `$toUpper`
pub fn to_upper(input: impl Into<Expression>) -> Expression {
    Expression::single("$toUpper", input)
}

/// `$trim`
pub fn trim(input: impl Into<Expression>) -> TrimExpression {
    TrimExpression::new("$trim", input.into())
}

fn replace(
    name: &'static str,
    input: impl Into<Expression>,
    find: impl Into<Expression>,
    replacement: impl Into<Expression>,
) -> Expression {
    Expression::named(
        name,
        vec![
            ("input", input.into()),
            ("find", find.into()),
            ("replacement", replacement.into()),
        ],
    )
}

/// `$indexOfBytes` / `$indexOfCP` with optional bounds
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOf {
    name: &'static str,
    string: Expression,
    substring: Expression,
    start: Option<Expression>,
    end: Option<Expression>,
}

impl IndexOf {
    fn new(name: &'static str, string: Expression, substring: Expression) -> Self {
        Self {
            name,
            string,
            substring,
            start: None,
            end: None,
        }
    }

    pub fn start(mut self, start: impl Into<Expression>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Written only when a start is also set
    pub fn end(mut self, end: impl Into<Expression>) -> Self {
        self.end = Some(end.into());
        self
    }
}

impl From<IndexOf> for Expression {
    fn from(i: IndexOf) -> Self {
        let mut args = vec![i.string, i.substring];
        if let Some(start) = i.start {
            args.push(start);
            args.extend(i.end);
        }
        Expression::list(i.name, args)
    }
}

/// `$trim`, `$ltrim`, `$rtrim`
#[derive(Debug, Clone, PartialEq)]
pub struct TrimExpression {
    name: &'static str,
    input: Expression,
    chars: Option<Expression>,
}

impl TrimExpression {
    fn new(name: &'static str, input: Expression) -> Self {
        Self {
            name,
            input,
            chars: None,
        }
    }

    /// Characters to trim instead of whitespace
    pub fn chars(mut self, chars: impl Into<Expression>) -> Self {
        self.chars = Some(chars.into());
        self
    }
}

impl From<TrimExpression> for Expression {
    fn from(t: TrimExpression) -> Self {
        let mut args = vec![("input", t.input)];
        if let Some(chars) = t.chars {
            args.push(("chars", chars));
        }
        Expression::named(t.name, args)
    }
}

/// `$regexFind`, `$regexFindAll`, `$regexMatch`
#[derive(Debug, Clone, PartialEq)]
pub struct RegexExpression {
    name: &'static str,
    input: Expression,
    regex: Expression,
    options: Option<String>,
}

impl RegexExpression {
    fn new(name: &'static str, input: Expression, regex: Expression) -> Self {
        Self {
            name,
            input,
            regex,
            options: None,
        }
    }

    /// Regex flags such as `"i"` or `"mx"`
    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }
}

impl From<RegexExpression> for Expression {
    fn from(r: RegexExpression) -> Self {
        let mut args = vec![("input", r.input), ("regex", r.regex)];
        if let Some(options) = r.options {
            args.push(("options", options.into()));
        }
        Expression::named(r.name, args)
    }
}

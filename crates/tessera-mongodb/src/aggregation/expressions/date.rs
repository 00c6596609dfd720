//! Date expressions

use super::Expression;

/// A date operator with named arguments and optional settings.
///
/// Setters that do not apply to the operator are still written; the server
/// reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct DateExpression {
    name: &'static str,
    args: Vec<(&'static str, Expression)>,
}

impl DateExpression {
    fn new(name: &'static str, args: Vec<(&'static str, Expression)>) -> Self {
        Self { name, args }
    }

    fn set(mut self, key: &'static str, value: Expression) -> Self {
        match self.args.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.args.push((key, value)),
        }
        self
    }

    /// Olson timezone identifier or UTC offset
    pub fn timezone(self, timezone: impl Into<Expression>) -> Self {
        self.set("timezone", timezone.into())
    }

    pub fn format(self, format: impl Into<Expression>) -> Self {
        self.set("format", format.into())
    }

    pub fn on_null(self, value: impl Into<Expression>) -> Self {
        self.set("onNull", value.into())
    }

    pub fn on_error(self, value: impl Into<Expression>) -> Self {
        self.set("onError", value.into())
    }

    pub fn bin_size(self, size: impl Into<Expression>) -> Self {
        self.set("binSize", size.into())
    }

    pub fn start_of_week(self, day: impl Into<Expression>) -> Self {
        self.set("startOfWeek", day.into())
    }
}

impl From<DateExpression> for Expression {
    fn from(d: DateExpression) -> Self {
        Expression::named(d.name, d.args)
    }
}

/// `$dateAdd`
pub fn date_add(
    start_date: impl Into<Expression>,
    amount: impl Into<Expression>,
    unit: impl Into<Expression>,
) -> DateExpression {
    DateExpression::new(
        "$dateAdd",
        vec![
            ("startDate", start_date.into()),
            ("unit", unit.into()),
            ("amount", amount.into()),
        ],
    )
}

/// `$dateDiff`
pub fn date_diff(
    start_date: impl Into<Expression>,
    end_date: impl Into<Expression>,
    unit: impl Into<Expression>,
) -> DateExpression {
    DateExpression::new(
        "$dateDiff",
        vec![
            ("startDate", start_date.into()),
            ("endDate", end_date.into()),
            ("unit", unit.into()),
        ],
    )
}

/// `$dateFromString`
pub fn date_from_string(date_string: impl Into<Expression>) -> DateExpression {
    DateExpression::new("$dateFromString", vec![("dateString", date_string.into())])
}

/// `$dateToString`
pub fn date_to_string(date: impl Into<Expression>) -> DateExpression {
    DateExpression::new("$dateToString", vec![("date", date.into())])
}

/// `$dateTrunc`
pub fn date_trunc(date: impl Into<Expression>, unit: impl Into<Expression>) -> DateExpression {
    DateExpression::new("$dateTrunc", vec![("date", date.into()), ("unit", unit.into())])
}

/// `$dateFromParts`; start from a calendar year or an ISO week year
pub fn date_from_parts() -> DateFromParts {
    DateFromParts::default()
}

/// Builder for `$dateFromParts`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DateFromParts {
    parts: Vec<(&'static str, Expression)>,
}

impl DateFromParts {
    fn part(mut self, key: &'static str, value: impl Into<Expression>) -> Self {
        self.parts.retain(|(k, _)| *k != key);
        self.parts.push((key, value.into()));
        self
    }

    pub fn year(self, v: impl Into<Expression>) -> Self {
        self.part("year", v)
    }

    pub fn month(self, v: impl Into<Expression>) -> Self {
        self.part("month", v)
    }

    pub fn day(self, v: impl Into<Expression>) -> Self {
        self.part("day", v)
    }

    pub fn iso_week_year(self, v: impl Into<Expression>) -> Self {
        self.part("isoWeekYear", v)
    }

    pub fn iso_week(self, v: impl Into<Expression>) -> Self {
        self.part("isoWeek", v)
    }

    pub fn iso_day_of_week(self, v: impl Into<Expression>) -> Self {
        self.part("isoDayOfWeek", v)
    }

    pub fn hour(self, v: impl Into<Expression>) -> Self {
        self.part("hour", v)
    }

    pub fn minute(self, v: impl Into<Expression>) -> Self {
        self.part("minute", v)
    }

    pub fn second(self, v: impl Into<Expression>) -> Self {
        self.part("second", v)
    }

    pub fn millisecond(self, v: impl Into<Expression>) -> Self {
        self.part("millisecond", v)
    }

    pub fn timezone(self, v: impl Into<Expression>) -> Self {
        self.part("timezone", v)
    }
}

impl From<DateFromParts> for Expression {
    fn from(d: DateFromParts) -> Self {
        Expression::named("$dateFromParts", d.parts)
    }
}

/// A date-part extractor (`$year`, `$hour`, ...).
///
/// Written as `{ $year: <date> }`, or `{ $year: { date, timezone } }` once a
/// timezone is set.
#[derive(Debug, Clone, PartialEq)]
pub struct DatePart {
    name: &'static str,
    date: Expression,
    timezone: Option<Expression>,
}

impl DatePart {
    pub fn timezone(mut self, timezone: impl Into<Expression>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

impl From<DatePart> for Expression {
    fn from(p: DatePart) -> Self {
        match p.timezone {
            None => Expression::single(p.name, p.date),
            Some(timezone) => {
                Expression::named(p.name, vec![("date", p.date), ("timezone", timezone)])
            }
        }
    }
}

macro_rules! date_part {
    ($($fn_name:ident => $op:literal),* $(,)?) => {
        $(
            #[doc = concat!("`", $op, "`")]
            pub fn $fn_name(date: impl Into<Expression>) -> DatePart {
                DatePart {
                    name: $op,
                    date: date.into(),
                    timezone: None,
                }
            }
        )*
    };
}

date_part! {
    day_of_month => "$dayOfMonth",
    day_of_week => "$dayOfWeek",
    day_of_year => "$dayOfYear",
    hour => "$hour",
    millisecond => "$millisecond",
    minute => "$minute",
    month => "$month",
    second => "$second",
    week => "$week",
    year => "$year",
}

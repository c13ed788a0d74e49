//! Filter trees and typed leaf predicates.
//!
//! Leaf predicates are compiled once against the column type: literals are
//! converted and regexes built at parse time, so evaluation per row is a
//! single extraction plus a comparison.

use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use std::sync::Arc;

use super::QueryError;
use crate::data::{Column, ColumnType, Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Matches,
    DoesntMatch,
    EqualIcase,
    NotEqualIcase,
    MatchesIcase,
    DoesntMatchIcase,
}

impl RelOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "=" => RelOp::Equal,
            "!=" => RelOp::NotEqual,
            "<" => RelOp::Less,
            ">" => RelOp::Greater,
            "<=" => RelOp::LessOrEqual,
            ">=" => RelOp::GreaterOrEqual,
            "~" => RelOp::Matches,
            "!~" => RelOp::DoesntMatch,
            "=~" => RelOp::EqualIcase,
            "!=~" => RelOp::NotEqualIcase,
            "~~" => RelOp::MatchesIcase,
            "!~~" => RelOp::DoesntMatchIcase,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RelOp::Equal => "=",
            RelOp::NotEqual => "!=",
            RelOp::Less => "<",
            RelOp::Greater => ">",
            RelOp::LessOrEqual => "<=",
            RelOp::GreaterOrEqual => ">=",
            RelOp::Matches => "~",
            RelOp::DoesntMatch => "!~",
            RelOp::EqualIcase => "=~",
            RelOp::NotEqualIcase => "!=~",
            RelOp::MatchesIcase => "~~",
            RelOp::DoesntMatchIcase => "!~~",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(
            self,
            RelOp::Equal
                | RelOp::NotEqual
                | RelOp::Less
                | RelOp::Greater
                | RelOp::LessOrEqual
                | RelOp::GreaterOrEqual
        )
    }

    fn accepts_ordering(&self, ord: Ordering) -> bool {
        match self {
            RelOp::Equal => ord == Ordering::Equal,
            RelOp::NotEqual => ord != Ordering::Equal,
            RelOp::Less => ord == Ordering::Less,
            RelOp::Greater => ord == Ordering::Greater,
            RelOp::LessOrEqual => ord != Ordering::Greater,
            RelOp::GreaterOrEqual => ord != Ordering::Less,
            _ => false,
        }
    }
}

impl std::fmt::Display for RelOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Immutable boolean combination of leaf predicates
#[derive(Debug, Clone)]
pub enum Filter {
    /// Conjunction; empty accepts everything
    And(Vec<Filter>),
    /// Disjunction; empty rejects everything
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Column(ColumnFilter),
}

impl Filter {
    pub fn accept_all() -> Self {
        Filter::And(Vec::new())
    }

    pub fn accepts(&self, row: Row<'_>) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.accepts(row)),
            Filter::Or(filters) => filters.iter().any(|f| f.accepts(row)),
            Filter::Not(filter) => !filter.accepts(row),
            Filter::Column(filter) => filter.accepts(row),
        }
    }

    /// Compile a `<column> <op> <literal>` leaf against its column
    pub fn column(column: Arc<Column>, op: RelOp, literal: &str) -> Result<Self, QueryError> {
        Ok(Filter::Column(ColumnFilter::new(column, op, literal)?))
    }
}

#[derive(Debug, Clone)]
pub struct ColumnFilter {
    column: Arc<Column>,
    op: RelOp,
    predicate: Predicate,
}

#[derive(Debug, Clone)]
enum Predicate {
    /// Int, double and time columns compare against a literal of the same type
    Ordered(Value),
    String(StringMatch),
    List(ListMatch),
    Dict { key: String, matcher: StringMatch },
}

impl ColumnFilter {
    pub fn new(column: Arc<Column>, op: RelOp, literal: &str) -> Result<Self, QueryError> {
        let unsupported = || QueryError::UnsupportedOperator {
            column: column.name().to_string(),
            column_type: column.column_type(),
            op: op.symbol(),
        };

        let predicate = match column.column_type() {
            ColumnType::Int | ColumnType::Time | ColumnType::Double => {
                if !op.is_ordering() {
                    return Err(unsupported());
                }
                Predicate::Ordered(parse_numeric(&column, literal)?)
            }
            ColumnType::String => Predicate::String(StringMatch::new(op, literal)?),
            ColumnType::List => Predicate::List(ListMatch::new(&column, op, literal)?),
            ColumnType::Dict => {
                let (key, value) = match literal.split_once(char::is_whitespace) {
                    Some((key, value)) => (key, value.trim_start()),
                    None => (literal, ""),
                };
                Predicate::Dict {
                    key: key.to_string(),
                    matcher: StringMatch::new(op, value)?,
                }
            }
            ColumnType::Blob => return Err(unsupported()),
        };

        Ok(Self {
            column,
            op,
            predicate,
        })
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn op(&self) -> RelOp {
        self.op
    }

    pub fn accepts(&self, row: Row<'_>) -> bool {
        let value = self.column.extract(row);
        match (&self.predicate, &value) {
            (Predicate::Ordered(literal), _) => self.op.accepts_ordering(value.cmp(literal)),
            (Predicate::String(m), Value::String(s)) => m.matches(s),
            (Predicate::List(m), Value::List(items)) => m.matches(items),
            (Predicate::Dict { key, matcher }, Value::Dict(map)) => {
                matcher.matches(map.get(key).map(String::as_str).unwrap_or(""))
            }
            _ => false,
        }
    }
}

/// Numeric literals must parse completely; nothing is coerced to zero
fn parse_numeric(column: &Column, literal: &str) -> Result<Value, QueryError> {
    let literal = literal.trim();
    let mismatch = || QueryError::TypeMismatch {
        column: column.name().to_string(),
        expected: column.column_type(),
        literal: literal.to_string(),
    };
    match column.column_type() {
        ColumnType::Int => literal.parse().map(Value::Int).map_err(|_| mismatch()),
        ColumnType::Time => literal.parse().map(Value::Time).map_err(|_| mismatch()),
        ColumnType::Double => literal
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
            .map(Value::Double)
            .ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}

fn build_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, QueryError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| QueryError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })
}

#[derive(Debug, Clone)]
struct StringMatch {
    op: RelOp,
    value: String,
    regex: Option<Regex>,
}

impl StringMatch {
    fn new(op: RelOp, value: &str) -> Result<Self, QueryError> {
        let regex = match op {
            RelOp::Matches | RelOp::DoesntMatch => Some(build_regex(value, false)?),
            RelOp::MatchesIcase | RelOp::DoesntMatchIcase => Some(build_regex(value, true)?),
            _ => None,
        };
        let value = match op {
            RelOp::EqualIcase | RelOp::NotEqualIcase => value.to_lowercase(),
            _ => value.to_string(),
        };
        Ok(Self { op, value, regex })
    }

    fn matches(&self, s: &str) -> bool {
        match self.op {
            RelOp::Matches | RelOp::MatchesIcase => {
                self.regex.as_ref().map(|re| re.is_match(s)).unwrap_or(false)
            }
            RelOp::DoesntMatch | RelOp::DoesntMatchIcase => {
                !self.regex.as_ref().map(|re| re.is_match(s)).unwrap_or(false)
            }
            RelOp::EqualIcase => s.to_lowercase() == self.value,
            RelOp::NotEqualIcase => s.to_lowercase() != self.value,
            op => op.accepts_ordering(s.cmp(self.value.as_str())),
        }
    }
}

#[derive(Debug, Clone)]
enum ListMatch {
    Empty,
    NotEmpty,
    Contains(String),
    NotContains(String),
    ContainsIcase(String),
    NotContainsIcase(String),
    AnyMatches(Regex),
    NoneMatches(Regex),
}

impl ListMatch {
    fn new(column: &Column, op: RelOp, literal: &str) -> Result<Self, QueryError> {
        Ok(match op {
            // Equality is only defined as an emptiness check
            RelOp::Equal if literal.is_empty() => ListMatch::Empty,
            RelOp::NotEqual if literal.is_empty() => ListMatch::NotEmpty,
            RelOp::GreaterOrEqual => ListMatch::Contains(literal.to_string()),
            RelOp::Less => ListMatch::NotContains(literal.to_string()),
            RelOp::LessOrEqual => ListMatch::ContainsIcase(literal.to_lowercase()),
            RelOp::Greater => ListMatch::NotContainsIcase(literal.to_lowercase()),
            RelOp::Matches => ListMatch::AnyMatches(build_regex(literal, false)?),
            RelOp::DoesntMatch => ListMatch::NoneMatches(build_regex(literal, false)?),
            RelOp::MatchesIcase => ListMatch::AnyMatches(build_regex(literal, true)?),
            RelOp::DoesntMatchIcase => ListMatch::NoneMatches(build_regex(literal, true)?),
            _ => {
                return Err(QueryError::UnsupportedOperator {
                    column: column.name().to_string(),
                    column_type: column.column_type(),
                    op: op.symbol(),
                })
            }
        })
    }

    fn matches(&self, items: &[String]) -> bool {
        match self {
            ListMatch::Empty => items.is_empty(),
            ListMatch::NotEmpty => !items.is_empty(),
            ListMatch::Contains(v) => items.iter().any(|i| i == v),
            ListMatch::NotContains(v) => !items.iter().any(|i| i == v),
            ListMatch::ContainsIcase(v) => items.iter().any(|i| i.to_lowercase() == *v),
            ListMatch::NotContainsIcase(v) => !items.iter().any(|i| i.to_lowercase() == *v),
            ListMatch::AnyMatches(re) => items.iter().any(|i| re.is_match(i)),
            ListMatch::NoneMatches(re) => !items.iter().any(|i| re.is_match(i)),
        }
    }
}

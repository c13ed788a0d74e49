pub mod aggregates;
pub mod executor;
pub mod filter;
pub mod parser;
pub mod request;
pub mod stats;

pub use executor::{Query, QueryResult, Truncation};
pub use filter::{ColumnFilter, Filter, RelOp};
pub use parser::{parse_query, OrderBy, ParsedQuery};
pub use request::{Header, Request, RequestError};
pub use stats::StatsColumn;

use crate::data::ColumnType;

/// How a query error is reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    TypeMismatch,
}

/// Everything that can make a query unanswerable. All of these are raised
/// before iteration starts.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Unknown header: {0}")]
    UnknownHeader(String),

    #[error("Invalid value for {header}: '{value}'")]
    InvalidHeader { header: String, value: String },

    #[error("Table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("Operator '{op}' is not defined for column '{column}' of type {column_type}")]
    UnsupportedOperator {
        column: String,
        column_type: ColumnType,
        op: &'static str,
    },

    #[error("Unknown operator: '{0}'")]
    UnknownOperator(String),

    #[error("Malformed {header} header: '{value}'")]
    Malformed { header: String, value: String },

    #[error("{header}: cannot combine {requested} entries, only {available} available")]
    StackUnderflow {
        header: String,
        requested: usize,
        available: usize,
    },

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("Cannot aggregate non-numeric column '{0}'")]
    NonNumericAggregate(String),

    #[error("Column '{column}' expects {expected}, got '{literal}'")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        literal: String,
    },
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            _ => ErrorKind::Parse,
        }
    }

    /// Response status for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Parse | ErrorKind::TypeMismatch => 400,
        }
    }
}

//! Error types

use miette::Diagnostic;
use thiserror::Error;

use crate::code::Code;

/// Errors that abort a review before or while rules run.
///
/// Everything a rule merely *finds* is reported as an [`Advice`](crate::Advice)
/// instead; these are configuration or input problems the caller must fix.
#[derive(Debug, Error, Diagnostic)]
pub enum ReviewError {
    #[error("rule {rule} requires a payload")]
    #[diagnostic(code(sqlreview::payload::missing))]
    MissingPayload { rule: String },

    #[error("invalid payload for rule {rule}")]
    #[diagnostic(code(sqlreview::payload::invalid))]
    InvalidPayload {
        rule: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid template {template} for rule {rule}")]
    #[diagnostic(
        code(sqlreview::naming::template),
        help("check the token names supported by this rule type")
    )]
    InvalidTemplateToken { template: String, rule: String },

    #[error("invalid naming format {format:?} for rule {rule}")]
    #[diagnostic(code(sqlreview::naming::regex))]
    InvalidRegex {
        rule: String,
        format: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown rule type: {0}")]
    #[diagnostic(code(sqlreview::rule::unknown))]
    UnknownRuleType(String),

    #[error("malformed syntax tree: {0}")]
    #[diagnostic(code(sqlreview::tree))]
    MalformedTree(String),
}

/// Failure while compiling a naming template against concrete identifiers.
///
/// Raised per finding; rules turn it into an `Internal` advice and keep going.
#[derive(Debug, Error)]
pub enum NamingError {
    #[error("no value supplied for template token {0}")]
    MissingValue(String),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Error returned by a [`QueryExecutor`](crate::executor::QueryExecutor).
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{0}")]
    Query(String),

    #[error("query cancelled")]
    Cancelled,
}

/// A statement the parser could not understand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}: {message}")]
pub struct SyntaxError {
    /// Absolute 1-indexed line within the script
    pub line: usize,
    pub message: String,
}

/// A statement that cannot apply to the schema replayed so far.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkThroughError {
    #[error("Database `{target}` is not the current database `{current}`")]
    AccessOtherDatabase { current: String, target: String },

    #[error("Database `{0}` is deleted")]
    DatabaseIsDeleted(String),

    #[error("Table `{0}` already exists")]
    TableExists(String),

    #[error("Table `{0}` does not exist")]
    TableNotExists(String),

    #[error("Column `{column}` already exists in table `{table}`")]
    ColumnExists { table: String, column: String },

    #[error("Column `{column}` does not exist in table `{table}`")]
    ColumnNotExists { table: String, column: String },

    #[error("Can't delete all columns with ALTER TABLE; use DROP TABLE {0} instead")]
    DropAllColumns(String),

    #[error("Primary key exists in table `{0}`")]
    PrimaryKeyExists(String),

    #[error("Primary key does not exist in table `{0}`")]
    PrimaryKeyNotExists(String),

    #[error("Index `{index}` already exists in table `{table}`")]
    IndexExists { table: String, index: String },
}

impl WalkThroughError {
    pub fn code(&self) -> Code {
        match self {
            WalkThroughError::AccessOtherDatabase { .. } => Code::NotCurrentDatabase,
            WalkThroughError::DatabaseIsDeleted(_) => Code::DatabaseIsDeleted,
            WalkThroughError::TableExists(_) => Code::TableExists,
            WalkThroughError::TableNotExists(_) => Code::TableNotExists,
            WalkThroughError::ColumnExists { .. } => Code::ColumnExists,
            WalkThroughError::ColumnNotExists { .. } => Code::ColumnNotExists,
            WalkThroughError::DropAllColumns(_) => Code::DropAllColumns,
            WalkThroughError::PrimaryKeyExists(_) => Code::PrimaryKeyExists,
            WalkThroughError::PrimaryKeyNotExists(_) => Code::PrimaryKeyNotExists,
            WalkThroughError::IndexExists { .. } => Code::IndexExists,
        }
    }

    /// Advice title
    pub fn title(&self) -> &'static str {
        match self {
            WalkThroughError::AccessOtherDatabase { .. } => "Access other database",
            WalkThroughError::DatabaseIsDeleted(_) => "Access deleted database",
            WalkThroughError::TableExists(_) => "Table already exists",
            WalkThroughError::TableNotExists(_) => "Table does not exist",
            WalkThroughError::ColumnExists { .. } => "Column already exists",
            WalkThroughError::ColumnNotExists { .. } => "Column does not exist",
            WalkThroughError::DropAllColumns(_) => "Drop all columns",
            WalkThroughError::PrimaryKeyExists(_) => "Primary key exists",
            WalkThroughError::PrimaryKeyNotExists(_) => "Primary key does not exist",
            WalkThroughError::IndexExists { .. } => "Index exists",
        }
    }
}

use thiserror::Error;

use crate::config::ConfigError;
use crate::table::QueryError;

/// Primary error type for the better-trigram extension.
///
/// Decode anomalies never surface here: malformed text is always recovered.
/// Plan fallbacks are not errors either; they degrade to a full scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrigramError {
    /// The tokenizer rejected its argument list at table-creation time.
    #[error("error in tokenizer constructor: {0}")]
    Constructor(#[from] ConfigError),

    /// `tokenize=` named a tokenizer this extension does not provide.
    #[error("no such tokenizer: {name}")]
    UnknownTokenizer { name: String },

    /// `CREATE VIRTUAL TABLE` option this table does not understand.
    #[error("unrecognized option: \"{key}\"")]
    UnrecognizedOption { key: String },

    /// `detail=` names no known detail level.
    #[error("malformed detail=... directive: {value}")]
    MalformedDetail { value: String },

    /// A table must declare at least one column.
    #[error("virtual table {table} declares no columns")]
    NoColumns { table: String },

    /// Column name lookup failed.
    #[error("no such column: {name}")]
    NoSuchColumn { name: String },

    /// Column index outside the declared column list.
    #[error("column index {index} out of range (table has {count} columns)")]
    ColumnIndex { index: usize, count: usize },

    /// Inserted row carries more values than the table has columns.
    #[error("table has {count} columns but {supplied} values were supplied")]
    TooManyValues { count: usize, supplied: usize },

    /// Explicit rowid already present.
    #[error("UNIQUE constraint failed: rowid {rowid}")]
    RowidExists { rowid: i64 },

    /// Internal document numbers exhausted.
    #[error("database or disk is full")]
    IndexFull,

    /// Malformed MATCH expression.
    #[error("fts5: syntax error in query: {0}")]
    Query(#[from] QueryError),

    /// Stored content disagrees with the inverted index.
    #[error("integrity check failed: {detail}")]
    IntegrityCheck { detail: String },
}

/// SQLite result codes used by this extension.
///
/// These match the numeric values from C SQLite's `sqlite3.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Successful result.
    Ok = 0,
    /// Generic error.
    Error = 1,
    /// Database disk image is malformed.
    Corrupt = 11,
    /// Insertion failed because the database is full.
    Full = 13,
    /// Abort due to constraint violation.
    Constraint = 19,
    /// Bind parameter or index out of range.
    Range = 25,
}

impl TrigramError {
    /// Map this error to a SQLite error code for compatibility.
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Constructor(_)
            | Self::UnknownTokenizer { .. }
            | Self::UnrecognizedOption { .. }
            | Self::MalformedDetail { .. }
            | Self::NoColumns { .. }
            | Self::NoSuchColumn { .. }
            | Self::TooManyValues { .. }
            | Self::Query(_) => ErrorCode::Error,
            Self::ColumnIndex { .. } => ErrorCode::Range,
            Self::RowidExists { .. } => ErrorCode::Constraint,
            Self::IndexFull => ErrorCode::Full,
            Self::IntegrityCheck { .. } => ErrorCode::Corrupt,
        }
    }

    /// Whether this error was raised while constructing a tokenizer.
    pub const fn is_constructor_error(&self) -> bool {
        matches!(self, Self::Constructor(_))
    }

    /// Create an integrity-check failure.
    pub fn integrity(detail: impl Into<String>) -> Self {
        Self::IntegrityCheck {
            detail: detail.into(),
        }
    }
}

/// Result type alias using `TrigramError`.
pub type Result<T> = std::result::Result<T, TrigramError>;

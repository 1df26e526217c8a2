//! Error taxonomy for an import run.
//!
//! Every failure that escapes the importer is one of these variants. Per-post
//! recoverable conditions (missing author, non-category taxonomy) never reach
//! this type; they are reported through [`Diagnostics`](crate::diagnostics::Diagnostics)
//! and the import continues.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// The database URL is malformed, unsupported, or the server is unreachable.
    #[error("cannot connect to database: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// A table or column the importer relies on does not exist.
    #[error("schema error on table `{table}`: {message}")]
    Schema { table: String, message: String },

    /// A singleton row in the options table is absent.
    #[error("missing required option `{0}` in the options table")]
    MissingConfig(String),

    /// A posts row carries a type outside attachment/post/page/revision.
    #[error("unknown post type: {0} (set `import.skip_unknown_post_types = true` to skip it)")]
    UnknownPostType(String),

    /// Table prefixes are spliced into SQL identifiers, so they are restricted.
    #[error("invalid table prefix `{0}`: only ASCII letters, digits and `_` are allowed")]
    InvalidPrefix(String),

    /// Any other failure reported by the database driver.
    #[error("query on `{table}` failed: {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content sink rejected an item for a reason other than I/O.
    #[error("output error: {0}")]
    Output(String),
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;

impl ImportError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify a driver error raised while querying `table`.
    ///
    /// Unknown tables and columns become [`ImportError::Schema`]; transport
    /// failures become [`ImportError::Connection`].
    pub fn from_query(table: &str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) => {
                let code = db_err.code().unwrap_or(Cow::Borrowed(""));
                let message = db_err.message().to_string();
                if is_schema_error(&code, &message) {
                    return Self::Schema {
                        table: table.to_string(),
                        message,
                    };
                }
                Self::Query {
                    table: table.to_string(),
                    source: err,
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::Connection {
                message: format!("lost connection while querying `{}`", table),
                source: Some(err),
            },
            sqlx::Error::ColumnNotFound(ref column) => Self::Schema {
                table: table.to_string(),
                message: format!("column `{}` not found in result set", column),
            },
            other => Self::Query {
                table: table.to_string(),
                source: other,
            },
        }
    }
}

/// SQLSTATE codes for MySQL (`42S02`, `42S22`) and Postgres (`42P01`, `42703`);
/// SQLite only reports a generic code, so its message text is checked instead.
fn is_schema_error(code: &str, message: &str) -> bool {
    matches!(code, "42S02" | "42S22" | "42P01" | "42703" | "1146" | "1054")
        || message.contains("no such table")
        || message.contains("no such column")
        || message.contains("doesn't exist")
        || message.contains("Unknown column")
}

//! Error types for the dump library.

use thiserror::Error;

/// Main error type for dump operations.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Configuration error (bad DSN, invalid option value, unresolved include list).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connecting to the server failed.
    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// A catalog query or data select failed.
    #[error("Query error: {context}: {source}")]
    Query {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// The server replied with an unexpected shape (e.g. a missing
    /// `Create Table` column in a `SHOW CREATE` reply).
    #[error("Unexpected server reply: {0}")]
    UnexpectedReply(String),

    /// A cell value could not be rendered as a SQL literal.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Writing to or closing the output sink failed.
    #[error("Sink error: {0}")]
    Sink(#[from] std::io::Error),
}

impl DumpError {
    /// Create a Query error with context about where it occurred.
    pub fn query(context: impl Into<String>, source: sqlx::Error) -> Self {
        DumpError::Query {
            context: context.into(),
            source,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for dump operations.
pub type Result<T> = std::result::Result<T, DumpError>;

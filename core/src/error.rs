use thiserror::Error;

/// Errors raised while reading a collection or answering a query.
///
/// Only `Format` is fatal. The query-time variants are reported as
/// diagnostics on an [`Evaluation`](crate::query::Evaluation) and never
/// abort a session.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed collection at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("query must resolve to exactly two terms, found {found}")]
    Arity { found: usize, terms: Vec<String> },

    #[error("term not found in index: {}", .missing.join(", "))]
    TermNotFound { missing: Vec<String> },

    #[error("posting list for term {term:?} is not strictly increasing")]
    InvalidPostings { term: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn format(line: usize, reason: impl Into<String>) -> Self {
        Error::Format { line, reason: reason.into() }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io { context: context.into(), source }
    }

    /// True for errors that a query session recovers from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Arity { .. } | Error::TermNotFound { .. } | Error::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

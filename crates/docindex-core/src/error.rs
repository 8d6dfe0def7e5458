use thiserror::Error;

/// Error taxonomy shared by every docindex crate.
///
/// An index location without a valid index is not an error: readers report
/// it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid field definition, schema, or a value map missing a required key.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// I/O failure on the index location, or a single-writer violation.
    #[error("Resource error: {0}")]
    Resource(String),

    /// Invalid range bounds or boolean clause arity. Only raised under the
    /// strict construction policy.
    #[error("Query construction mismatch: {0}")]
    QueryConstruction(String),

    /// Malformed query string or analyzer failure.
    #[error("Query parse error: {0}")]
    QueryParse(String),

    /// Query execution stopped by a deadline or cancellation flag.
    #[error("Search interrupted: {0}")]
    Interrupted(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn resource(msg: impl std::fmt::Display) -> Self {
        Self::Resource(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Resource(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

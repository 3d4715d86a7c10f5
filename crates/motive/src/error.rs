//! Error taxonomy for compilation and scoring.
//!
//! Parse, validation, and structural errors are all detected before any
//! query text is emitted; emission itself cannot fail. Execution errors
//! are surfaced verbatim from the datastore collaborator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed DSL or note-list syntax.
    #[error("parse error at byte {position}: unexpected `{token}`")]
    Parse { token: String, position: usize },

    /// A value outside its legal range: negative tolerance, alpha
    /// outside [0, 1], unknown pitch spelling.
    #[error("validation error: {0}")]
    Validation(String),

    /// A pattern that cannot anchor a graph match: empty, rest-only,
    /// or alignment constraints naming missing voices.
    #[error("structural error: {0}")]
    Structural(String),

    /// Surfaced unchanged from the datastore collaborator, or a result
    /// row that breaks the projection contract.
    #[error("execution error: {0}")]
    Execution(String),
}

impl From<notation::Error> for Error {
    fn from(err: notation::Error) -> Error {
        Error::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for Cardsync.

use thiserror::Error;

/// Result type alias for Cardsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Cardsync.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    // Collaborator errors (20-29)
    #[error("preference store failure: {0}")]
    Store(String),

    #[error("hierarchy lookup failed for folder {folder_id}: {reason}")]
    Hierarchy { folder_id: String, reason: String },

    // Resolution errors (30-39)
    #[error("strategy execution failed: {0}")]
    Strategy(String),

    #[error("malformed resolution context: {0}")]
    MalformedContext(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidThreshold(_) => 11,
            Error::Store(_) => 20,
            Error::Hierarchy { .. } => 21,
            Error::Strategy(_) => 30,
            Error::MalformedContext(_) => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::Store("x".into()).code(), 20);
        assert_eq!(
            Error::Hierarchy {
                folder_id: "f1".into(),
                reason: "gone".into()
            }
            .code(),
            21
        );
        assert_eq!(Error::Strategy("x".into()).code(), 30);
        assert_eq!(Error::MalformedContext("x".into()).code(), 31);
    }

    #[test]
    fn display_includes_detail() {
        let err = Error::Hierarchy {
            folder_id: "f1".into(),
            reason: "not found".into(),
        };
        let text = err.to_string();
        assert!(text.contains("f1"));
        assert!(text.contains("not found"));
    }
}

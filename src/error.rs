//! Error types for the credit scoring harness

use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, CreditScoreError>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum CreditScoreError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError {
        line: u64,
        column: String,
        message: String,
    },

    #[error("Schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Fit error: {0}")]
    FitError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown trainer: {0}")]
    UnknownTrainer(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl CreditScoreError {
    /// Shorthand for a parse failure on a given line and column
    pub fn parse(line: u64, column: impl Into<String>, message: impl Into<String>) -> Self {
        CreditScoreError::ParseError {
            line,
            column: column.into(),
            message: message.into(),
        }
    }
}

impl From<csv::Error> for CreditScoreError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(io) => CreditScoreError::IoError(io),
            other => CreditScoreError::ParseError {
                line,
                column: String::new(),
                message: format!("{:?}", other),
            },
        }
    }
}

impl From<bincode::Error> for CreditScoreError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) => CreditScoreError::IoError(io),
            other => CreditScoreError::SerializationError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CreditScoreError {
    fn from(err: serde_json::Error) -> Self {
        CreditScoreError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CreditScoreError {
    fn from(err: ndarray::ShapeError) -> Self {
        CreditScoreError::SchemaMismatch {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CreditScoreError::parse(3, "V2", "not a number");
        assert_eq!(err.to_string(), "Parse error at line 3, column V2: not a number");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CreditScoreError = io_err.into();
        assert!(matches!(err, CreditScoreError::IoError(_)));
    }

    #[test]
    fn test_unknown_trainer_display() {
        let err = CreditScoreError::UnknownTrainer("Gam".to_string());
        assert_eq!(err.to_string(), "Unknown trainer: Gam");
    }
}

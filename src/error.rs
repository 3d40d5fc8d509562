//! Error types for QAIL Lens.
//!
//! Extraction and rewriting never fail: inputs they cannot use come back as
//! `None` or an empty list. These errors belong to the layer around the
//! engine (configuration files and command-line input).

use thiserror::Error;

/// The main error type for QAIL Lens.
#[derive(Debug, Error)]
pub enum LensError {
    /// The configuration file exists but could not be understood.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML syntax or type error in a configuration file.
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// No SQL was supplied, or it was blank.
    #[error("Invalid input: {0}")]
    Input(String),

    /// The statement is not something the requested operation applies to.
    #[error("Not applicable: {operation} needs a SELECT with a FROM clause")]
    NotApplicable { operation: &'static str },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LensError {
    /// Create a not-applicable error for the named operation.
    pub fn not_applicable(operation: &'static str) -> Self {
        Self::NotApplicable { operation }
    }
}

/// Result type alias for QAIL Lens operations.
pub type LensResult<T> = Result<T, LensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LensError::not_applicable("count");
        assert_eq!(
            err.to_string(),
            "Not applicable: count needs a SELECT with a FROM clause"
        );
    }

    #[test]
    fn test_toml_error_converts() {
        let bad: Result<toml::Value, _> = toml::from_str("lens = [");
        let err: LensError = bad.unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid config file"));
    }
}

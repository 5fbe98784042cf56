//! Error types for treasury-config

use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid YAML format: {message}")]
    InvalidYaml { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field value: {field} - {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// Dotted path of the offending field, when the error is about one
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField { field } | ConfigError::InvalidValue { field, .. } => Some(field),
            _ => None,
        }
    }

    /// One-line remedy shown next to the error at startup
    pub fn hint(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "Pass --config <path>, or write one with --print-default-config",
            ConfigError::InvalidYaml { .. } => "Compare the layout with --print-default-config",
            ConfigError::MissingField { .. } | ConfigError::InvalidValue { .. } => {
                "Fix the field named above and restart"
            }
            ConfigError::Io { .. } => "Check that the file is readable",
            ConfigError::ValidationError { .. } => "Workspace keys and column ids must be unique",
        }
    }
}

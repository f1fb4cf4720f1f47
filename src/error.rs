//! Error handling for the zone post-processing element
//!
//! Module errors ([`ConfigError`], [`LibraryError`]) convert into
//! [`PostProcessError`], which is what the element and the command line tool
//! report to the operator.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::library::LibraryError;

/// Main error type for the zone post-processing element
#[derive(Error, Debug)]
pub enum PostProcessError {
    // Configuration errors
    #[error("Configuration file not provided")]
    ConfigNotProvided,

    #[error("Configuration file parsing failed: {0}")]
    Config(#[from] ConfigError),

    #[error("No configuration loaded from {}", .0.display())]
    ConfigNotLoaded(PathBuf),

    // Custom library errors
    #[error("Custom library error: {0}")]
    Library(#[from] LibraryError),

    // I/O and file system errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Result type alias for convenience
pub type PostProcessResult<T> = std::result::Result<T, PostProcessError>;

impl From<serde_json::Error> for PostProcessError {
    fn from(err: serde_json::Error) -> Self {
        PostProcessError::Serialization(err.to_string())
    }
}

/// Error context builder for adding additional information
pub struct ErrorContext {
    base_error: PostProcessError,
    context: Vec<String>,
}

impl ErrorContext {
    pub fn new(error: PostProcessError) -> Self {
        Self {
            base_error: error,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context.push(context.to_string());
        self
    }

    pub fn build(self) -> PostProcessError {
        if self.context.is_empty() {
            self.base_error
        } else {
            PostProcessError::Unexpected(format!("{}: {}", self.context.join(" -> "), self.base_error))
        }
    }
}

/// Convenience macro for adding context to errors
#[macro_export]
macro_rules! postprocess_context {
    ($result:expr, $context:expr) => {
        $result.map_err(|e| {
            $crate::error::ErrorContext::new(e.into())
                .with_context($context)
                .build()
        })
    };
}

//! Unified error handling for scenegex
//!
//! Fatal preconditions are reported through this type before any output is
//! produced; recoverable conditions (unresolved references, degenerate
//! matrices) are handled locally by the exporter and never surface here.

use thiserror::Error;

/// Unified error type for all scenegex operations
#[derive(Error, Debug)]
pub enum Error {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The scene snapshot has no root nodes to export
    #[error("Scene has no root nodes")]
    MissingSceneRoot,

    /// A node references an object table entry that does not exist
    #[error("Node '{node}' references missing {kind} object {index}")]
    DanglingObject {
        node: String,
        kind: &'static str,
        index: usize,
    },

    /// A node references a parent or child outside the arena
    #[error("Node '{node}' has out-of-range link {index}")]
    DanglingNode { node: String, index: usize },

    /// Geometry export was requested for a mesh with no triangles
    #[error("Geometry node '{node}' has no triangles")]
    EmptyGeometry { node: String },

    /// Invalid snapshot data
    #[error("Invalid scene: {message}")]
    InvalidScene { message: String },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid scene error
    pub fn invalid_scene(message: impl Into<String>) -> Self {
        Error::InvalidScene {
            message: message.into(),
        }
    }

    /// Check if this is a fatal precondition failure
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::MissingSceneRoot
                | Error::DanglingObject { .. }
                | Error::DanglingNode { .. }
                | Error::EmptyGeometry { .. }
                | Error::InvalidScene { .. }
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::MissingSceneRoot;
        let contextualized = err.with_context("while exporting scene");

        assert!(contextualized.to_string().contains("while exporting scene"));
    }

    #[test]
    fn test_is_precondition() {
        assert!(Error::MissingSceneRoot.is_precondition());
        assert!(Error::EmptyGeometry { node: "cube".into() }.is_precondition());
        assert!(!Error::Io(std::io::Error::other("x")).is_precondition());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::MissingSceneRoot);
        let with_context = result.context("loading snapshot");

        assert!(with_context.unwrap_err().to_string().contains("loading snapshot"));
    }
}

use std::io;

use rayon::ThreadPoolBuildError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

/// Build-fatal failures. Unresolvable links, collisions and curation problems are not errors;
/// they are reported through [crate::diagnostic::Diagnostic]s and the build continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum DocweaveError {
    #[error("Invalid symbol graph '{graph}': {reason}")]
    InvalidSymbolGraph { graph: String, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl DocweaveError {
    pub fn invalid_graph(graph: impl Into<String>, reason: impl Into<String>) -> Self {
        DocweaveError::InvalidSymbolGraph {
            graph: graph.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for DocweaveError {
    fn from(src: toml::de::Error) -> DocweaveError {
        DocweaveError::InvalidConfiguration(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for DocweaveError {
    fn from(src: toml::ser::Error) -> DocweaveError {
        DocweaveError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for DocweaveError {
    fn from(src: JsonError) -> DocweaveError {
        DocweaveError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for DocweaveError {
    fn from(src: UrlParseError) -> DocweaveError {
        DocweaveError::Serialization(format!("Invalid URL: {src}"))
    }
}

impl From<io::Error> for DocweaveError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => DocweaveError::NotFound(format!("{x}")),
            _ => DocweaveError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<ThreadPoolBuildError> for DocweaveError {
    fn from(x: ThreadPoolBuildError) -> Self {
        DocweaveError::WorkerPool(format!("{x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_keep_not_found_apart() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "MyKit.symbols.json");
        assert!(matches!(DocweaveError::from(missing), DocweaveError::NotFound(_)));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "locked");
        assert!(matches!(DocweaveError::from(denied), DocweaveError::Io(_)));
    }
}

//! Error types for manifest resolution.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for clickout operations.
pub type Result<T> = std::result::Result<T, ClickoutError>;

/// Errors that can occur while resolving a deployment.
///
/// None of these are recovered inside the library; every failure aborts
/// the run that produced it.
#[derive(Debug, Error)]
pub enum ClickoutError {
    /// Manifest could not be read, is malformed, or lacks a required
    /// element or attribute.
    #[error("failed to parse manifest {}: {reason}", path.display())]
    ManifestParse { path: PathBuf, reason: String },

    /// A numeric attribute is missing or not a valid integer.
    #[error("invalid {attribute} attribute on <{element}> ({value:?}): {reason}")]
    Parse {
        element: &'static str,
        attribute: &'static str,
        value: String,
        reason: String,
    },

    /// Fetching a remote resource failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A manifest references itself through its own ancestor chain.
    #[error("manifest cycle detected at {url}")]
    CycleDetected { url: String },

    /// Recursion went deeper than the configured limit.
    #[error("manifest nesting exceeds maximum depth of {max_depth} at {url}")]
    DepthExceeded { max_depth: usize, url: String },

    /// Invalid configuration or logging setup.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClickoutError {
    pub(crate) fn manifest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ManifestParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn size(
        element: &'static str,
        value: Option<&str>,
        source: Option<ParseIntError>,
    ) -> Self {
        Self::Parse {
            element,
            attribute: "size",
            value: value.unwrap_or_default().to_string(),
            reason: source.map_or_else(|| "attribute is missing".to_string(), |e| e.to_string()),
        }
    }
}

/// Errors raised while moving bytes from a remote location to disk.
#[derive(Debug, Error)]
pub enum TransferError {
    /// HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// Request could not be sent or the body could not be read.
    #[error("failed to download {url}: {reason}")]
    Request { url: String, reason: String },

    /// Server answered with a non-success status.
    #[error("failed to download {url}: server returned {status}")]
    Status { url: String, status: u16 },

    /// Request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The URL scheme has no transport.
    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme { url: String, scheme: String },

    /// Failed to read a local source file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write the destination file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a destination directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parse_display() {
        let err = ClickoutError::manifest("app.application", "missing deploymentProvider");
        assert_eq!(
            err.to_string(),
            "failed to parse manifest app.application: missing deploymentProvider"
        );
    }

    #[test]
    fn test_size_error_missing_attribute() {
        let err = ClickoutError::size("file", None, None);
        assert!(err.to_string().contains("size"));
        assert!(err.to_string().contains("attribute is missing"));
    }

    #[test]
    fn test_size_error_malformed_value() {
        let source = "12x".parse::<u64>().unwrap_err();
        let err = ClickoutError::size("dependentAssembly", Some("12x"), Some(source));
        assert!(matches!(err, ClickoutError::Parse { .. }));
        assert!(err.to_string().contains("\"12x\""));
        assert!(err.to_string().contains("<dependentAssembly>"));
    }

    #[test]
    fn test_transfer_error_is_transparent() {
        let err: ClickoutError = TransferError::Status {
            url: "https://example.test/a".to_string(),
            status: 404,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "failed to download https://example.test/a: server returned 404"
        );
    }
}

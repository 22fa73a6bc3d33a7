//! Error types for catalog operations.
//!
//! This module provides the [`VlError`] type for all library operations
//! and the [`Result`] convenience type.

use thiserror::Error;

/// Error type for all catalog operations.
///
/// Represents the fatal conditions that can occur while fetching, parsing
/// and resolving catalog documents. Recoverable conditions (unresolvable child
/// references, unmatched download pointers, absent metadata blocks) are logged
/// and never surface as an error.
#[derive(Error, Debug)]
pub enum VlError {
    /// The document has no logical structural map and is not a catalog response.
    #[error("Missing logical structural map: {0}")]
    MissingStructMap(String),

    /// No domain type could be determined for an identifier.
    #[error("Classification failed: {0}")]
    Classification(String),

    /// A file pointer references a file id that the document does not define.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A file location uses a location type other than `URL`.
    #[error("Unsupported file location type: {0}")]
    UnsupportedLocation(String),

    /// Input that does not have the expected shape (e.g. a local snapshot
    /// without its request marker).
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Error while parsing markup.
    #[error("Markup error: {0}")]
    Markup(String),

    /// Transport failure, including non-success status codes and timeouts.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error from a local file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl VlError {
    /// Whether this error means a fetched document is not valid catalog data.
    ///
    /// The reference resolver skips such targets instead of failing the
    /// whole collection.
    #[must_use]
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, Self::MissingStructMap(_) | Self::Classification(_))
    }
}

/// Convenience type alias for [`std::result::Result`] with [`VlError`].
pub type Result<T> = std::result::Result<T, VlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_response_errors() {
        assert!(VlError::MissingStructMap("html".to_string()).is_invalid_response());
        assert!(VlError::Classification("42".to_string()).is_invalid_response());
        assert!(!VlError::Http("timeout".to_string()).is_invalid_response());
        assert!(!VlError::Markup("eof".to_string()).is_invalid_response());
    }

    #[test]
    fn test_error_messages() {
        let err = VlError::FileNotFound("IMG_MAX_1".to_string());
        assert_eq!(err.to_string(), "File not found: IMG_MAX_1");
    }
}

//! Error types shared by every content source and media resolver.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for source and resolver operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors raised while talking to a backend service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The request never produced a response (DNS, TLS, connection reset...)
    #[error("Network error: {0}")]
    Network(String),

    /// Structured non-success answer from a service
    #[error("Backend error (status {status}): {message}")]
    Backend { status: u16, message: String },

    /// The item vanished or was made private
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation unavailable for this service/track combination
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A bounded wait ran out of budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The shared cancellation signal fired
    #[error("Operation cancelled")]
    Cancelled,

    /// The backend answered with a body we could not read
    #[error("Could not decode response: {0}")]
    Decode(String),
}

/// Coarse classification of failures, as rendered by presentation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Backend { status: u16 },
    NotFound,
    Unsupported,
    Timeout,
}

impl ErrorKind {
    /// Whether a caller-side retry has a chance to succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ErrorKind::Network | ErrorKind::Timeout => true,
            ErrorKind::Backend { status } => *status == 429 || *status >= 500,
            ErrorKind::NotFound | ErrorKind::Unsupported => false,
        }
    }
}

impl SourceError {
    /// Builds an error from an HTTP status code and response text
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            404 | 410 => Self::NotFound(message.into()),
            _ => Self::Backend {
                status: code,
                message: message.into(),
            },
        }
    }

    /// Taxonomy bucket of this error.
    ///
    /// Decode errors are reported as backend errors: the service answered,
    /// but not with something we understand.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Network(_) | SourceError::Cancelled => ErrorKind::Network,
            SourceError::Backend { status, .. } => ErrorKind::Backend { status: *status },
            SourceError::Decode(_) => ErrorKind::Backend { status: 200 },
            SourceError::NotFound(_) => ErrorKind::NotFound,
            SourceError::Unsupported(_) => ErrorKind::Unsupported,
            SourceError::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Short human readable title
    pub fn title(&self) -> String {
        match self {
            SourceError::Network(_) => "Network unavailable".to_string(),
            SourceError::Backend { status, .. } if (500..600).contains(status) => {
                "Service unavailable".to_string()
            }
            SourceError::Backend { status: 401 | 403, .. } => "Access denied".to_string(),
            SourceError::Backend { .. } | SourceError::Decode(_) => "Service error".to_string(),
            SourceError::NotFound(_) => "Not found".to_string(),
            SourceError::Unsupported(_) => "Not supported".to_string(),
            SourceError::Timeout(_) => "Timed out".to_string(),
            SourceError::Cancelled => "Cancelled".to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        !matches!(self, SourceError::Cancelled) && self.kind().is_transient()
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(e.to_string())
        } else if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::from_status_code(status.as_u16(), e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert_eq!(
            SourceError::from_status_code(404, "gone").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SourceError::from_status_code(503, "down").kind(),
            ErrorKind::Backend { status: 503 }
        );
    }

    #[test]
    fn transient_errors() {
        assert!(SourceError::Network("reset".into()).is_transient());
        assert!(SourceError::from_status_code(502, "").is_transient());
        assert!(SourceError::from_status_code(429, "").is_transient());
        assert!(!SourceError::from_status_code(403, "").is_transient());
        assert!(!SourceError::Unsupported("live".into()).is_transient());
    }

    #[test]
    fn titles_are_readable() {
        assert_eq!(SourceError::from_status_code(403, "").title(), "Access denied");
        assert_eq!(SourceError::from_status_code(500, "").title(), "Service unavailable");
    }
}

//! Opaque continuation tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved token value marking an exhausted source
pub const EOL: &str = "eol";

/// Where the next fetch of a source should resume.
///
/// Each backend encodes its own pagination state (integer offset, cursor,
/// page token) into the string. Consumers only ever compare it against
/// [`EOL`]. An absent token (`Option::None`) means "first page".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaginationToken(String);

impl PaginationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The terminal token
    pub fn end() -> Self {
        Self(EOL.to_string())
    }

    /// Re-encodes a backend continuation; missing or empty becomes [`EOL`]
    pub fn next_or_end(next: Option<impl Into<String>>) -> Self {
        match next.map(Into::into) {
            Some(value) if !value.trim().is_empty() => Self(value),
            _ => Self::end(),
        }
    }

    pub fn is_end(&self) -> bool {
        self.0 == EOL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interprets the token as an integer offset (offset based backends)
    pub fn as_offset(&self) -> Option<u32> {
        self.0.parse().ok()
    }
}

impl fmt::Display for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaginationToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_next_is_end() {
        assert!(PaginationToken::next_or_end(None::<String>).is_end());
        assert!(PaginationToken::next_or_end(Some("")).is_end());
        assert!(!PaginationToken::next_or_end(Some("CAUQAA")).is_end());
    }

    #[test]
    fn offsets() {
        assert_eq!(PaginationToken::new("40").as_offset(), Some(40));
        assert_eq!(PaginationToken::end().as_offset(), None);
    }
}

//! Result of one page fetch.

use crate::error::{ErrorKind, SourceError};
use crate::token::PaginationToken;
use serde::{Deserialize, Serialize};

/// Failure payload handed to presentation code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub kind: ErrorKind,
    pub title: String,
    pub description: String,
}

impl From<&SourceError> for SourceFailure {
    fn from(error: &SourceError) -> Self {
        Self {
            kind: error.kind(),
            title: error.title(),
            description: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Failed(SourceFailure),
    /// The cancellation signal fired; never merged into a collection
    Cancelled,
}

/// Immutable outcome of [`ContentSource::fetch_page`](crate::ContentSource::fetch_page)
#[derive(Debug, Clone)]
pub struct SourceResponse<T> {
    pub items: Vec<T>,
    /// `None` only on failure or cancellation: the caller keeps its token
    pub next_token: Option<PaginationToken>,
    pub status: ResponseStatus,
}

impl<T> SourceResponse<T> {
    pub fn page(items: Vec<T>, next_token: PaginationToken) -> Self {
        Self {
            items,
            next_token: Some(next_token),
            status: ResponseStatus::Success,
        }
    }

    /// Terminal empty page, the canonical "no more data" state
    pub fn end() -> Self {
        Self::page(Vec::new(), PaginationToken::end())
    }

    pub fn failed(error: &SourceError) -> Self {
        if matches!(error, SourceError::Cancelled) {
            return Self::cancelled();
        }
        Self {
            items: Vec::new(),
            next_token: None,
            status: ResponseStatus::Failed(error.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            items: Vec::new(),
            next_token: None,
            status: ResponseStatus::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ResponseStatus::Success)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, ResponseStatus::Cancelled)
    }

    pub fn failure(&self) -> Option<&SourceFailure> {
        match &self.status {
            ResponseStatus::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn error_title(&self) -> Option<&str> {
        self.failure().map(|f| f.title.as_str())
    }

    pub fn error_description(&self) -> Option<&str> {
        self.failure().map(|f| f.description.as_str())
    }
}

/// What an adapter produces from one backend envelope
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: PaginationToken,
}

impl<T> Page<T> {
    pub fn end() -> Self {
        Self {
            items: Vec::new(),
            next: PaginationToken::end(),
        }
    }

    /// Maps raw items, dropping the ones the mapping rejects
    pub fn filter_map<U>(self, f: impl FnMut(T) -> Option<U>) -> Page<U> {
        Page {
            items: self.items.into_iter().filter_map(f).collect(),
            next: self.next,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next: self.next,
        }
    }
}

impl<T> From<crate::Result<Page<T>>> for SourceResponse<T> {
    fn from(result: crate::Result<Page<T>>) -> Self {
        match result {
            Ok(page) => SourceResponse::page(page.items, page.next),
            Err(e) => SourceResponse::failed(&e),
        }
    }
}

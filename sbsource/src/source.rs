//! The paginated fetch contract every adapter implements.

use crate::error::{Result, SourceError};
use crate::response::SourceResponse;
use crate::token::PaginationToken;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// A backend listing, one page at a time.
///
/// Implementations hold only filter state (query, selectors). They never
/// accumulate results and never retry: both belong to the caller, usually
/// an [`IncrementalCollection`](crate::IncrementalCollection).
///
/// # Contract
///
/// - `count_hint` is advisory; more or fewer items may come back.
/// - `token == None` requests the first page.
/// - A returned token equal to `"eol"` means no further pages exist, even
///   when the page carrying it is not empty.
/// - Expected failures are reported in the response, never as a panic.
/// - `cancel` is observed before and during the network operation; a
///   cancelled fetch answers [`SourceResponse::cancelled`].
#[async_trait]
pub trait ContentSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    /// Short label used in logs
    fn name(&self) -> &str;

    async fn fetch_page(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
        cancel: &CancellationToken,
    ) -> SourceResponse<Self::Item>;
}

/// Type-erased source, as handed to the playback engine
pub type BoxedSource<T> = Arc<dyn ContentSource<Item = T>>;

/// Remembers that a filter changed since the last fetch.
///
/// Adapters call [`invalidate`](TokenReset::invalidate) from every filter
/// setter, pass the caller's token through [`apply`](TokenReset::apply) in
/// `fetch_page`, and hand the response to [`settle`](TokenReset::settle).
/// Every fetch after a filter change is a first page, whatever token the
/// caller still holds, until one of them succeeds.
#[derive(Debug, Default)]
pub struct TokenReset(AtomicBool);

impl TokenReset {
    pub fn invalidate(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn apply<'a>(&self, token: Option<&'a PaginationToken>) -> Option<&'a PaginationToken> {
        if self.is_pending() { None } else { token }
    }

    /// Clears the pending reset once a first page came back.
    ///
    /// Failed or cancelled fetches leave it set: the caller retries with the
    /// token it kept, which belongs to the previous filter.
    pub fn settle<T>(&self, response: SourceResponse<T>) -> SourceResponse<T> {
        if response.is_success() {
            self.0.store(false, Ordering::SeqCst);
        }
        response
    }
}

impl Clone for TokenReset {
    fn clone(&self) -> Self {
        Self(AtomicBool::new(self.0.load(Ordering::SeqCst)))
    }
}

/// Runs `fut` unless `cancel` fires first.
///
/// The signal is checked before the future is polled at all, then raced
/// against it.
pub async fn guarded<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(SourceError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SourceError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reset_drops_the_token_until_a_page_succeeds() {
        let reset = TokenReset::default();
        let token = PaginationToken::new("40");
        assert_eq!(reset.apply(Some(&token)), Some(&token));

        reset.invalidate();
        assert_eq!(reset.apply(Some(&token)), None);

        let failed: SourceResponse<u32> =
            reset.settle(SourceResponse::failed(&SourceError::Network("down".into())));
        assert!(!failed.is_success());
        assert_eq!(reset.apply(Some(&token)), None);

        let cancelled: SourceResponse<u32> = reset.settle(SourceResponse::cancelled());
        assert!(cancelled.is_cancelled());
        assert!(reset.is_pending());

        let page = reset.settle(SourceResponse::page(vec![1u32], PaginationToken::new("10")));
        assert!(page.is_success());
        assert!(!reset.is_pending());
        assert_eq!(reset.apply(Some(&token)), Some(&token));
    }

    #[tokio::test]
    async fn guarded_checks_before_polling() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let polled = AtomicBool::new(false);
        let result: Result<u32> = guarded(&cancel, async {
            polled.store(true, Ordering::SeqCst);
            Ok(1)
        })
        .await;
        assert_eq!(result, Err(SourceError::Cancelled));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn guarded_interrupts_a_running_future() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let result: Result<u32> = guarded(&cancel, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1)
        })
        .await;
        assert_eq!(result, Err(SourceError::Cancelled));
    }
}

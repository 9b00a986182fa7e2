//! Incremental, append-only accumulation of a [`ContentSource`].
//!
//! At most one fetch is in flight per collection. A `load_more` issued
//! while a fetch is outstanding joins it instead of hitting the network a
//! second time, so pages are always appended in fetch order.
//!
//! Overlapping pages (the backend listing moved between two fetches) are
//! appended as is: items are not deduplicated.

use crate::error::SourceError;
use crate::response::{ResponseStatus, SourceFailure, SourceResponse};
use crate::source::ContentSource;
use crate::token::PaginationToken;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// What a call to [`IncrementalCollection::load_more`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was merged; the count may be zero on the terminal page
    Appended(usize),
    /// The source has no more pages; nothing was fetched
    Exhausted,
    /// The fetch failed; the token is unchanged so the call can be retried
    Failed(SourceFailure),
    /// The fetch was cancelled or made stale by a reset; nothing was merged
    Cancelled,
}

impl LoadOutcome {
    /// Number of items this call added to the buffer
    pub fn added(&self) -> usize {
        match self {
            LoadOutcome::Appended(n) => *n,
            _ => 0,
        }
    }
}

type InFlight = Shared<BoxFuture<'static, LoadOutcome>>;

struct CollectionState<S: ContentSource + ?Sized> {
    source: Arc<S>,
    items: Vec<S::Item>,
    token: Option<PaginationToken>,
    start_token: Option<PaginationToken>,
    /// Bumped by every reset; fetches started under an older generation
    /// are discarded
    generation: u64,
    cancel: CancellationToken,
    in_flight: Option<InFlight>,
    fetches: u64,
}

impl<S: ContentSource + ?Sized> CollectionState<S> {
    fn has_more(&self) -> bool {
        !self.token.as_ref().is_some_and(PaginationToken::is_end)
    }
}

/// Ordered buffer fed page by page from a [`ContentSource`].
///
/// Cloning is cheap and yields a handle on the same buffer.
pub struct IncrementalCollection<S: ContentSource + ?Sized + 'static> {
    state: Arc<Mutex<CollectionState<S>>>,
}

impl<S: ContentSource + ?Sized + 'static> Clone for IncrementalCollection<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: ContentSource + 'static> IncrementalCollection<S> {
    pub fn new(source: S) -> Self {
        Self::from_arc(Arc::new(source))
    }
}

impl<S: ContentSource + ?Sized + 'static> IncrementalCollection<S> {
    pub fn from_arc(source: Arc<S>) -> Self {
        Self::with_token(source, None)
    }

    /// Starts from a stored continuation instead of the first page.
    ///
    /// [`reset`](Self::reset) still goes back to the very first page.
    pub fn with_token(source: Arc<S>, token: Option<PaginationToken>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CollectionState {
                source,
                items: Vec::new(),
                token: token.clone(),
                start_token: token,
                generation: 0,
                cancel: CancellationToken::new(),
                in_flight: None,
                fetches: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CollectionState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches one more page and appends it.
    ///
    /// Returns [`LoadOutcome::Exhausted`] without fetching when the source
    /// already answered `"eol"`. Concurrent calls share a single fetch and
    /// all observe its outcome.
    pub async fn load_more(&self, count_hint: u32) -> LoadOutcome {
        let fetch = {
            let mut state = self.lock();
            if let Some(in_flight) = &state.in_flight {
                debug!(source = state.source.name(), "joining in-flight fetch");
                in_flight.clone()
            } else if !state.has_more() {
                return LoadOutcome::Exhausted;
            } else {
                let fetch = Self::start_fetch(&self.state, &mut state, count_hint);
                state.in_flight = Some(fetch.clone());
                fetch
            }
        };
        fetch.await
    }

    fn start_fetch(
        shared: &Arc<Mutex<CollectionState<S>>>,
        state: &mut CollectionState<S>,
        count_hint: u32,
    ) -> InFlight {
        let source = Arc::clone(&state.source);
        let token = state.token.clone();
        let generation = state.generation;
        let cancel = state.cancel.child_token();
        let shared = Arc::clone(shared);
        state.fetches += 1;

        debug!(
            source = source.name(),
            token = ?token,
            count_hint,
            "fetching page"
        );

        async move {
            let fetched = AssertUnwindSafe(source.fetch_page(count_hint, token.as_ref(), &cancel))
                .catch_unwind()
                .await;
            let response = match fetched {
                Ok(response) => response,
                Err(panic) => {
                    if cfg!(debug_assertions) {
                        std::panic::resume_unwind(panic);
                    }
                    error!(source = source.name(), "page mapping panicked");
                    SourceResponse::failed(&SourceError::Backend {
                        status: 0,
                        message: "internal error while reading the service response".into(),
                    })
                }
            };
            Self::merge(&shared, generation, response)
        }
        .boxed()
        .shared()
    }

    fn merge(
        shared: &Mutex<CollectionState<S>>,
        generation: u64,
        response: SourceResponse<S::Item>,
    ) -> LoadOutcome {
        let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation != generation {
            debug!(source = state.source.name(), "discarding stale page");
            return LoadOutcome::Cancelled;
        }
        state.in_flight = None;

        match response.status {
            ResponseStatus::Success => {
                let added = response.items.len();
                state.items.extend(response.items);
                if let Some(next) = response.next_token {
                    state.token = Some(next);
                }
                debug!(
                    source = state.source.name(),
                    added,
                    total = state.items.len(),
                    has_more = state.has_more(),
                    "page appended"
                );
                LoadOutcome::Appended(added)
            }
            ResponseStatus::Failed(failure) => {
                warn!(
                    source = state.source.name(),
                    title = %failure.title,
                    "page fetch failed: {}",
                    failure.description
                );
                LoadOutcome::Failed(failure)
            }
            ResponseStatus::Cancelled => LoadOutcome::Cancelled,
        }
    }

    /// Clears the buffer and goes back to the first page.
    ///
    /// An outstanding fetch is cancelled; if it still completes, its page
    /// is discarded.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.generation += 1;
        state.in_flight = None;
        state.items.clear();
        state.token = None;
        state.start_token = None;
        debug!(source = state.source.name(), "collection reset");
    }

    /// `false` once the source answered `"eol"`
    pub fn has_more(&self) -> bool {
        self.lock().has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Snapshot of the buffer
    pub fn items(&self) -> Vec<S::Item> {
        self.lock().items.clone()
    }

    /// Items from `start` on, used to pick up pages appended since a
    /// previous look
    pub fn items_from(&self, start: usize) -> Vec<S::Item> {
        self.lock().items.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn token(&self) -> Option<PaginationToken> {
        self.lock().token.clone()
    }

    /// Token the collection was created with, if any
    pub fn start_token(&self) -> Option<PaginationToken> {
        self.lock().start_token.clone()
    }

    /// Number of adapter calls issued so far
    pub fn fetch_count(&self) -> u64 {
        self.lock().fetches
    }

    pub fn source(&self) -> Arc<S> {
        Arc::clone(&self.lock().source)
    }
}

impl<S: ContentSource + Clone + 'static> IncrementalCollection<S> {
    /// Mutates the source filter and resets the collection.
    ///
    /// This is the only way to change a filter through a collection, so a
    /// filter change can never be followed by a page fetched with a stale
    /// token.
    pub fn update_source(&self, update: impl FnOnce(&mut S)) {
        {
            let mut state = self.lock();
            update(Arc::make_mut(&mut state.source));
        }
        self.reset();
    }
}

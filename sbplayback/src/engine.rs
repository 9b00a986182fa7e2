//! Playback queue engine
//!
//! The engine owns a [`PlaybackQueue`], the collection feeding it and the
//! resolution tasks of the materialized window. Queue state is only
//! mutated under the engine lock, never across an `.await`: network work
//! (page fetches, stream resolutions) runs in spawned tasks that re-take the
//! lock to merge their result.

use crate::error::{PlaybackError, Result};
use crate::queue::{EntryId, PlaybackQueue, QueueEntry, ResolutionState, ResolutionTicket};
use crate::settings::QueueSettings;
use crate::transport::{MAX_VOLUME, PlaybackTransport, RepeatMode, TransportState};
use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use sbsource::{
    BoxedSource, CanonicalTrack, ContentSource, IncrementalCollection, LoadOutcome, MediaResolver,
    PaginationToken, SourceError, StreamDescriptor, StreamKind, TrackKey,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Type-erased track source feeding the queue
pub type TrackSource = dyn ContentSource<Item = CanonicalTrack>;

pub type TrackCollection = IncrementalCollection<TrackSource>;

const EVENT_CAPACITY: usize = 256;

/// What to fill the queue with
pub enum QueueInit {
    /// A fixed list of tracks
    Tracks(Vec<CanonicalTrack>),
    /// The pages of a source, starting at `start_token` (first page when
    /// `None`)
    Source {
        source: BoxedSource<CanonicalTrack>,
        start_token: Option<PaginationToken>,
    },
    /// Tracks already loaded by the caller, followed by the remaining pages
    /// of their source
    Continue {
        tracks: Vec<CanonicalTrack>,
        source: BoxedSource<CanonicalTrack>,
        next_token: Option<PaginationToken>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    CurrentChanged {
        index: usize,
        track: TrackKey,
    },
    EntryResolved {
        index: usize,
        track: TrackKey,
        kind: StreamKind,
    },
    EntryFailed {
        index: usize,
        track: TrackKey,
        title: String,
        description: String,
    },
    EndOfQueue {
        direction: Direction,
    },
    PageAppended {
        added: usize,
        has_more: bool,
    },
    PageFailed {
        title: String,
        description: String,
    },
    StartTrackTimedOut {
        track: TrackKey,
        attempts: u32,
    },
    ShuffleChanged {
        enabled: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { index: usize },
    /// Already on the first/last entry and nothing more to load
    Boundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The track was found after `polls` waits
    Found { index: usize, polls: u32 },
    /// The track never showed up; playback starts at `index`
    FellBack { index: usize },
    /// The track never showed up and the queue is empty
    Empty,
}

struct EngineState {
    queue: PlaybackQueue,
    collection: Option<Arc<TrackCollection>>,
    /// Collection items already moved into the queue
    consumed: usize,
    /// Bumped by every initialize/clear; page merges from an older session
    /// are dropped
    session: u64,
    cancel: CancellationToken,
    direction: Direction,
    shuffle: bool,
    /// Entry last handed to the transport
    opened: Option<EntryId>,
    transport: TransportState,
}

struct EngineInner {
    settings: QueueSettings,
    resolver: Arc<dyn MediaResolver>,
    transport: Arc<dyn PlaybackTransport>,
    state: Mutex<EngineState>,
    appended: Notify,
    events: broadcast::Sender<QueueEvent>,
}

/// Playback queue engine, cheap to clone
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
}

/// Where a single step of a move landed
enum Landing {
    Entry { index: usize, failed: bool },
    End { has_more: bool },
}

impl PlaybackEngine {
    pub fn new(
        settings: QueueSettings,
        resolver: Arc<dyn MediaResolver>,
        transport: Arc<dyn PlaybackTransport>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let queue = PlaybackQueue::new(settings.window_size);
        Self {
            inner: Arc::new(EngineInner {
                settings,
                resolver,
                transport,
                state: Mutex::new(EngineState {
                    queue,
                    collection: None,
                    consumed: 0,
                    session: 0,
                    cancel: CancellationToken::new(),
                    direction: Direction::Forward,
                    shuffle: false,
                    opened: None,
                    transport: TransportState::default(),
                }),
                appended: Notify::new(),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: QueueEvent) {
        // no subscriber is not an error
        let _ = self.inner.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.inner.settings
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.lock().queue.current_index()
    }

    pub fn current_entry(&self) -> Option<QueueEntry> {
        self.lock().queue.current().cloned()
    }

    pub fn entry(&self, index: usize) -> Option<QueueEntry> {
        self.lock().queue.get(index).cloned()
    }

    pub fn tracks(&self) -> Vec<CanonicalTrack> {
        self.lock()
            .queue
            .entries()
            .iter()
            .map(|e| e.track().clone())
            .collect()
    }

    pub fn states(&self) -> Vec<ResolutionState> {
        self.lock()
            .queue
            .entries()
            .iter()
            .map(QueueEntry::state)
            .collect()
    }

    /// `true` while the backing source still has pages
    pub fn has_more(&self) -> bool {
        self.lock()
            .collection
            .as_ref()
            .is_some_and(|c| c.has_more())
    }

    pub fn is_shuffled(&self) -> bool {
        self.lock().shuffle
    }

    pub fn transport_state(&self) -> TransportState {
        self.lock().transport.clone()
    }

    // ------------------------------------------------------------------
    // Queue lifecycle
    // ------------------------------------------------------------------

    /// Replaces the queue content; the current index goes back to 0.
    ///
    /// With a source and no tracks, the first page is fetched before
    /// returning. Nothing is resolved eagerly beyond the window. Shuffle is
    /// turned off. Returns the queue length.
    pub async fn initialize(&self, init: QueueInit) -> Result<usize> {
        let (session, needs_first_page) = {
            let mut state = self.lock();
            Self::reset_state(&mut state);
            state.shuffle = false;

            let collection = match init {
                QueueInit::Tracks(tracks) => {
                    state.queue.append_or_init(tracks);
                    None
                }
                QueueInit::Source {
                    source,
                    start_token,
                } => Some(IncrementalCollection::with_token(source, start_token)),
                QueueInit::Continue {
                    tracks,
                    source,
                    next_token,
                } => {
                    state.queue.append_or_init(tracks);
                    Some(IncrementalCollection::with_token(source, next_token))
                }
            };
            state.collection = collection.map(Arc::new);
            info!(
                entries = state.queue.len(),
                paged = state.collection.is_some(),
                "queue initialized"
            );
            (
                state.session,
                state.collection.is_some() && state.queue.is_empty(),
            )
        };

        if needs_first_page {
            match self.load_page(session).await {
                LoadOutcome::Failed(failure) => return Err(failure.into()),
                LoadOutcome::Cancelled => return Err(PlaybackError::Cancelled),
                LoadOutcome::Appended(_) | LoadOutcome::Exhausted => {}
            }
        }

        self.after_move().await;
        Ok(self.len())
    }

    /// Appends tracks to the queue and wakes `start_track` waiters
    pub async fn enqueue(&self, tracks: Vec<CanonicalTrack>) -> usize {
        let (added, was_empty) = {
            let mut state = self.lock();
            let was_empty = state.queue.is_empty();
            (state.queue.append_or_init(tracks), was_empty)
        };
        self.inner.appended.notify_waiters();
        debug!(added, "tracks enqueued");

        if was_empty && added > 0 {
            self.after_move().await;
        } else {
            self.refresh_window();
        }
        added
    }

    /// Empties the queue and drops the backing source
    pub fn clear(&self) {
        let mut state = self.lock();
        Self::reset_state(&mut state);
        debug!("queue cleared");
    }

    fn reset_state(state: &mut EngineState) {
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.session += 1;
        state.queue.clear();
        // stops a page fetch still running for the previous session
        if let Some(collection) = state.collection.take() {
            collection.reset();
        }
        state.consumed = 0;
        state.direction = Direction::Forward;
        state.opened = None;
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Advances to the next playable entry.
    ///
    /// Failed entries are skipped. At the end of the queue the next page of
    /// the source is loaded first; when there is none the engine stays where
    /// it was, emits [`QueueEvent::EndOfQueue`] and returns
    /// [`MoveOutcome::Boundary`] (or wraps around when configured).
    pub async fn move_next(&self) -> Result<MoveOutcome> {
        let (start, session) = {
            let mut state = self.lock();
            state.direction = Direction::Forward;
            (state.queue.current_index(), state.session)
        };
        let mut wrapped = false;

        loop {
            let landing = {
                let mut state = self.lock();
                match state.queue.step_next() {
                    Some(index) => Self::landing(&state.queue, index),
                    None => Landing::End {
                        has_more: state.collection.as_ref().is_some_and(|c| c.has_more()),
                    },
                }
            };

            match landing {
                Landing::Entry { index, failed: true } => {
                    debug!(index, "skipping failed entry");
                }
                Landing::Entry { index, .. } => {
                    self.after_move().await;
                    return Ok(MoveOutcome::Moved { index });
                }
                Landing::End { has_more: true } => match self.load_page(session).await {
                    LoadOutcome::Appended(added) if added > 0 && start.is_none() => {
                        // the queue was empty: the first entry is now current
                        self.after_move().await;
                        return Ok(MoveOutcome::Moved { index: 0 });
                    }
                    LoadOutcome::Appended(_) | LoadOutcome::Exhausted => {}
                    LoadOutcome::Failed(failure) => {
                        self.restore_index(start);
                        return Err(failure.into());
                    }
                    LoadOutcome::Cancelled => {
                        self.restore_index(start);
                        return Err(PlaybackError::Cancelled);
                    }
                },
                Landing::End { has_more: false } => {
                    if self.inner.settings.wrap_around && !wrapped {
                        wrapped = true;
                        let landing = {
                            let mut state = self.lock();
                            match state.queue.set_index(0) {
                                Ok(()) => Some(Self::landing(&state.queue, 0)),
                                Err(_) => None,
                            }
                        };
                        if let Some(Landing::Entry { failed: false, .. }) = landing {
                            debug!("wrapping around to the first entry");
                            self.after_move().await;
                            return Ok(MoveOutcome::Moved { index: 0 });
                        }
                        if landing.is_some() {
                            continue;
                        }
                    }
                    return Ok(self.boundary(start, Direction::Forward));
                }
            }
        }
    }

    /// Goes back to the previous playable entry; never loads pages
    pub async fn move_previous(&self) -> Result<MoveOutcome> {
        let start = {
            let mut state = self.lock();
            state.direction = Direction::Backward;
            state.queue.current_index()
        };
        let mut wrapped = false;

        loop {
            let landing = {
                let mut state = self.lock();
                match state.queue.step_previous() {
                    Some(index) => Some(Self::landing(&state.queue, index)),
                    None if self.inner.settings.wrap_around && !wrapped => {
                        wrapped = true;
                        match state.queue.len().checked_sub(1) {
                            Some(last) if state.queue.set_index(last).is_ok() => {
                                debug!("wrapping around to the last entry");
                                Some(Self::landing(&state.queue, last))
                            }
                            _ => None,
                        }
                    }
                    None => None,
                }
            };

            match landing {
                Some(Landing::Entry { index, failed: true }) => {
                    debug!(index, "skipping failed entry");
                }
                Some(Landing::Entry { index, .. }) => {
                    self.after_move().await;
                    return Ok(MoveOutcome::Moved { index });
                }
                Some(Landing::End { .. }) | None => {
                    return Ok(self.boundary(start, Direction::Backward));
                }
            }
        }
    }

    /// Makes `track` current, waiting for it to be appended if needed.
    ///
    /// The queue may still be filling up on another task when a caller asks
    /// for a track: presence is checked at most `start_poll_attempts` times
    /// (the first check included), `start_poll_delay` apart, waking early
    /// whenever entries are appended. When the track never shows up,
    /// playback falls back to the first entry.
    ///
    /// A target that previously failed to resolve is resolved again; if it
    /// fails once more it is skipped like any failed current entry.
    pub async fn start_track(&self, track: &CanonicalTrack) -> StartOutcome {
        let key = track.key();
        let attempts = self.inner.settings.start_poll_attempts;
        let delay = self.inner.settings.start_poll_delay;
        let mut polls = 0u32;

        loop {
            let notified = self.inner.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let found = {
                let mut state = self.lock();
                state.direction = Direction::Forward;
                match state.queue.position_of(&key) {
                    Some(index) => state.queue.set_index(index).ok().map(|()| {
                        state.queue.retry_failed(index);
                        index
                    }),
                    None => None,
                }
            };
            if let Some(index) = found {
                debug!(track = %key, index, polls, "start track");
                self.after_move().await;
                return StartOutcome::Found { index, polls };
            }

            if polls + 1 >= attempts {
                break;
            }
            polls += 1;
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }

        warn!(track = %key, attempts, "track never reached the queue, starting from the first entry");
        self.emit(QueueEvent::StartTrackTimedOut {
            track: key,
            attempts,
        });

        let fallback = {
            let mut state = self.lock();
            state.direction = Direction::Forward;
            state.queue.set_index(0).ok().map(|()| {
                state.queue.retry_failed(0);
            })
        };
        match fallback {
            Some(()) => {
                self.after_move().await;
                StartOutcome::FellBack { index: 0 }
            }
            None => StartOutcome::Empty,
        }
    }

    /// Shuffles the entries after the current one, or restores their
    /// insertion order. The current entry does not move.
    pub async fn shuffle_playlist(&self, enable: bool) {
        {
            let mut state = self.lock();
            state.shuffle = enable;
            if enable {
                state.queue.shuffle_upcoming(&mut rand::rng());
            } else {
                state.queue.restore_upcoming_order();
            }
        }
        info!(enabled = enable, "shuffle");
        self.emit(QueueEvent::ShuffleChanged { enabled: enable });
        self.refresh_window();
    }

    fn landing(queue: &PlaybackQueue, index: usize) -> Landing {
        let failed = queue
            .get(index)
            .is_some_and(|e| e.state() == ResolutionState::Failed);
        Landing::Entry { index, failed }
    }

    fn restore_index(&self, index: Option<usize>) {
        if let Some(index) = index {
            let _ = self.lock().queue.set_index(index);
        }
    }

    fn boundary(&self, start: Option<usize>, direction: Direction) -> MoveOutcome {
        self.restore_index(start);
        self.refresh_window();
        debug!(direction = ?direction, "end of queue");
        self.emit(QueueEvent::EndOfQueue { direction });
        MoveOutcome::Boundary
    }

    /// Window upkeep after the current entry changed
    async fn after_move(&self) {
        self.refresh_window();
        let current = {
            let state = self.lock();
            state
                .queue
                .current_index()
                .zip(state.queue.current().map(|e| e.track().key()))
        };
        if let Some((index, track)) = current {
            self.emit(QueueEvent::CurrentChanged { index, track });
        }
        self.sync_transport().await;
        self.maybe_prefetch_page();
    }

    // ------------------------------------------------------------------
    // Window and resolution
    // ------------------------------------------------------------------

    /// Evicts entries outside the window and starts the resolutions the
    /// prefetch range needs
    fn refresh_window(&self) {
        let tickets = {
            let mut state = self.lock();
            let evicted = state.queue.evict_outside();
            let parent = state.cancel.clone();
            let tickets = state.queue.claim_resolutions(Utc::now(), &parent);
            if evicted > 0 || !tickets.is_empty() {
                debug!(
                    index = ?state.queue.current_index(),
                    evicted,
                    resolving = tickets.len(),
                    "window refreshed"
                );
            }
            tickets
        };
        for ticket in tickets {
            self.spawn_resolution(ticket);
        }
    }

    fn spawn_resolution(&self, ticket: ResolutionTicket) {
        let engine = self.clone();
        tokio::spawn(async move {
            let outcome = engine
                .inner
                .resolver
                .resolve(&ticket.track, &ticket.cancel)
                .await;
            engine.finish_resolution(ticket.id, ticket.epoch, outcome).await;
        });
    }

    /// Merges a resolution result; a failed current entry is skipped in
    /// the direction of travel
    fn finish_resolution(
        &self,
        id: EntryId,
        epoch: u64,
        outcome: std::result::Result<StreamDescriptor, SourceError>,
    ) -> BoxFuture<'static, ()> {
        let engine = self.clone();
        async move {
            let merged = {
                let mut state = engine.lock();
                state.queue.complete(id, epoch, outcome).and_then(|(index, resolution)| {
                    let entry = state.queue.get(index)?;
                    let is_current = state.queue.current_index() == Some(index);
                    Some((
                        index,
                        resolution,
                        entry.track().key(),
                        entry.stream().map(|s| s.kind),
                        entry.failure().cloned(),
                        is_current,
                        state.direction,
                    ))
                })
            };
            let Some((index, resolution, track, kind, failure, is_current, direction)) = merged
            else {
                debug!(entry = id, "dropping stale resolution");
                return;
            };

            match resolution {
                ResolutionState::Resolved => {
                    debug!(index, track = %track, "entry resolved");
                    if let Some(kind) = kind {
                        engine.emit(QueueEvent::EntryResolved { index, track, kind });
                    }
                    if is_current {
                        engine.sync_transport().await;
                    }
                }
                ResolutionState::Failed => {
                    let (title, description) = failure
                        .map(|f| (f.title, f.description))
                        .unwrap_or_default();
                    warn!(index, track = %track, title = title.as_str(), "resolution failed: {}", description);
                    engine.emit(QueueEvent::EntryFailed {
                        index,
                        track,
                        title,
                        description,
                    });
                    if is_current {
                        let skipped = match direction {
                            Direction::Forward => engine.move_next().await,
                            Direction::Backward => engine.move_previous().await,
                        };
                        if let Err(e) = skipped {
                            warn!("could not skip failed entry: {}", e);
                        }
                    }
                }
                ResolutionState::Unresolved | ResolutionState::Resolving => {}
            }
        }
        .boxed()
    }

    /// Hands the current entry to the transport once it is resolved
    async fn sync_transport(&self) {
        let pending = {
            let mut state = self.lock();
            let ready = state.queue.current().and_then(|entry| {
                if entry.state() != ResolutionState::Resolved {
                    return None;
                }
                let stream = entry.stream()?.clone();
                Some((entry.id(), entry.track().clone(), stream))
            });
            match ready {
                Some((id, track, stream)) if state.opened != Some(id) => {
                    state.opened = Some(id);
                    Some((track, stream))
                }
                _ => None,
            }
        };

        let Some((track, stream)) = pending else {
            return;
        };
        if let Err(e) = self.inner.transport.open(&track, &stream).await {
            warn!(track = %track.key(), "transport refused the stream: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    /// Loads one page of the backing source into the queue.
    ///
    /// Concurrent calls share the same fetch through the collection; the
    /// items are appended once.
    async fn load_page(&self, session: u64) -> LoadOutcome {
        let collection = {
            let state = self.lock();
            if state.session != session {
                return LoadOutcome::Cancelled;
            }
            match &state.collection {
                Some(collection) => Arc::clone(collection),
                None => return LoadOutcome::Exhausted,
            }
        };

        let outcome = collection.load_more(self.inner.settings.page_size).await;
        match &outcome {
            LoadOutcome::Appended(_) => {
                let added = {
                    let mut state = self.lock();
                    if state.session != session {
                        return LoadOutcome::Cancelled;
                    }
                    let fresh = collection.items_from(state.consumed);
                    state.consumed += fresh.len();
                    state.queue.append_or_init(fresh)
                };
                let has_more = collection.has_more();
                self.inner.appended.notify_waiters();
                debug!(added, has_more, "page appended to the queue");
                self.emit(QueueEvent::PageAppended { added, has_more });
                if added > 0 {
                    self.refresh_window();
                    self.sync_transport().await;
                }
            }
            LoadOutcome::Failed(failure) => {
                self.emit(QueueEvent::PageFailed {
                    title: failure.title.clone(),
                    description: failure.description.clone(),
                });
            }
            LoadOutcome::Exhausted | LoadOutcome::Cancelled => {}
        }
        outcome
    }

    /// Starts a background page fetch once the current entry is within one
    /// window of the end
    fn maybe_prefetch_page(&self) {
        let session = {
            let state = self.lock();
            let Some(collection) = &state.collection else {
                return;
            };
            if state.queue.upcoming_len() >= state.queue.window_size()
                || !collection.has_more()
                || collection.is_loading()
            {
                return;
            }
            state.session
        };
        debug!("prefetching next page");
        let engine = self.clone();
        tokio::spawn(async move {
            engine.load_page(session).await;
        });
    }

    // ------------------------------------------------------------------
    // Transport setters
    // ------------------------------------------------------------------

    /// Volume, clamped to `0..=MAX_VOLUME`
    pub async fn set_volume(&self, volume: u16) -> Result<()> {
        let volume = volume.min(MAX_VOLUME);
        self.lock().transport.volume = volume;
        self.inner.transport.set_volume(volume).await
    }

    pub async fn mute(&self, muted: bool) -> Result<()> {
        self.lock().transport.muted = muted;
        self.inner.transport.set_muted(muted).await
    }

    pub async fn repeat(&self, mode: RepeatMode) -> Result<()> {
        self.lock().transport.repeat = mode;
        self.inner.transport.set_repeat(mode).await
    }

    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.lock().transport.position = position;
        self.inner.transport.seek(position).await
    }
}

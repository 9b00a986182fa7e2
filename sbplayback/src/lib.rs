//! # sbplayback - Playback queue engine for SBMusic
//!
//! The engine plays an ordered queue of canonical tracks coming from a fixed
//! list or from the pages of a [`ContentSource`](sbsource::ContentSource).
//!
//! - Streams are resolved lazily: only a window of K entries around the
//!   current one (`[index-1, index+K-2]`) may hold a resolved or resolving
//!   stream. Entries leaving the window go back to `Unresolved`.
//! - Entries whose resolution fails are marked `Failed` and skipped.
//! - Reaching the end of the queue loads the next page of the source, and a
//!   page is prefetched in the background when the end gets close.
//! - `start_track` waits a bounded time for a track still being appended,
//!   then falls back to the first entry.
//!
//! ```rust,ignore
//! use sbplayback::{LoggingTransport, PlaybackEngine, QueueInit, QueueSettings};
//!
//! let engine = PlaybackEngine::new(settings, resolver, Arc::new(LoggingTransport));
//! engine.initialize(QueueInit::Source { source, start_token: None }).await?;
//! while let MoveOutcome::Moved { .. } = engine.move_next().await? {}
//! ```

pub mod engine;
pub mod error;
pub mod queue;
pub mod settings;
pub mod transport;

pub use engine::{
    Direction, MoveOutcome, PlaybackEngine, QueueEvent, QueueInit, StartOutcome, TrackCollection,
    TrackSource,
};
pub use error::{PlaybackError, Result};
pub use queue::{EntryId, PlaybackQueue, QueueEntry, ResolutionState};
pub use settings::QueueSettings;
pub use transport::{LoggingTransport, PlaybackTransport, RepeatMode, TransportState};

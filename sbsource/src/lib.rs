//! # sbsource - Common types for SBMusic content sources
//!
//! This crate holds everything the backend adapters and the playback engine
//! agree on:
//!
//! - the canonical model ([`CanonicalTrack`], [`CanonicalUser`], ...)
//! - the paginated fetch contract ([`ContentSource`], [`PaginationToken`],
//!   [`SourceResponse`])
//! - the [`IncrementalCollection`] that accumulates pages for a consumer
//! - the [`MediaResolver`] contract and its per-service dispatch
//! - the shared HTTP transport and authentication store
//!
//! ## Example
//!
//! ```rust,ignore
//! use sbsource::{IncrementalCollection, LoadOutcome};
//!
//! let collection = IncrementalCollection::new(source);
//! while let LoadOutcome::Appended(_) = collection.load_more(50).await {}
//! println!("{} items", collection.len());
//! ```

pub mod collection;
pub mod error;
pub mod model;
pub mod resolver;
pub mod response;
pub mod retry;
pub mod source;
pub mod token;
pub mod transport;

pub use collection::{IncrementalCollection, LoadOutcome};
pub use error::{ErrorKind, Result, SourceError};
pub use model::{
    CanonicalComment, CanonicalPlaylist, CanonicalPodcast, CanonicalTrack, CanonicalUser,
    ServiceType, TrackKey, TrackKind, UserRef,
};
pub use resolver::{MediaResolver, ResolverRegistry, StreamDescriptor, StreamKind};
pub use response::{Page, ResponseStatus, SourceFailure, SourceResponse};
pub use retry::{Backoff, load_with_retry};
pub use source::{BoxedSource, ContentSource, TokenReset, guarded};
pub use token::{EOL, PaginationToken};
pub use transport::{AuthStore, ConfigAuthStore, HttpTransport, ServiceContext, StaticAuthStore};

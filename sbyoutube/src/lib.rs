//! # sbyoutube - YouTube backend for SBMusic
//!
//! Content sources over the YouTube Data API v3 (video search, channel
//! search, comment threads) and a media resolver over the player endpoint.
//!
//! Listings are paginated with the API's own `nextPageToken`, carried
//! verbatim in the continuation token. Page sizes are clamped to the
//! `1..=50` range the API accepts.
//!
//! ```rust,ignore
//! use sbyoutube::{YouTubeClient, YouTubeTrackSearchSource};
//!
//! let client = YouTubeClient::from_config(context, &config);
//! let source = YouTubeTrackSearchSource::new(client, "lofi hip hop");
//! let page = source.fetch_page(25, None, &cancel).await;
//! ```

pub mod client;
pub mod config_ext;
pub mod mapping;
pub mod models;
pub mod resolver;
pub mod sources;

pub use client::{ClientBuilder, YouTubeClient};
pub use config_ext::YouTubeConfigExt;
pub use resolver::YouTubeResolver;
pub use sources::{YouTubeChannelSearchSource, YouTubeCommentSource, YouTubeTrackSearchSource};

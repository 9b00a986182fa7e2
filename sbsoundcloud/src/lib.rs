//! # sbsoundcloud - SoundCloud backend for SBMusic
//!
//! This crate maps the SoundCloud public API onto the common
//! [`sbsource`] contracts:
//!
//! - one [`ContentSource`](sbsource::ContentSource) per listing (track and
//!   user search, charts, likes, comments, user playlists)
//! - a [`MediaResolver`](sbsource::MediaResolver) turning a track into a
//!   progressive MP3 URL or an HLS manifest
//!
//! Offset based listings encode the integer offset in the continuation
//! token; the likes listing carries the backend cursor as is.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sbsoundcloud::{SoundCloudClient, SoundCloudTrackSearchSource};
//! use sbsource::IncrementalCollection;
//!
//! let client = SoundCloudClient::from_config(context, &config);
//! let tracks = IncrementalCollection::new(SoundCloudTrackSearchSource::new(client, "lofi"));
//! tracks.load_more(50).await;
//! ```

pub mod client;
pub mod config_ext;
pub mod mapping;
pub mod models;
pub mod resolver;
pub mod sources;

pub use client::{ClientBuilder, SoundCloudClient};
pub use config_ext::SoundCloudConfigExt;
pub use resolver::SoundCloudResolver;
pub use sources::{
    ChartKind, SoundCloudChartSource, SoundCloudCommentSource, SoundCloudTrackSearchSource,
    SoundCloudUserLikesSource, SoundCloudUserPlaylistSource, SoundCloudUserSearchSource,
};

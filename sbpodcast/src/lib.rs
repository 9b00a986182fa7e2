//! # sbpodcast - Podcast directory search for SBMusic
//!
//! A single content source over the iTunes Search API
//! (`/search?entity=podcast`). The directory has no pagination: the whole
//! answer is one page, always closed with the `"eol"` token.
//!
//! ```rust,ignore
//! use sbpodcast::{ITunesClient, PodcastSearchSource};
//!
//! let client = ITunesClient::from_config(context, &config);
//! let source = PodcastSearchSource::new(client, "rust");
//! let page = source.fetch_page(50, None, &cancel).await;
//! ```

pub mod client;
pub mod config_ext;
pub mod mapping;
pub mod models;
pub mod sources;

pub use client::{ClientBuilder, ITunesClient};
pub use config_ext::PodcastConfigExt;
pub use sources::PodcastSearchSource;

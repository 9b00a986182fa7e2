//! Data models for the iTunes Search API

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItunesSearchResponse {
    #[serde(default)]
    pub result_count: u64,
    #[serde(default)]
    pub results: Vec<ItunesPodcast>,
}

/// One `entity=podcast` result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItunesPodcast {
    /// Absent on results that are not collections
    #[serde(default)]
    pub collection_id: Option<u64>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default)]
    pub artwork_url600: Option<String>,
    #[serde(default)]
    pub artwork_url100: Option<String>,
    #[serde(default)]
    pub primary_genre_name: Option<String>,
    #[serde(default)]
    pub track_count: Option<u64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub collection_view_url: Option<String>,
}

//! Modèles de données renvoyés par l'API SoundCloud
//!
//! Ces structures reflètent les payloads JSON tels quels ; la conversion
//! vers le modèle canonique se fait dans [`crate::mapping`].

use serde::{Deserialize, Deserializer};

/// Les IDs SoundCloud sont numériques mais on les manipule en String
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("ID must be a string or number")),
    }
}

/// Enveloppe `linked_partitioning` commune à toutes les listes
#[derive(Debug, Clone, Deserialize)]
pub struct ScCollection<T> {
    #[serde(default = "Vec::new")]
    pub collection: Vec<T>,
    #[serde(default)]
    pub next_href: Option<String>,
}

/// Utilisateur SoundCloud
#[derive(Debug, Clone, Deserialize)]
pub struct ScUser {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub track_count: Option<u64>,
}

/// Piste SoundCloud (API v1 et v2)
#[derive(Debug, Clone, Deserialize)]
pub struct ScTrack {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    /// Durée en millisecondes
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub likes_count: Option<u64>,
    /// Ancien nom de `likes_count` (API v1)
    #[serde(default)]
    pub favoritings_count: Option<u64>,
    #[serde(default)]
    pub playback_count: Option<u64>,
    #[serde(default)]
    pub comment_count: Option<u64>,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub user: Option<ScUser>,
}

/// Playlist SoundCloud
#[derive(Debug, Clone, Deserialize)]
pub struct ScPlaylist {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub track_count: Option<u64>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub user: Option<ScUser>,
    #[serde(default)]
    pub tracks: Vec<ScTrack>,
}

/// Commentaire SoundCloud
#[derive(Debug, Clone, Deserialize)]
pub struct ScComment {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<ScUser>,
    #[serde(deserialize_with = "deserialize_id")]
    pub track_id: String,
    /// Position dans la piste, en millisecondes
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Entrée du classement (API v2)
#[derive(Debug, Clone, Deserialize)]
pub struct ScChartItem {
    pub track: ScTrack,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Entrée de la liste des likes (API v2) ; la piste a pu être supprimée
#[derive(Debug, Clone, Deserialize)]
pub struct ScLikeItem {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub track: Option<ScTrack>,
}

/// Réponse de `/tracks/{id}/streams`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScStreams {
    #[serde(default)]
    pub http_mp3_128_url: Option<String>,
    #[serde(default)]
    pub hls_mp3_128_url: Option<String>,
    #[serde(default)]
    pub hls_opus_64_url: Option<String>,
    #[serde(default)]
    pub preview_mp3_128_url: Option<String>,
}

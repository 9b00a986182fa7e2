//! Client HTTP pour l'API SoundCloud
//!
//! Le client ne fait que construire les requêtes et décoder l'enveloppe
//! `linked_partitioning` ; il ne garde aucun état de pagination.

use crate::config_ext::SoundCloudConfigExt;
use crate::models::{ScCollection, ScStreams, ScTrack};
use sbconfig::Config;
use sbsource::{Page, PaginationToken, Result, ServiceContext, ServiceType};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// URL de base de l'API SoundCloud v1
pub const DEFAULT_API_BASE: &str = "https://api.soundcloud.com";

/// URL de base de l'API SoundCloud v2
pub const DEFAULT_API_V2_BASE: &str = "https://api-v2.soundcloud.com";

/// Version d'API visée par une requête
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Api {
    V1,
    V2,
}

/// Client SoundCloud partagé par les sources et le résolveur
#[derive(Clone)]
pub struct SoundCloudClient {
    context: ServiceContext,
    client_id: Option<String>,
    api_base: String,
    api_v2_base: String,
}

impl SoundCloudClient {
    /// Crée un builder pour configurer le client
    pub fn builder(context: ServiceContext) -> ClientBuilder {
        ClientBuilder {
            context,
            client_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
            api_v2_base: DEFAULT_API_V2_BASE.to_string(),
        }
    }

    /// Crée un client à partir de `services.soundcloud.*`
    pub fn from_config(context: ServiceContext, config: &Config) -> Self {
        let mut builder = Self::builder(context)
            .api_base(config.get_soundcloud_api_base())
            .api_v2_base(config.get_soundcloud_api_v2_base());
        if let Some(client_id) = config.get_soundcloud_client_id() {
            builder = builder.client_id(client_id);
        }
        builder.build()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    fn base(&self, api: Api) -> &str {
        match api {
            Api::V1 => &self.api_base,
            Api::V2 => &self.api_v2_base,
        }
    }

    /// Effectue une requête GET à l'API
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        api: Api,
        endpoint: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base(api), endpoint);
        if let Some(client_id) = &self.client_id {
            params.push(("client_id", client_id.clone()));
        }
        let token = self.context.token(ServiceType::SoundCloud);
        self.context
            .transport
            .get_json(&url, &params, token.as_deref())
            .await
    }

    /// Récupère une page d'une liste `linked_partitioning`.
    ///
    /// `cursor_key` est le paramètre de pagination propre à l'endpoint
    /// (`offset` ou `cursor`) ; sa valeur est relue dans `next_href`.
    pub(crate) async fn collection<R: DeserializeOwned>(
        &self,
        api: Api,
        endpoint: &str,
        mut params: Vec<(&'static str, String)>,
        limit: u32,
        token: Option<&PaginationToken>,
        cursor_key: &'static str,
    ) -> Result<Page<R>> {
        if token.is_some_and(PaginationToken::is_end) {
            return Ok(Page::end());
        }

        params.push(("limit", limit.to_string()));
        params.push(("linked_partitioning", "1".to_string()));
        if let Some(token) = token {
            params.push((cursor_key, token.to_string()));
        }

        let envelope: ScCollection<R> = self.get(api, endpoint, params).await?;
        let next = next_token(envelope.next_href.as_deref(), cursor_key);
        debug!(
            endpoint,
            items = envelope.collection.len(),
            next = %next,
            "soundcloud page"
        );
        Ok(Page {
            items: envelope.collection,
            next,
        })
    }

    /// Récupère une piste par son ID
    pub async fn track(&self, id: &str) -> Result<ScTrack> {
        self.get(Api::V1, &format!("/tracks/{}", id), Vec::new())
            .await
    }

    /// Récupère les URLs de flux d'une piste
    pub(crate) async fn streams(&self, id: &str) -> Result<ScStreams> {
        self.get(Api::V1, &format!("/tracks/{}/streams", id), Vec::new())
            .await
    }
}

/// Extrait la continuation de `next_href`; absente ou vide, c'est la fin
pub(crate) fn next_token(next_href: Option<&str>, cursor_key: &str) -> PaginationToken {
    let value = next_href
        .and_then(|href| Url::parse(href).ok())
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == cursor_key)
                .map(|(_, v)| v.into_owned())
        });
    PaginationToken::next_or_end(value)
}

/// Builder pour [`SoundCloudClient`]
pub struct ClientBuilder {
    context: ServiceContext,
    client_id: Option<String>,
    api_base: String,
    api_v2_base: String,
}

impl ClientBuilder {
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Remplace l'URL de l'API v1 (utile pour les tests)
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Remplace l'URL de l'API v2 (utile pour les tests)
    pub fn api_v2_base(mut self, api_v2_base: impl Into<String>) -> Self {
        self.api_v2_base = api_v2_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn build(self) -> SoundCloudClient {
        SoundCloudClient {
            context: self.context,
            client_id: self.client_id,
            api_base: self.api_base,
            api_v2_base: self.api_v2_base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_token_from_href() {
        let href = "https://api.soundcloud.com/tracks?q=x&limit=10&offset=20&linked_partitioning=1";
        assert_eq!(next_token(Some(href), "offset").as_str(), "20");

        let cursor = "https://api-v2.soundcloud.com/users/7/track_likes?cursor=1512%3A99&limit=2";
        assert_eq!(next_token(Some(cursor), "cursor").as_str(), "1512:99");
    }

    #[test]
    fn test_missing_next_is_end() {
        assert!(next_token(None, "offset").is_end());
        assert!(next_token(Some(""), "offset").is_end());
        assert!(next_token(Some("https://api.soundcloud.com/tracks?limit=10"), "offset").is_end());
    }
}

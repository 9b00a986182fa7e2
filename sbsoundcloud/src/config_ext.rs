//! Extension pour intégrer la configuration SoundCloud dans sbconfig
//!
//! Ce module fournit le trait `SoundCloudConfigExt` qui ajoute à
//! `sbconfig::Config` la lecture des paramètres SoundCloud
//! (`services.soundcloud.*`).

use crate::client::{DEFAULT_API_BASE, DEFAULT_API_V2_BASE};
use sbconfig::Config;

/// Trait d'extension pour lire la configuration SoundCloud
///
/// # Exemple
///
/// ```rust,ignore
/// use sbsoundcloud::SoundCloudConfigExt;
///
/// let config = sbconfig::Config::load_config("")?;
/// if let Some(client_id) = config.get_soundcloud_client_id() {
///     println!("SoundCloud client id: {}", client_id);
/// }
/// ```
pub trait SoundCloudConfigExt {
    /// Client ID de l'application, ou None si non configuré
    fn get_soundcloud_client_id(&self) -> Option<String>;

    /// URL de base de l'API v1
    fn get_soundcloud_api_base(&self) -> String;

    /// URL de base de l'API v2 (charts, likes)
    fn get_soundcloud_api_v2_base(&self) -> String;
}

impl SoundCloudConfigExt for Config {
    fn get_soundcloud_client_id(&self) -> Option<String> {
        self.get_service_value("soundcloud", "client_id")
    }

    fn get_soundcloud_api_base(&self) -> String {
        self.get_service_value("soundcloud", "api_base")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    fn get_soundcloud_api_v2_base(&self) -> String {
        self.get_service_value("soundcloud", "api_v2_base")
            .unwrap_or_else(|| DEFAULT_API_V2_BASE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(config.get_soundcloud_client_id(), None);
        assert_eq!(config.get_soundcloud_api_base(), DEFAULT_API_BASE);
        assert_eq!(config.get_soundcloud_api_v2_base(), DEFAULT_API_V2_BASE);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_yaml_str(
            "services:\n  soundcloud:\n    client_id: abc\n    api_base: http://localhost:1234\n",
        )
        .unwrap();
        assert_eq!(config.get_soundcloud_client_id().as_deref(), Some("abc"));
        assert_eq!(config.get_soundcloud_api_base(), "http://localhost:1234");
    }
}

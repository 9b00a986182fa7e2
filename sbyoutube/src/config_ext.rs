//! Configuration extension for YouTube
//!
//! Adds typed access to `services.youtube.*` on `sbconfig::Config`.

use crate::client::{DEFAULT_API_BASE, DEFAULT_PLAYER_BASE};
use sbconfig::Config;

/// Extension trait for YouTube settings
pub trait YouTubeConfigExt {
    /// Data API key, or None if not configured
    fn get_youtube_api_key(&self) -> Option<String>;

    /// Base URL of the Data API v3
    fn get_youtube_api_base(&self) -> String;

    /// Base URL of the player endpoint used for stream resolution
    fn get_youtube_player_base(&self) -> String;
}

impl YouTubeConfigExt for Config {
    fn get_youtube_api_key(&self) -> Option<String> {
        self.get_service_value("youtube", "api_key")
    }

    fn get_youtube_api_base(&self) -> String {
        self.get_service_value("youtube", "api_base")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    fn get_youtube_player_base(&self) -> String {
        self.get_service_value("youtube", "player_base")
            .unwrap_or_else(|| DEFAULT_PLAYER_BASE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_settings() {
        let config =
            Config::from_yaml_str("services:\n  youtube:\n    api_key: AIza-test\n").unwrap();
        assert_eq!(config.get_youtube_api_key().as_deref(), Some("AIza-test"));
        assert_eq!(config.get_youtube_api_base(), DEFAULT_API_BASE);
        assert_eq!(config.get_youtube_player_base(), DEFAULT_PLAYER_BASE);
    }
}

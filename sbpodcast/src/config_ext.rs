//! Configuration extension for the podcast directory
//!
//! Adds typed access to `services.itunes.*` on `sbconfig::Config`.

use crate::client::{DEFAULT_API_BASE, DEFAULT_COUNTRY};
use sbconfig::Config;

/// Extension trait for podcast directory settings
pub trait PodcastConfigExt {
    /// Base URL of the iTunes Search API
    fn get_itunes_api_base(&self) -> String;

    /// Storefront searched (two letter country code)
    fn get_itunes_country(&self) -> String;
}

impl PodcastConfigExt for Config {
    fn get_itunes_api_base(&self) -> String {
        self.get_service_value("itunes", "api_base")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    fn get_itunes_country(&self) -> String {
        self.get_service_value("itunes", "country")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itunes_settings() {
        let config = Config::from_yaml_str("services:\n  itunes:\n    country: fr\n").unwrap();
        assert_eq!(config.get_itunes_country(), "fr");
        assert_eq!(config.get_itunes_api_base(), DEFAULT_API_BASE);

        let config = Config::from_yaml_str("services:\n  itunes:\n    country: \"\"\n").unwrap();
        assert_eq!(config.get_itunes_country(), DEFAULT_COUNTRY);
    }
}

//! # SBMusic Configuration Module
//!
//! This module provides the read-only settings store used by the SBMusic crates:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters with defaults for every tunable
//!
//! The store is never written back by the core: settings screens and other
//! writers live outside of this workspace.
//!
//! ## Usage
//!
//! ```no_run
//! use sbconfig::Config;
//! use std::sync::Arc;
//!
//! let config = Arc::new(Config::load_config("")?);
//!
//! let page_size = config.get_page_size()?;
//! let window = config.get_window_size()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde_yaml::{Mapping, Value};
use std::{env, fs, path::Path};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("sbmusic.yaml");

const ENV_CONFIG_DIR: &str = "SBMUSIC_CONFIG";
const ENV_PREFIX: &str = "SBMUSIC_CONFIG__";

// Default values for configuration
const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_WINDOW_SIZE: usize = 5;
const DEFAULT_START_POLL_ATTEMPTS: usize = 50;
const DEFAULT_START_POLL_DELAY_MS: usize = 50;
const DEFAULT_HTTP_TIMEOUT_SECS: usize = 30;
const DEFAULT_RETRY_MAX_ATTEMPTS: usize = 3;
const DEFAULT_RETRY_INITIAL_DELAY_MS: usize = 250;
const DEFAULT_RETRY_MAX_DELAY_MS: usize = 5000;
const DEFAULT_DEBUG: bool = false;
const DEFAULT_WRAP_AROUND: bool = false;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_USER_AGENT: &str = "SBMusic/0.1 (sbsource)";

/// Macro to generate a getter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) if n.is_u64() => Ok(n.as_u64().unwrap_or_default() as usize),
                Ok(Value::String(s)) => Ok(s.trim().parse().unwrap_or($default)),
                _ => Ok($default),
            }
        }
    };
}

/// Macro to generate a getter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }
    };
}

/// Configuration manager for SBMusic
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters for configuration values
///
/// A `Config` is built once at start-up and shared as `Arc<Config>` with
/// every component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Value,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".sbmusic").exists() {
            return ".sbmusic".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".sbmusic");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".sbmusic".to_string()
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `SBMUSIC_CONFIG` environment variable
    /// 3. `.sbmusic` in the current directory
    /// 4. `.sbmusic` in the user's home directory
    ///
    /// A missing directory or file is not an error: the embedded defaults
    /// are used as is.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let external = match fs::read(&path) {
            Ok(data) => {
                info!(config_file=%path, "Loaded config file");
                Some(serde_yaml::from_slice::<Value>(&data)?)
            }
            Err(_) => {
                info!(config_file=%path, "Config file not found, using default embedded config");
                None
            }
        };

        let mut data = Self::merged_defaults(external.as_ref())?;
        Self::apply_env_overrides(&mut data);

        Ok(Config {
            config_dir,
            path,
            data,
        })
    }

    /// Builds a configuration from an in-memory YAML document merged over
    /// the embedded defaults. Environment overrides are not applied.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let external: Value = serde_yaml::from_str(yaml)?;
        let data = Self::merged_defaults(Some(&external))?;
        Ok(Config {
            config_dir: String::new(),
            path: String::new(),
            data,
        })
    }

    fn merged_defaults(external: Option<&Value>) -> Result<Value> {
        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if let Some(external) = external {
            let external = Self::lower_keys_value(external.clone());
            merge_yaml(&mut default_value, &external);
        }
        Ok(Self::lower_keys_value(default_value))
    }

    /// Directory the configuration was looked up in
    pub fn config_dir(&self) -> &str {
        &self.config_dir
    }

    /// Path of the user configuration file (may not exist)
    pub fn path(&self) -> &str {
        &self.path
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key);
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["playback", "window_size"]`)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the YAML value or an error if the path doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let mut current = &self.data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    /// Gets a non-empty string at the specified path
    pub fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Ok(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Gets a service scoped value (`services.<service>.<key>`)
    ///
    /// Empty strings are reported as missing.
    pub fn get_service_value(&self, service: &str, key: &str) -> Option<String> {
        self.get_string(&["services", service, key])
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                let key_path = key
                    .trim_start_matches(ENV_PREFIX)
                    .split("__")
                    .collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        let new_key = Value::String(s.to_lowercase());
                        let new_val = Self::lower_keys_value(v);
                        new_map.insert(new_key, new_val);
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    impl_usize_config!(get_page_size, &["sources", "page_size"], DEFAULT_PAGE_SIZE);

    impl_usize_config!(
        get_window_size,
        &["playback", "window_size"],
        DEFAULT_WINDOW_SIZE
    );

    impl_usize_config!(
        get_start_poll_attempts,
        &["playback", "start_poll_attempts"],
        DEFAULT_START_POLL_ATTEMPTS
    );

    impl_usize_config!(
        get_start_poll_delay_ms,
        &["playback", "start_poll_delay_ms"],
        DEFAULT_START_POLL_DELAY_MS
    );

    impl_usize_config!(
        get_http_timeout_secs,
        &["host", "http", "timeout_secs"],
        DEFAULT_HTTP_TIMEOUT_SECS
    );

    impl_usize_config!(
        get_retry_max_attempts,
        &["sources", "retry", "max_attempts"],
        DEFAULT_RETRY_MAX_ATTEMPTS
    );

    impl_usize_config!(
        get_retry_initial_delay_ms,
        &["sources", "retry", "initial_delay_ms"],
        DEFAULT_RETRY_INITIAL_DELAY_MS
    );

    impl_usize_config!(
        get_retry_max_delay_ms,
        &["sources", "retry", "max_delay_ms"],
        DEFAULT_RETRY_MAX_DELAY_MS
    );

    impl_bool_config!(get_debug, &["host", "debug"], DEFAULT_DEBUG);

    impl_bool_config!(
        get_wrap_around,
        &["playback", "wrap_around"],
        DEFAULT_WRAP_AROUND
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    /// User agent sent by the shared HTTP transport
    pub fn get_user_agent(&self) -> String {
        self.get_string(&["host", "http", "user_agent"])
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

/// Merges external YAML configuration into default configuration
///
/// This function recursively merges two YAML value trees:
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_embedded() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(config.get_page_size().unwrap(), 50);
        assert_eq!(config.get_window_size().unwrap(), 5);
        assert_eq!(config.get_start_poll_attempts().unwrap(), 50);
        assert!(!config.get_debug().unwrap());
        assert!(!config.get_wrap_around().unwrap());
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
    }

    #[test]
    fn external_values_override_defaults() {
        let config = Config::from_yaml_str(
            "playback:\n  Window_Size: 3\nhost:\n  debug: true\nservices:\n  soundcloud:\n    client_id: abc\n",
        )
        .unwrap();
        assert_eq!(config.get_window_size().unwrap(), 3);
        assert!(config.get_debug().unwrap());
        // untouched siblings survive the merge
        assert_eq!(config.get_start_poll_delay_ms().unwrap(), 50);
        assert_eq!(
            config.get_service_value("soundcloud", "client_id").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn empty_service_values_are_missing() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert!(config.get_service_value("youtube", "api_key").is_none());
        assert!(config.get_service_value("unknown", "token").is_none());
    }

    #[test]
    fn invalid_numbers_fall_back_to_default() {
        let config = Config::from_yaml_str("sources:\n  page_size: lots\n").unwrap();
        assert_eq!(config.get_page_size().unwrap(), 50);
    }

    #[test]
    fn missing_path_is_an_error() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert!(config.get_value(&["nope", "missing"]).is_err());
    }

    #[test]
    fn env_values_are_parsed_as_yaml() {
        assert_eq!(Config::convert_env_value("12"), Value::Number(12.into()));
        assert_eq!(Config::convert_env_value("true"), Value::Bool(true));
    }

    #[test]
    fn load_config_reads_user_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "sources:\n  page_size: 20\n").unwrap();
        let config = Config::load_config(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(config.get_page_size().unwrap(), 20);
        assert!(config.path().ends_with("config.yaml"));
    }
}

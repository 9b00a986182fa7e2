//! Engine tunables read from `playback.*` and `sources.page_size`.

use sbconfig::Config;
use std::time::Duration;

/// Smallest window able to hold the current entry and the one before it
pub const MIN_WINDOW_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    /// Number of entries allowed to hold stream resources (K)
    pub window_size: usize,
    /// Page size asked from the backing source
    pub page_size: u32,
    /// Presence checks made by `start_track` before falling back
    pub start_poll_attempts: u32,
    pub start_poll_delay: Duration,
    pub wrap_around: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            window_size: 5,
            page_size: 50,
            start_poll_attempts: 50,
            start_poll_delay: Duration::from_millis(50),
            wrap_around: false,
        }
    }
}

impl QueueSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            window_size: config.get_window_size()?.max(MIN_WINDOW_SIZE),
            page_size: u32::try_from(config.get_page_size()?).unwrap_or(u32::MAX),
            start_poll_attempts: u32::try_from(config.get_start_poll_attempts()?)
                .unwrap_or(u32::MAX),
            start_poll_delay: Duration::from_millis(config.get_start_poll_delay_ms()? as u64),
            wrap_around: config.get_wrap_around()?,
        })
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(MIN_WINDOW_SIZE);
        self
    }

    pub fn with_start_poll(mut self, attempts: u32, delay: Duration) -> Self {
        self.start_poll_attempts = attempts;
        self.start_poll_delay = delay;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_wrap_around(mut self, wrap_around: bool) -> Self {
        self.wrap_around = wrap_around;
        self
    }

    /// Upper bound of the time `start_track` may wait
    pub fn start_poll_budget(&self) -> Duration {
        self.start_poll_delay
            .checked_mul(self.start_poll_attempts)
            .unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_embedded_config() {
        let config = Config::from_yaml_str("{}").unwrap();
        let settings = QueueSettings::from_config(&config).unwrap();
        assert_eq!(settings, QueueSettings::default());
        assert_eq!(settings.start_poll_budget(), Duration::from_millis(2500));
    }

    #[test]
    fn test_window_is_clamped() {
        let config = Config::from_yaml_str("playback:\n  window_size: 1\n").unwrap();
        let settings = QueueSettings::from_config(&config).unwrap();
        assert_eq!(settings.window_size, MIN_WINDOW_SIZE);
        assert_eq!(QueueSettings::default().with_window_size(0).window_size, 2);
    }
}

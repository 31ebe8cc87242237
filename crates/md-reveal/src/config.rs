use std::time::Duration;

use crate::reveal::{delay_from_millis, RevealMode, DEFAULT_DELAY};
use crate::sanitize::SanitizeOptions;

/// How a stream engine starts up and paces its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Initial visible and accumulated value
    pub seed: String,
    pub mode: RevealMode,
    pub delay: Duration,

    /// Start consuming the configured source as soon as the engine spawns
    pub auto_start: bool,

    pub sanitize: SanitizeOptions,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            seed: String::new(),
            mode: RevealMode::default(),
            delay: DEFAULT_DELAY,
            auto_start: true,
            sanitize: SanitizeOptions::default(),
        }
    }
}

impl StreamConfig {
    /// Defaults overridden by `MD_REVEAL_MODE`, `MD_REVEAL_DELAY_MS` and
    /// `MD_REVEAL_AUTO_START`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = StreamConfig::default();

        if let Some(mode) = var("MD_REVEAL_MODE") {
            match mode.parse() {
                Ok(mode) => config.mode = mode,
                Err(err) => tracing::warn!("ignoring MD_REVEAL_MODE: {}", err),
            }
        }

        if let Some(delay) = var("MD_REVEAL_DELAY_MS") {
            config.delay = match delay.trim().parse::<i64>() {
                Ok(ms) => delay_from_millis(ms),
                Err(_) => {
                    tracing::warn!("invalid MD_REVEAL_DELAY_MS '{}', using default", delay);
                    DEFAULT_DELAY
                }
            };
        }

        if let Some(auto_start) = var("MD_REVEAL_AUTO_START") {
            config.auto_start = !matches!(
                auto_start.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }

        config
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn with_mode(mut self, mode: RevealMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn with_sanitize(mut self, sanitize: SanitizeOptions) -> Self {
        self.sanitize = sanitize;
        self
    }
}

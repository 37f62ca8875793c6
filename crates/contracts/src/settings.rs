//! Runtime settings - Config Loader output
//!
//! Settings are shared through [`SettingsHandle`] because several action
//! variants must observe the live value at execute time, not the value
//! captured at construction time (integrations can be toggled while a
//! detection is still in flight).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use validator::Validate;

use crate::RetryPolicy;

/// Complete runtime settings for the dispatch layer
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Enable verbose success logging
    pub debug: bool,

    #[validate(nested)]
    pub throttle: ThrottleConfig,

    pub log: DetectionLogConfig,

    pub export: ClipExportConfig,

    #[validate(nested)]
    pub weather: WeatherConfig,

    pub broker: BrokerConfig,

    pub broadcast: BroadcastConfig,

    pub range_filter: RangeFilterConfig,

    #[validate(nested)]
    pub retry: RetryConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            throttle: ThrottleConfig::default(),
            log: DetectionLogConfig::default(),
            export: ClipExportConfig::default(),
            weather: WeatherConfig::default(),
            broker: BrokerConfig::default(),
            broadcast: BroadcastConfig::default(),
            range_filter: RangeFilterConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Dedup/throttle gate configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Cooldown window per (subject, kind), seconds
    #[validate(range(min = 1))]
    pub cooldown_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { cooldown_secs: 15 }
    }
}

impl ThrottleConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Local detection log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionLogConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for DetectionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("detections.log"),
        }
    }
}

/// Audio clip export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipExportConfig {
    pub enabled: bool,

    /// Export directory; clip names are joined onto this path
    pub path: PathBuf,

    pub format: ClipFormat,

    /// External encoder binary for non-wav formats
    pub ffmpeg_path: String,
}

impl Default for ClipExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("clips"),
            format: ClipFormat::Wav,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

/// Clip container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipFormat {
    /// Raw uncompressed audio, written directly
    #[default]
    Wav,
    /// Compressed via the external encoder
    Flac,
    /// Compressed via the external encoder
    Mp3,
}

/// Weather-service integration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,

    /// Minimum confidence for uploads
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.8,
        }
    }
}

/// Message-broker integration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub enabled: bool,
    pub topic: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            topic: "chirp/detections".to_string(),
        }
    }
}

/// Live-update broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub enabled: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Location-based range filter state
///
/// `included_species` and `last_updated` are refreshed at runtime by the
/// range-filter action; the configured values only seed the first run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeFilterConfig {
    pub enabled: bool,
    pub included_species: Vec<String>,
    pub last_updated: NaiveDate,
}

impl Default for RangeFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            included_species: Vec::new(),
            last_updated: NaiveDate::MIN,
        }
    }
}

/// Executor retry schedule for network-facing actions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,

    #[validate(range(min = 1))]
    pub max_attempts: u32,

    #[validate(range(min = 1))]
    pub initial_backoff_ms: u64,

    #[validate(range(min = 1.0))]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_backoff_ms: 1000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Per-action policy descriptor handed to the executor
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            enabled: self.enabled,
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

/// Shared handle to live settings
///
/// Constructed once at process setup and cloned into every action
/// instance. Reads take a snapshot; updates swap fields atomically under
/// the write lock.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Clone of the current settings
    pub async fn snapshot(&self) -> Settings {
        self.inner.read().await.clone()
    }

    /// Mutate settings under the write lock
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.inner.write().await;
        f(&mut guard);
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.throttle.cooldown(), Duration::from_secs(15));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut settings = Settings::default();
        settings.weather.threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[tokio::test]
    async fn test_handle_update_visible_to_snapshot() {
        let handle = SettingsHandle::default();
        handle.update(|s| s.weather.enabled = true).await;
        assert!(handle.snapshot().await.weather.enabled);
    }
}

//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce `Settings`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let settings = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("Cooldown: {:?}", settings.throttle.cooldown());
//! ```

mod parser;
mod validator;

pub use contracts::Settings;
pub use parser::ConfigFormat;

use contracts::ActionError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<Settings, ActionError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Settings, ActionError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize Settings to TOML string
    pub fn to_toml(settings: &Settings) -> Result<String, ActionError> {
        toml::to_string_pretty(settings)
            .map_err(|e| ActionError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize Settings to JSON string
    pub fn to_json(settings: &Settings) -> Result<String, ActionError> {
        serde_json::to_string_pretty(settings)
            .map_err(|e| ActionError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ActionError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ActionError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| ActionError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ActionError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<Settings, ActionError> {
        let settings = parser::parse(content, format)?;
        validator::validate(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
debug = false

[throttle]
cooldown_secs = 15

[log]
enabled = true
path = "detections.log"

[export]
enabled = true
path = "clips"
format = "wav"

[weather]
enabled = true
threshold = 0.8

[broker]
enabled = true
topic = "chirp/detections"

[broadcast]
enabled = true

[retry]
enabled = true
max_attempts = 3
initial_backoff_ms = 1000
multiplier = 2.0
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let settings = result.unwrap();
        assert!(settings.weather.enabled);
        assert_eq!(settings.throttle.cooldown_secs, 15);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings = ConfigLoader::load_from_str("debug = true", ConfigFormat::Toml).unwrap();
        assert!(settings.debug);
        assert!(settings.log.enabled);
        assert_eq!(settings.broker.topic, "chirp/detections");
    }

    #[test]
    fn test_round_trip_toml() {
        let settings = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&settings).unwrap();
        let back = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(settings.throttle.cooldown_secs, back.throttle.cooldown_secs);
        assert_eq!(settings.broker.topic, back.broker.topic);
    }

    #[test]
    fn test_round_trip_json() {
        let settings = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&settings).unwrap();
        let back = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(settings.weather.threshold, back.weather.threshold);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // out-of-range threshold should fail validation
        let content = r#"
[weather]
enabled = true
threshold = 1.5
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("threshold"));
    }
}

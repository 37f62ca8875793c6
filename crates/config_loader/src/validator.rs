//! Configuration validation
//!
//! Rules:
//! - field ranges (cooldown, threshold, retry schedule) via derive
//! - log path required while logging is enabled
//! - export path required while export is enabled
//! - broker topic required while the broker is enabled

use contracts::{ActionError, Settings};
use validator::Validate;

/// Validate loaded settings
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(settings: &Settings) -> Result<(), ActionError> {
    validate_ranges(settings)?;
    validate_log(settings)?;
    validate_export(settings)?;
    validate_broker(settings)?;
    Ok(())
}

/// Derive-level range checks
fn validate_ranges(settings: &Settings) -> Result<(), ActionError> {
    settings
        .validate()
        .map_err(|errors| ActionError::config_validation("settings", errors.to_string()))
}

fn validate_log(settings: &Settings) -> Result<(), ActionError> {
    if settings.log.enabled && settings.log.path.as_os_str().is_empty() {
        return Err(ActionError::config_validation(
            "log.path",
            "path cannot be empty while logging is enabled",
        ));
    }
    Ok(())
}

fn validate_export(settings: &Settings) -> Result<(), ActionError> {
    if settings.export.enabled && settings.export.path.as_os_str().is_empty() {
        return Err(ActionError::config_validation(
            "export.path",
            "path cannot be empty while export is enabled",
        ));
    }
    if settings.export.enabled && settings.export.ffmpeg_path.is_empty() {
        return Err(ActionError::config_validation(
            "export.ffmpeg_path",
            "encoder path cannot be empty while export is enabled",
        ));
    }
    Ok(())
}

fn validate_broker(settings: &Settings) -> Result<(), ActionError> {
    if settings.broker.enabled && settings.broker.topic.is_empty() {
        return Err(ActionError::config_validation(
            "broker.topic",
            "topic cannot be empty while the broker is enabled",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_defaults() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut settings = Settings::default();
        settings.weather.threshold = 2.0;
        let result = validate(&settings);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("weather"), "got: {err}");
    }

    #[test]
    fn test_zero_cooldown_rejected() {
        let mut settings = Settings::default();
        settings.throttle.cooldown_secs = 0;
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_empty_log_path_rejected_when_enabled() {
        let mut settings = Settings::default();
        settings.log.path = Default::default();
        let result = validate(&settings);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("log.path"), "got: {err}");
    }

    #[test]
    fn test_empty_export_path_rejected_when_enabled() {
        let mut settings = Settings::default();
        settings.export.enabled = true;
        settings.export.path = Default::default();
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_empty_export_path_allowed_when_disabled() {
        let mut settings = Settings::default();
        settings.export.path = Default::default();
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn test_empty_broker_topic_rejected_when_enabled() {
        let mut settings = Settings::default();
        settings.broker.enabled = true;
        settings.broker.topic = String::new();
        let result = validate(&settings);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("broker.topic"), "got: {err}");
    }

    #[test]
    fn test_retry_multiplier_below_one_rejected() {
        let mut settings = Settings::default();
        settings.retry.multiplier = 0.5;
        assert!(validate(&settings).is_err());
    }
}

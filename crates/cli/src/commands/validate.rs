//! `validate` command implementation.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    cooldown_secs: u64,
    log_enabled: bool,
    export_enabled: bool,
    integrations: Vec<String>,
    retry_enabled: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let loaded = load_settings(&args.config);
    let result = build_result(args, &loaded);

    if args.json {
        let json =
            serde_json::to_string_pretty(&result).map_err(|e| CliError::Other(e.into()))?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    loaded.map(|_| ())
}

/// Load and validate a settings file, classifying failures
pub(crate) fn load_settings(path: &Path) -> Result<contracts::Settings> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    config_loader::ConfigLoader::load_from_path(path).map_err(|e| match e {
        contracts::ActionError::ConfigParse { .. } => CliError::config_parse(e.to_string()),
        other => CliError::config_validation(other.to_string()),
    })
}

fn build_result(args: &ValidateArgs, loaded: &Result<contracts::Settings>) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match loaded {
        Ok(settings) => {
            let warnings = collect_warnings(settings);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    cooldown_secs: settings.throttle.cooldown_secs,
                    log_enabled: settings.log.enabled,
                    export_enabled: settings.export.enabled,
                    integrations: enabled_integrations(settings),
                    retry_enabled: settings.retry.enabled,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn enabled_integrations(settings: &contracts::Settings) -> Vec<String> {
    let mut integrations = Vec::new();
    if settings.weather.enabled {
        integrations.push("birdweather".to_string());
    }
    if settings.broker.enabled {
        integrations.push("broker".to_string());
    }
    if settings.broadcast.enabled {
        integrations.push("broadcast".to_string());
    }
    if settings.range_filter.enabled {
        integrations.push("range_filter".to_string());
    }
    integrations
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(settings: &contracts::Settings) -> Vec<String> {
    let mut warnings = Vec::new();

    if !settings.log.enabled && !settings.export.enabled && enabled_integrations(settings).is_empty()
    {
        warnings.push("No outputs enabled - detections will only be traced".to_string());
    }

    if settings.weather.enabled && settings.weather.threshold < 0.5 {
        warnings.push(format!(
            "weather.threshold is low ({}) - expect a high upload volume",
            settings.weather.threshold
        ));
    }

    if settings.export.enabled && settings.export.format != contracts::ClipFormat::Wav {
        warnings.push(format!(
            "export format {:?} requires the external encoder at '{}'",
            settings.export.format, settings.export.ffmpeg_path
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Cooldown: {}s", summary.cooldown_secs);
            println!("  Detection log: {}", summary.log_enabled);
            println!("  Clip export: {}", summary.export_enabled);
            println!("  Integrations: {:?}", summary.integrations);
            println!("  Retries: {}", summary.retry_enabled);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_missing_file() {
        let err = load_settings(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/config.toml"));
    }

    #[test]
    fn test_validate_good_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[weather]\nenabled = true\nthreshold = 0.9").unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let loaded = load_settings(file.path());
        let result = build_result(&args, &loaded);
        assert!(result.valid, "error: {:?}", result.error);
        let summary = result.summary.unwrap();
        assert!(summary.integrations.contains(&"birdweather".to_string()));
    }

    #[test]
    fn test_validate_bad_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[throttle]\ncooldown_secs = 0").unwrap();

        let err = load_settings(file.path()).unwrap_err();
        assert!(matches!(err, CliError::ConfigValidation { .. }));
    }

    #[test]
    fn test_validate_malformed_config_is_parse_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[throttle\ncooldown_secs = 15").unwrap();

        let err = load_settings(file.path()).unwrap_err();
        assert!(matches!(err, CliError::ConfigParse { .. }));
    }
}

//! `info` command implementation.

use serde::Serialize;
use tracing::info;

use super::validate::load_settings;
use crate::cli::InfoArgs;
use crate::error::{CliError, Result};

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    throttle: ThrottleInfo,
    log: OutputInfo,
    export: ExportInfo,
    integrations: IntegrationsInfo,
    retry: RetryInfo,
}

#[derive(Serialize)]
struct ThrottleInfo {
    cooldown_secs: u64,
}

#[derive(Serialize)]
struct OutputInfo {
    enabled: bool,
    path: String,
}

#[derive(Serialize)]
struct ExportInfo {
    enabled: bool,
    path: String,
    format: String,
}

#[derive(Serialize)]
struct IntegrationsInfo {
    birdweather: bool,
    birdweather_threshold: f64,
    broker: bool,
    broker_topic: String,
    broadcast: bool,
    range_filter: bool,
}

#[derive(Serialize)]
struct RetryInfo {
    enabled: bool,
    max_attempts: u32,
    initial_backoff_ms: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let settings = load_settings(&args.config)?;

    if args.json {
        let info = build_config_info(&settings);
        let json =
            serde_json::to_string_pretty(&info).map_err(|e| CliError::Other(e.into()))?;
        println!("{}", json);
    } else {
        print_config_info(&settings);
    }

    Ok(())
}

fn build_config_info(settings: &contracts::Settings) -> ConfigInfo {
    ConfigInfo {
        throttle: ThrottleInfo {
            cooldown_secs: settings.throttle.cooldown_secs,
        },
        log: OutputInfo {
            enabled: settings.log.enabled,
            path: settings.log.path.display().to_string(),
        },
        export: ExportInfo {
            enabled: settings.export.enabled,
            path: settings.export.path.display().to_string(),
            format: format!("{:?}", settings.export.format),
        },
        integrations: IntegrationsInfo {
            birdweather: settings.weather.enabled,
            birdweather_threshold: settings.weather.threshold,
            broker: settings.broker.enabled,
            broker_topic: settings.broker.topic.clone(),
            broadcast: settings.broadcast.enabled,
            range_filter: settings.range_filter.enabled,
        },
        retry: RetryInfo {
            enabled: settings.retry.enabled,
            max_attempts: settings.retry.max_attempts,
            initial_backoff_ms: settings.retry.initial_backoff_ms,
        },
    }
}

fn print_config_info(settings: &contracts::Settings) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Chirp Relay Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⏱  Throttle");
    println!("   └─ Cooldown: {}s", settings.throttle.cooldown_secs);

    println!("\n📝 Detection log");
    println!("   ├─ Enabled: {}", settings.log.enabled);
    println!("   └─ Path: {}", settings.log.path.display());

    println!("\n🎙  Clip export");
    println!("   ├─ Enabled: {}", settings.export.enabled);
    println!("   ├─ Path: {}", settings.export.path.display());
    println!("   └─ Format: {:?}", settings.export.format);

    println!("\n📤 Integrations");
    println!(
        "   ├─ BirdWeather: {} (threshold {})",
        settings.weather.enabled, settings.weather.threshold
    );
    println!(
        "   ├─ Broker: {} (topic '{}')",
        settings.broker.enabled, settings.broker.topic
    );
    println!("   ├─ Live broadcast: {}", settings.broadcast.enabled);
    println!("   └─ Range filter: {}", settings.range_filter.enabled);

    println!("\n🔁 Retries");
    println!("   ├─ Enabled: {}", settings.retry.enabled);
    println!("   ├─ Max attempts: {}", settings.retry.max_attempts);
    println!(
        "   └─ Initial backoff: {}ms",
        settings.retry.initial_backoff_ms
    );

    println!();
}

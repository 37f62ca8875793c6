//! WeatherAction - submits detections to the BirdWeather service
//!
//! Enablement and the confidence threshold are re-read from live settings
//! at execution time, so a detection dispatched moments before the
//! integration was switched off is still skipped.

use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    ActionError, ActionKind, Detection, NotificationSink, RetryPolicy, SettingsHandle,
    WeatherClient,
};
use tracing::{debug, instrument, warn};
use tracking::EventTracker;

const INTEGRATION: &str = "BirdWeather";

/// Uploads one detection plus its audio segment to the weather service
pub struct WeatherAction {
    settings: SettingsHandle,
    detection: Detection,
    pcm: Bytes,
    client: Option<Arc<dyn WeatherClient>>,
    tracker: Arc<EventTracker>,
    notifier: Option<Arc<dyn NotificationSink>>,
    retry: RetryPolicy,
}

impl WeatherAction {
    pub fn new(
        settings: SettingsHandle,
        detection: Detection,
        pcm: Bytes,
        client: Option<Arc<dyn WeatherClient>>,
        tracker: Arc<EventTracker>,
        notifier: Option<Arc<dyn NotificationSink>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            settings,
            detection,
            pcm,
            client,
            tracker,
            notifier,
            retry,
        }
    }

    pub fn describe(&self) -> String {
        format!("Upload {} to BirdWeather", self.detection.common_name)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    #[instrument(
        name = "weather_action_execute",
        skip(self),
        fields(species = %self.detection.common_name, confidence = self.detection.confidence)
    )]
    pub async fn execute(&mut self) -> Result<(), ActionError> {
        if !self
            .tracker
            .track_event(&self.detection.species_key(), ActionKind::BirdweatherSubmit)
        {
            return Ok(());
        }

        let weather = self.settings.snapshot().await.weather;
        if !weather.enabled {
            debug!(
                species = %self.detection.common_name,
                "BirdWeather disabled, skipping upload"
            );
            return Ok(());
        }

        if self.detection.confidence < weather.threshold {
            debug!(
                species = %self.detection.common_name,
                confidence = self.detection.confidence,
                threshold = weather.threshold,
                "Below BirdWeather threshold, skipping upload"
            );
            return Ok(());
        }

        let Some(client) = &self.client else {
            return Err(ActionError::ClientNotConfigured {
                integration: INTEGRATION.to_string(),
            });
        };

        if let Err(err) = client.upload(&self.detection, &self.pcm).await {
            let wrapped = ActionError::Upload {
                species: self.detection.common_name.clone(),
                confidence: self.detection.confidence,
                clip_name: self.detection.clip_name.clone(),
                message: err.to_string(),
            };
            if self.retry.enabled {
                warn!(error = %wrapped, "BirdWeather upload failed, will retry");
            } else {
                warn!(error = %wrapped, "BirdWeather upload failed");
                if let Some(notifier) = &self.notifier {
                    notifier.notify_integration_failure(INTEGRATION, &wrapped);
                }
            }
            return Err(wrapped);
        }

        debug!(
            species = %self.detection.common_name,
            "Uploaded detection to BirdWeather"
        );
        Ok(())
    }
}

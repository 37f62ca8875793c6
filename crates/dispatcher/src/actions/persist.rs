//! PersistAction - writes the detection to the store of record
//!
//! Sequence: throttle check, atomic first-seen check-and-update, store
//! write, best-effort "new species" event, optional inline clip export.
//! The first-seen check runs strictly before the write; the domain event
//! is only published after the write succeeded.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contracts::{
    ActionError, ActionKind, CaptureBuffer, Datastore, Detection, DetectionEventBus,
    DetectionScore, NewSpeciesEvent, RetryPolicy, SettingsHandle,
};
use tracing::{debug, error, instrument};
use tracking::{EventTracker, SpeciesTracker};

use super::SaveClipAction;

/// Length of the exported PCM window, anchored at the detection's begin time
pub const CLIP_WINDOW: Duration = Duration::from_secs(15);

/// Persists snapshot + result set, then exports the audio clip inline
pub struct PersistAction {
    settings: SettingsHandle,
    detection: Detection,
    scores: Vec<DetectionScore>,
    store: Arc<dyn Datastore>,
    tracker: Arc<EventTracker>,
    species: Option<Arc<SpeciesTracker>>,
    event_bus: Option<Arc<dyn DetectionEventBus>>,
    capture: Arc<dyn CaptureBuffer>,
    retry: RetryPolicy,
}

impl PersistAction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: SettingsHandle,
        detection: Detection,
        scores: Vec<DetectionScore>,
        store: Arc<dyn Datastore>,
        tracker: Arc<EventTracker>,
        species: Option<Arc<SpeciesTracker>>,
        event_bus: Option<Arc<dyn DetectionEventBus>>,
        capture: Arc<dyn CaptureBuffer>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            settings,
            detection,
            scores,
            store,
            tracker,
            species,
            event_bus,
            capture,
            retry,
        }
    }

    pub fn describe(&self) -> String {
        format!("Save {} detection to store", self.detection.common_name)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    #[instrument(
        name = "persist_action_execute",
        skip(self),
        fields(species = %self.detection.common_name)
    )]
    pub async fn execute(&mut self) -> Result<(), ActionError> {
        if !self
            .tracker
            .track_event(&self.detection.species_key(), ActionKind::DatabaseSave)
        {
            return Ok(());
        }

        // Atomic check-and-update before the write so concurrent detections
        // of the same species cannot both observe "first ever".
        let (is_new_species, days_since_first_seen) = match &self.species {
            Some(tracker) => {
                tracker.check_and_update(&self.detection.scientific_name, Utc::now())
            }
            None => (false, 0),
        };

        if let Err(err) = self.store.save(&self.detection, &self.scores).await {
            error!(
                species = %self.detection.common_name,
                error = %err,
                "Failed to save detection to store"
            );
            return Err(ActionError::store_save(
                &self.detection.common_name,
                err.to_string(),
            ));
        }

        if is_new_species {
            self.publish_new_species_event(days_since_first_seen);
        }

        let settings = self.settings.snapshot().await;
        if settings.export.enabled && !self.detection.clip_name.is_empty() {
            let pcm = self
                .capture
                .read_segment(&self.detection.source, self.detection.begin_time, CLIP_WINDOW)
                .map_err(|err| {
                    let wrapped = ActionError::capture_read(
                        contracts::sanitize_source(&self.detection.source),
                        format!(
                            "{err} (species '{}', clip '{}')",
                            self.detection.common_name, self.detection.clip_name
                        ),
                    );
                    error!(
                        error = %wrapped,
                        "Failed to read audio segment from capture buffer"
                    );
                    wrapped
                })?;

            let mut save_clip = SaveClipAction::new(
                self.settings.clone(),
                self.detection.clip_name.clone(),
                pcm,
            );
            // Returned as this action's own error even though the store
            // write above already succeeded; a retry will re-run the whole
            // sequence (at-least-once on the store write).
            save_clip.execute().await.map_err(|err| {
                error!(
                    clip = %self.detection.clip_name,
                    error = %err,
                    "Failed to save audio clip"
                );
                err
            })?;

            if settings.debug {
                debug!(
                    clip = %self.detection.clip_name,
                    detected_at = %self.detection.detected_at,
                    begin_time = %self.detection.begin_time,
                    "Saved audio clip"
                );
            }
        }

        Ok(())
    }

    /// Best-effort publish; a full bus is logged, never propagated
    fn publish_new_species_event(&self, days_since_first_seen: i64) {
        let Some(bus) = &self.event_bus else {
            return;
        };

        let event = NewSpeciesEvent {
            common_name: self.detection.common_name.clone(),
            scientific_name: self.detection.scientific_name.clone(),
            confidence: self.detection.confidence,
            source: contracts::sanitize_source(&self.detection.source),
            is_new_species: true,
            days_since_first_seen,
        };

        if bus.try_publish_detection(event) {
            debug!(
                species = %self.detection.common_name,
                "Published new species detection event"
            );
        } else {
            debug!(
                species = %self.detection.common_name,
                "New species event not accepted by bus"
            );
        }
    }
}

//! LogAction - appends detections to the local detection log
//!
//! Logging is explicitly non-fatal: a write failure is recorded and
//! swallowed, never surfaced as a retryable error.

use std::path::Path;
use std::sync::Arc;

use contracts::{ActionKind, Detection, SettingsHandle};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};
use tracking::EventTracker;

/// Appends one line per detection to a local log file
pub struct LogAction {
    settings: SettingsHandle,
    detection: Detection,
    tracker: Arc<EventTracker>,
}

impl LogAction {
    pub fn new(settings: SettingsHandle, detection: Detection, tracker: Arc<EventTracker>) -> Self {
        Self {
            settings,
            detection,
            tracker,
        }
    }

    pub fn describe(&self) -> String {
        format!("Log {} detection to file", self.detection.common_name)
    }

    #[instrument(
        name = "log_action_execute",
        skip(self),
        fields(species = %self.detection.common_name)
    )]
    pub async fn execute(&mut self) -> Result<(), contracts::ActionError> {
        if !self
            .tracker
            .track_event(&self.detection.species_key(), ActionKind::LogToFile)
        {
            return Ok(());
        }

        let settings = self.settings.snapshot().await;
        if settings.log.enabled {
            if let Err(err) = append_log_line(&settings.log.path, &self.detection).await {
                warn!(
                    path = %settings.log.path.display(),
                    error = %err,
                    "Failed to append detection log, continuing"
                );
            }
        }

        info!(
            species = %self.detection.common_name,
            scientific_name = %self.detection.scientific_name,
            confidence = self.detection.confidence,
            source = %contracts::sanitize_source(&self.detection.source),
            "Detection"
        );

        Ok(())
    }
}

async fn append_log_line(path: &Path, detection: &Detection) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let line = format!(
        "{} {} {:.2}\n",
        detection.detected_at.format("%Y-%m-%d %H:%M:%S"),
        detection.common_name,
        detection.confidence
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contracts::Settings;
    use std::time::Duration;
    use tempfile::tempdir;

    fn detection() -> Detection {
        Detection {
            detected_at: Utc::now(),
            begin_time: Utc::now(),
            common_name: "European Robin".to_string(),
            scientific_name: "Erithacus rubecula".to_string(),
            confidence: 0.87,
            source: "hw:1,0".to_string(),
            clip_name: String::new(),
            row_id: 0,
        }
    }

    #[tokio::test]
    async fn test_appends_line() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.log.path = dir.path().join("detections.log");

        let tracker = Arc::new(EventTracker::new(Duration::from_secs(60)));
        let mut action = LogAction::new(SettingsHandle::new(settings.clone()), detection(), tracker);

        action.execute().await.unwrap();

        let content = std::fs::read_to_string(&settings.log.path).unwrap();
        assert!(content.contains("European Robin"));
        assert!(content.contains("0.87"));
    }

    #[tokio::test]
    async fn test_suppressed_inside_window_writes_once() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.log.path = dir.path().join("detections.log");
        let handle = SettingsHandle::new(settings.clone());

        let tracker = Arc::new(EventTracker::new(Duration::from_secs(60)));
        let mut first = LogAction::new(handle.clone(), detection(), Arc::clone(&tracker));
        let mut second = LogAction::new(handle, detection(), tracker);

        first.execute().await.unwrap();
        second.execute().await.unwrap();

        let content = std::fs::read_to_string(&settings.log.path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let mut settings = Settings::default();
        // directory path, appending must fail
        settings.log.path = std::env::temp_dir();

        let tracker = Arc::new(EventTracker::new(Duration::from_secs(60)));
        let mut action = LogAction::new(SettingsHandle::new(settings), detection(), tracker);

        assert!(action.execute().await.is_ok());
    }
}

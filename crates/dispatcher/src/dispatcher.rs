//! Dispatcher - main loop for fan-out of detections to actions
//!
//! One inbound detection becomes one fresh action instance per applicable
//! variant. Instances are independent one-shot values, so the variants of
//! a detection run concurrently on the executor, and consecutive
//! detections overlap freely.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{
    Broadcaster, BrokerClient, CaptureBuffer, Datastore, DetectionEvent, DetectionEventBus,
    ImageProvider, NotificationSink, RangeModel, SettingsHandle, WeatherClient,
};
use observability::{record_detection_received, DispatchStatsAggregator};
use std::sync::Arc;
use tracking::{EventTracker, SpeciesTracker};

use crate::actions::{
    BroadcastAction, BrokerAction, DetectionAction, LogAction, PersistAction, RangeFilterAction,
    WeatherAction,
};
use crate::executor::RetryExecutor;
use crate::metrics::MetricsSnapshot;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on concurrently-executing actions
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { max_in_flight: 32 }
    }
}

/// External subsystems the action variants are wired to
///
/// Optional handles correspond to integrations that may be absent from a
/// deployment; the matching variants are simply not built for a detection
/// when the handle is missing.
#[derive(Clone)]
pub struct Collaborators {
    pub settings: SettingsHandle,
    pub tracker: Arc<EventTracker>,
    pub species: Option<Arc<SpeciesTracker>>,
    pub store: Arc<dyn Datastore>,
    pub capture: Arc<dyn CaptureBuffer>,
    pub weather: Option<Arc<dyn WeatherClient>>,
    pub broker: Option<Arc<dyn BrokerClient>>,
    pub images: Option<Arc<dyn ImageProvider>>,
    pub range_model: Option<Arc<dyn RangeModel>>,
    pub event_bus: Option<Arc<dyn DetectionEventBus>>,
    pub notifier: Option<Arc<dyn NotificationSink>>,
    pub broadcaster: Option<Broadcaster>,
}

/// The main Dispatcher that fans out detections to action instances
pub struct Dispatcher {
    collaborators: Collaborators,
    executor: RetryExecutor,
    input_rx: mpsc::Receiver<DetectionEvent>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        collaborators: Collaborators,
        input_rx: mpsc::Receiver<DetectionEvent>,
    ) -> Self {
        Self {
            collaborators,
            executor: RetryExecutor::new(config.max_in_flight),
            input_rx,
        }
    }

    /// Snapshot of executor counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.executor.metrics().snapshot()
    }

    /// Run the dispatcher main loop
    ///
    /// Consumes detections from input and fans out to action instances.
    /// Returns once the input channel is closed and every submitted action
    /// has finished.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) {
        info!("Dispatcher started");

        let mut stats = DispatchStatsAggregator::new();
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
        let mut detection_count: u64 = 0;

        while let Some(event) = self.input_rx.recv().await {
            record_detection_received();
            detection_count += 1;

            let actions = self.build_actions(&event).await;
            stats.record(actions.len(), event.detection.confidence);
            debug!(
                species = %event.detection.common_name,
                actions = actions.len(),
                "Dispatching detection"
            );

            for action in actions {
                in_flight.push(self.executor.submit(action));
            }
            in_flight.retain(|handle| !handle.is_finished());

            if detection_count.is_multiple_of(256) {
                self.collaborators.tracker.prune();
                debug!(detections = detection_count, "Dispatcher progress");
            }
        }

        info!("Dispatcher input closed, draining in-flight actions");
        for handle in in_flight {
            let _ = handle.await;
        }

        let snapshot = self.executor.metrics().snapshot();
        info!(
            submitted = snapshot.submitted_count,
            completed = snapshot.completed_count,
            retried = snapshot.retried_count,
            failed = snapshot.failed_count,
            %stats,
            "Dispatcher shutdown complete"
        );
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Build one fresh action instance per applicable variant.
    ///
    /// Log and persist always apply; integration variants require both the
    /// settings toggle and a wired collaborator handle.
    async fn build_actions(&self, event: &DetectionEvent) -> Vec<DetectionAction> {
        let settings = self.collaborators.settings.snapshot().await;
        let retry = settings.retry.policy();
        let c = &self.collaborators;

        let mut actions = vec![
            DetectionAction::Log(LogAction::new(
                c.settings.clone(),
                event.detection.clone(),
                Arc::clone(&c.tracker),
            )),
            DetectionAction::Persist(PersistAction::new(
                c.settings.clone(),
                event.detection.clone(),
                event.scores.clone(),
                Arc::clone(&c.store),
                Arc::clone(&c.tracker),
                c.species.clone(),
                c.event_bus.clone(),
                Arc::clone(&c.capture),
                retry,
            )),
        ];

        if settings.weather.enabled {
            actions.push(DetectionAction::Weather(WeatherAction::new(
                c.settings.clone(),
                event.detection.clone(),
                Bytes::clone(&event.pcm),
                c.weather.clone(),
                Arc::clone(&c.tracker),
                c.notifier.clone(),
                retry,
            )));
        }

        if settings.broker.enabled {
            if let Some(broker) = &c.broker {
                actions.push(DetectionAction::Broker(BrokerAction::new(
                    c.settings.clone(),
                    event.detection.clone(),
                    Arc::clone(broker),
                    c.images.clone(),
                    Arc::clone(&c.tracker),
                    c.notifier.clone(),
                    retry,
                )));
            }
        }

        if settings.range_filter.enabled {
            if let Some(model) = &c.range_model {
                actions.push(DetectionAction::RangeFilter(RangeFilterAction::new(
                    c.settings.clone(),
                    Arc::clone(model),
                )));
            }
        }

        if settings.broadcast.enabled {
            if let Some(broadcaster) = &c.broadcaster {
                actions.push(DetectionAction::Broadcast(BroadcastAction::new(
                    c.settings.clone(),
                    event.detection.clone(),
                    Arc::clone(&c.store),
                    c.images.clone(),
                    Arc::clone(&c.tracker),
                    Arc::clone(broadcaster),
                    retry,
                )));
            }
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use contracts::{ActionError, Detection, DetectionScore, Settings};
    use std::sync::Mutex;
    use std::time::Duration;

    struct MockStore {
        saved: Mutex<Vec<Detection>>,
    }

    #[async_trait]
    impl Datastore for MockStore {
        async fn save(
            &self,
            detection: &Detection,
            _scores: &[DetectionScore],
        ) -> Result<(), ActionError> {
            self.saved.lock().unwrap().push(detection.clone());
            Ok(())
        }

        async fn search(
            &self,
            _query: &str,
            _ascending: bool,
            _limit: usize,
            _offset: usize,
        ) -> Result<Vec<Detection>, ActionError> {
            let mut found = self.saved.lock().unwrap().clone();
            for (i, record) in found.iter_mut().enumerate() {
                record.row_id = i as i64 + 1;
            }
            Ok(found)
        }
    }

    struct MockCapture;

    impl CaptureBuffer for MockCapture {
        fn read_segment(
            &self,
            _source: &str,
            _begin: DateTime<Utc>,
            _duration: Duration,
        ) -> Result<Bytes, ActionError> {
            Ok(Bytes::from_static(&[0u8; 64]))
        }
    }

    fn event(name: &str) -> DetectionEvent {
        DetectionEvent {
            detection: Detection {
                detected_at: Utc::now(),
                begin_time: Utc::now(),
                common_name: name.to_string(),
                scientific_name: format!("{name} sci"),
                confidence: 0.9,
                source: "hw:1,0".to_string(),
                clip_name: String::new(),
                row_id: 0,
            },
            scores: vec![],
            pcm: Bytes::from_static(&[0u8; 64]),
        }
    }

    fn collaborators(settings: Settings, store: Arc<MockStore>) -> Collaborators {
        let handle = SettingsHandle::new(settings.clone());
        Collaborators {
            settings: handle,
            tracker: Arc::new(EventTracker::new(settings.throttle.cooldown())),
            species: None,
            store,
            capture: Arc::new(MockCapture),
            weather: None,
            broker: None,
            images: None,
            range_model: None,
            event_bus: None,
            notifier: None,
            broadcaster: None,
        }
    }

    #[tokio::test]
    async fn test_baseline_fanout_is_log_and_persist() {
        let mut settings = Settings::default();
        settings.log.enabled = false;
        settings.broadcast.enabled = false;
        let store = Arc::new(MockStore {
            saved: Mutex::new(Vec::new()),
        });
        let (_tx, rx) = mpsc::channel(4);
        let dispatcher = Dispatcher::new(
            DispatcherConfig::default(),
            collaborators(settings, store),
            rx,
        );

        let actions = dispatcher.build_actions(&event("European Robin")).await;
        let labels: Vec<_> = actions.iter().map(|a| a.label()).collect();
        assert_eq!(labels, vec!["log", "persist"]);
    }

    #[tokio::test]
    async fn test_integration_variants_need_both_toggle_and_handle() {
        let mut settings = Settings::default();
        settings.log.enabled = false;
        settings.broadcast.enabled = false;
        // toggled on but no client handle wired
        settings.broker.enabled = true;
        settings.range_filter.enabled = true;
        // weather builds from the toggle alone; the action reports the
        // missing client itself
        settings.weather.enabled = true;

        let store = Arc::new(MockStore {
            saved: Mutex::new(Vec::new()),
        });
        let (_tx, rx) = mpsc::channel(4);
        let dispatcher = Dispatcher::new(
            DispatcherConfig::default(),
            collaborators(settings, store),
            rx,
        );

        let actions = dispatcher.build_actions(&event("European Robin")).await;
        let labels: Vec<_> = actions.iter().map(|a| a.label()).collect();
        assert_eq!(labels, vec!["log", "persist", "weather"]);
    }

    #[tokio::test]
    async fn test_run_drains_and_persists_every_species() {
        let mut settings = Settings::default();
        settings.log.enabled = false;
        settings.broadcast.enabled = false;
        let store = Arc::new(MockStore {
            saved: Mutex::new(Vec::new()),
        });

        let (tx, rx) = mpsc::channel(8);
        let dispatcher = Dispatcher::new(
            DispatcherConfig::default(),
            collaborators(settings, Arc::clone(&store)),
            rx,
        );
        let handle = dispatcher.spawn();

        tx.send(event("European Robin")).await.unwrap();
        tx.send(event("Great Tit")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(store.saved.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_detection_is_throttled_once() {
        let mut settings = Settings::default();
        settings.log.enabled = false;
        settings.broadcast.enabled = false;
        let store = Arc::new(MockStore {
            saved: Mutex::new(Vec::new()),
        });

        let (tx, rx) = mpsc::channel(8);
        let dispatcher = Dispatcher::new(
            DispatcherConfig::default(),
            collaborators(settings, Arc::clone(&store)),
            rx,
        );
        let handle = dispatcher.spawn();

        tx.send(event("European Robin")).await.unwrap();
        tx.send(event("European Robin")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }
}

//! Action variants - one downstream side effect per (detection, variant)
//!
//! The set of effects is closed and known at design time, so dispatch is a
//! tagged enum rather than open trait objects. Every variant exposes the
//! same contract: `execute` with inputs pre-bound at construction, and
//! `describe` for observability.
//!
//! Suppressed (throttled) and skipped (disabled / below threshold) paths
//! return `Ok(())`; a returned error is the executor's only retry signal.

mod broadcast;
mod broker;
mod log;
mod persist;
mod range_filter;
mod save_clip;
mod weather;

pub use self::broadcast::BroadcastAction;
pub use self::broker::BrokerAction;
pub use self::log::LogAction;
pub use self::persist::PersistAction;
pub use self::range_filter::RangeFilterAction;
pub use self::save_clip::SaveClipAction;
pub use self::weather::WeatherAction;

use std::sync::Arc;

use contracts::{ActionError, BirdImage, ImageProvider, RetryPolicy};
use tracing::warn;

/// One-shot operation pairing a detection snapshot with the collaborator
/// handles needed for a single side effect
pub enum DetectionAction {
    Log(LogAction),
    Persist(PersistAction),
    SaveClip(SaveClipAction),
    Weather(WeatherAction),
    Broker(BrokerAction),
    RangeFilter(RangeFilterAction),
    Broadcast(BroadcastAction),
    #[cfg(test)]
    Probe(test_support::ProbeAction),
}

impl DetectionAction {
    /// Execute the pre-bound effect.
    ///
    /// Takes `&mut self` and instances are owned by exactly one executor
    /// task, so re-entrant execution of the same instance is impossible.
    pub async fn execute(&mut self) -> Result<(), ActionError> {
        match self {
            Self::Log(action) => action.execute().await,
            Self::Persist(action) => action.execute().await,
            Self::SaveClip(action) => action.execute().await,
            Self::Weather(action) => action.execute().await,
            Self::Broker(action) => action.execute().await,
            Self::RangeFilter(action) => action.execute().await,
            Self::Broadcast(action) => action.execute().await,
            #[cfg(test)]
            Self::Probe(action) => action.execute().await,
        }
    }

    /// Human-readable description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::Log(action) => action.describe(),
            Self::Persist(action) => action.describe(),
            Self::SaveClip(action) => action.describe(),
            Self::Weather(action) => action.describe(),
            Self::Broker(action) => action.describe(),
            Self::RangeFilter(action) => action.describe(),
            Self::Broadcast(action) => action.describe(),
            #[cfg(test)]
            Self::Probe(action) => action.describe(),
        }
    }

    /// Stable variant label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Persist(_) => "persist",
            Self::SaveClip(_) => "save_clip",
            Self::Weather(_) => "weather",
            Self::Broker(_) => "broker",
            Self::RangeFilter(_) => "range_filter",
            Self::Broadcast(_) => "broadcast",
            #[cfg(test)]
            Self::Probe(_) => "probe",
        }
    }

    /// Retry descriptor consumed by the executor
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            // Log failures are swallowed, clip export is invoked inline,
            // and the range refresh re-runs on the next detection anyway.
            Self::Log(_) | Self::SaveClip(_) | Self::RangeFilter(_) => RetryPolicy::disabled(),
            Self::Persist(action) => action.retry_policy(),
            Self::Weather(action) => action.retry_policy(),
            Self::Broker(action) => action.retry_policy(),
            Self::Broadcast(action) => action.retry_policy(),
            #[cfg(test)]
            Self::Probe(action) => action.retry_policy(),
        }
    }
}

/// Best-effort image lookup shared by the broker and broadcast variants.
///
/// A missing provider or a lookup failure degrades to the empty image and
/// never fails the caller.
pub(crate) async fn lookup_image(
    images: Option<&Arc<dyn ImageProvider>>,
    scientific_name: &str,
) -> BirdImage {
    let Some(provider) = images else {
        warn!(scientific_name, "No image provider configured, using empty image");
        return BirdImage::default();
    };
    match provider.get(scientific_name).await {
        Ok(image) => image,
        Err(err) => {
            warn!(
                scientific_name,
                error = %err,
                "Image lookup failed, using empty image"
            );
            BirdImage::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::DetectionAction;
    use contracts::{ActionError, RetryPolicy};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// What the probe should do on each invocation
    pub enum ProbeOutcome {
        Succeed,
        FailTimes(u32),
        AlwaysFail,
        Sleep(Duration),
    }

    /// Instrumented action used by executor tests
    pub struct ProbeAction {
        outcome: ProbeOutcome,
        calls: Arc<AtomicU32>,
    }

    impl ProbeAction {
        pub async fn execute(&mut self) -> Result<(), ActionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                ProbeOutcome::Succeed => Ok(()),
                ProbeOutcome::FailTimes(n) if call < *n => {
                    Err(ActionError::Other("probe failure".to_string()))
                }
                ProbeOutcome::FailTimes(_) => Ok(()),
                ProbeOutcome::AlwaysFail => Err(ActionError::Other("probe failure".to_string())),
                ProbeOutcome::Sleep(duration) => {
                    tokio::time::sleep(*duration).await;
                    Ok(())
                }
            }
        }

        pub fn describe(&self) -> String {
            "Probe action".to_string()
        }

        pub fn retry_policy(&self) -> RetryPolicy {
            RetryPolicy {
                enabled: true,
                max_attempts: 3,
                initial_backoff: Duration::from_millis(10),
                multiplier: 2.0,
            }
        }
    }

    /// Build a probe action plus its shared invocation counter
    pub fn probe_action(outcome: ProbeOutcome) -> (DetectionAction, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let action = DetectionAction::Probe(ProbeAction {
            outcome,
            calls: Arc::clone(&calls),
        });
        (action, calls)
    }
}

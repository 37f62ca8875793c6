//! Collaborator contracts consumed by the dispatch core
//!
//! Everything behind these traits is an external subsystem: the store, the
//! network integrations, the image cache, the capture buffer, the domain
//! event bus. The action variants only depend on the contracts stated here.
//!
//! Shared stateful collaborators must provide their own internal
//! synchronization; actions never re-implement it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{ActionError, BirdImage, Detection, DetectionScore, NewSpeciesEvent};

/// Persistence of record for detections
///
/// `save` is the write path; `search` exists only for identifier
/// reconciliation by the broadcast action.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Persist snapshot + result set atomically
    async fn save(
        &self,
        detection: &Detection,
        scores: &[DetectionScore],
    ) -> Result<(), ActionError>;

    /// Query records matching a common or scientific name
    async fn search(
        &self,
        query: &str,
        ascending: bool,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Detection>, ActionError>;
}

/// Client for the external weather-service integration
#[async_trait]
pub trait WeatherClient: Send + Sync {
    async fn upload(&self, detection: &Detection, pcm: &Bytes) -> Result<(), ActionError>;
}

/// Client for the message broker
///
/// Reconnection is the client's own background responsibility; the publish
/// action only observes `is_connected` immediately before publishing.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), ActionError>;
}

/// Best-effort image cache keyed by scientific name
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn get(&self, scientific_name: &str) -> Result<BirdImage, ActionError>;
}

/// Location-based species model behind the range filter
#[async_trait]
pub trait RangeModel: Send + Sync {
    /// Candidate species for the given day, with occurrence scores
    async fn probable_species(&self, date: NaiveDate) -> Result<Vec<SpeciesScore>, ActionError>;
}

/// One candidate species from the range model
#[derive(Debug, Clone)]
pub struct SpeciesScore {
    pub label: String,
    pub score: f64,
}

/// Non-blocking, best-effort domain event bus; no delivery guarantee
pub trait DetectionEventBus: Send + Sync {
    /// Returns true when the event was accepted for delivery
    fn try_publish_detection(&self, event: NewSpeciesEvent) -> bool;
}

/// Fire-and-forget user-visible notification sink; must never block
pub trait NotificationSink: Send + Sync {
    fn notify_integration_failure(&self, system: &str, error: &ActionError);
}

/// Rolling PCM capture buffer shared with the audio frontend
pub trait CaptureBuffer: Send + Sync {
    /// Read a window of raw PCM anchored at `begin`
    fn read_segment(
        &self,
        source: &str,
        begin: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Bytes, ActionError>;
}

/// Injected live-update sink
///
/// Transport-agnostic callback: the core never learns which streaming
/// protocol sits behind it. Uses `Arc` to allow sharing across instances.
pub type Broadcaster =
    Arc<dyn Fn(&Detection, &BirdImage) -> Result<(), ActionError> + Send + Sync>;

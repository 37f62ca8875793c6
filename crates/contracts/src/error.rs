//! Layered error definitions
//!
//! Categorized by source: config / store / audio / integration / broadcast

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ActionError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Store Errors =====
    /// Datastore write error
    #[error("store save failed for '{species}': {message}")]
    StoreSave { species: String, message: String },

    /// Datastore query error
    #[error("store search failed for '{query}': {message}")]
    StoreSearch { query: String, message: String },

    // ===== Audio Errors =====
    /// Capture buffer read error
    #[error("capture read failed for source '{source_id}': {message}")]
    CaptureRead { source_id: String, message: String },

    /// Clip encode/write error
    #[error("clip export failed for '{clip_name}': {message}")]
    ClipExport { clip_name: String, message: String },

    // ===== Integration Errors =====
    /// Integration client handle was never configured
    #[error("{integration} client is not configured")]
    ClientNotConfigured { integration: String },

    /// Broker client reports disconnected
    #[error("broker client not connected")]
    BrokerNotConnected,

    /// Destination topic missing from settings
    #[error("broker topic is not specified")]
    TopicMissing,

    /// Upload to the weather service failed
    #[error("failed to upload {species} (confidence {confidence:.2}, clip '{clip_name}'): {message}")]
    Upload {
        species: String,
        confidence: f64,
        clip_name: String,
        message: String,
    },

    /// Publish to the message broker failed
    #[error("failed to publish {species} to topic '{topic}': {message}")]
    Publish {
        species: String,
        topic: String,
        message: String,
    },

    // ===== Broadcast Errors =====
    /// Live-update broadcast failed
    #[error("failed to broadcast {species} (confidence {confidence:.2}, clip '{clip_name}'): {message}")]
    Broadcast {
        species: String,
        confidence: f64,
        clip_name: String,
        message: String,
    },

    /// Bounded wait elapsed without the expected artifact
    #[error("{stage} not ready after {waited_ms}ms")]
    WaitTimeout { stage: String, waited_ms: u64 },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ActionError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create datastore write error
    pub fn store_save(species: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreSave {
            species: species.into(),
            message: message.into(),
        }
    }

    /// Create datastore query error
    pub fn store_search(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreSearch {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Create capture buffer read error
    pub fn capture_read(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CaptureRead {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create clip export error
    pub fn clip_export(clip_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClipExport {
            clip_name: clip_name.into(),
            message: message.into(),
        }
    }

    /// Create bounded-wait timeout error
    pub fn wait_timeout(stage: impl Into<String>, waited_ms: u64) -> Self {
        Self::WaitTimeout {
            stage: stage.into(),
            waited_ms,
        }
    }
}

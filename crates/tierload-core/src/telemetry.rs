//! Load-time telemetry.
//!
//! The loader emits one [`LoadEvent`] per module attempt, per batch, per
//! folder and once for the whole setup run. Sinks are fire-and-forget:
//! [`TelemetrySink::record`] cannot fail and must not block.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

/// Default channel capacity for [`BroadcastTelemetry`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// What a telemetry event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventScope {
    Module,
    Batch,
    Folder,
    Setup,
}

/// Outcome tag attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Module installed.
    Loaded,
    /// Module (or an ancestor package) was already registered.
    Duplicate,
    /// Module declined to install for lack of configuration.
    SkippedConfiguration,
    Failed,
    /// Batch, folder or setup finished without failures.
    Success,
    /// Batch finished with at least one failed module.
    Partial,
    /// Folder does not exist.
    Absent,
}

/// A single telemetry event.
#[derive(Debug, Clone, Serialize)]
pub struct LoadEvent {
    pub scope: EventScope,
    pub name: String,
    pub duration_ms: f64,
    pub outcome: EventOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub extras: serde_json::Map<String, serde_json::Value>,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

impl LoadEvent {
    pub fn new(scope: EventScope, name: impl Into<String>, outcome: EventOutcome) -> Self {
        Self {
            scope,
            name: name.into(),
            duration_ms: 0.0,
            outcome,
            error_type: None,
            extras: serde_json::Map::new(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_secs_f64() * 1000.0;
        self
    }

    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

/// Receiver of loader telemetry.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: LoadEvent);
}

/// Shared sink handle.
pub type DynTelemetry = Arc<dyn TelemetrySink>;

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _event: LoadEvent) {}
}

/// Writes events to the `tracing` log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&self, event: LoadEvent) {
        tracing::debug!(
            target: "tierload::telemetry",
            scope = ?event.scope,
            name = %event.name,
            duration_ms = event.duration_ms,
            outcome = ?event.outcome,
            error_type = event.error_type.as_deref().unwrap_or(""),
            extras = %serde_json::Value::Object(event.extras),
            "load event"
        );
    }
}

/// Publishes events on a broadcast channel.
///
/// Events sent while nobody is subscribed are dropped; a slow subscriber
/// loses the oldest events rather than stalling the loader.
#[derive(Clone)]
pub struct BroadcastTelemetry {
    tx: broadcast::Sender<LoadEvent>,
}

impl BroadcastTelemetry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for BroadcastTelemetry {
    fn record(&self, event: LoadEvent) {
        let _ = self.tx.send(event);
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryTelemetry {
    events: Arc<Mutex<Vec<LoadEvent>>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, oldest first.
    pub fn events(&self) -> Vec<LoadEvent> {
        self.events.lock().clone()
    }

    /// Events for one scope.
    pub fn by_scope(&self, scope: EventScope) -> Vec<LoadEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.scope == scope)
            .cloned()
            .collect()
    }

    /// The most recent event recorded under `name`.
    pub fn last_for(&self, name: &str) -> Option<LoadEvent> {
        self.events.lock().iter().rev().find(|e| e.name == name).cloned()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record(&self, event: LoadEvent) {
        self.events.lock().push(event);
    }
}

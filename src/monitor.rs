//! Observability context: a tracing span plus a monitor event channel.
//!
//! The manager and the event loop receive a [`Telemetry`] at construction
//! and log under its span; monitors subscribe to [`MonitorEvent`]s through a
//! broadcast channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::Span;

/// What a monitor event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorKind {
    NewRequest,
    RequestReleased,
    RequestRejected,
    NodeAssigned,
    NodeServed,
    TimeChanged,
}

/// A notification for external monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub kind: MonitorKind,
    /// Simulation time.
    pub time: f64,
    pub description: String,
}

const DEFAULT_CAPACITY: usize = 256;

/// Log span and event channel shared by the engine components.
///
/// # Examples
///
/// ```
/// use msa_routing::monitor::{MonitorKind, Telemetry};
///
/// let telemetry = Telemetry::new("dispatch");
/// let mut rx = telemetry.subscribe();
/// telemetry.publish(MonitorKind::TimeChanged, 12.0, "clock advanced");
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.kind, MonitorKind::TimeChanged);
/// assert_eq!(event.time, 12.0);
/// ```
#[derive(Debug, Clone)]
pub struct Telemetry {
    span: Span,
    events: broadcast::Sender<MonitorEvent>,
}

impl Telemetry {
    pub fn new(name: &str) -> Self {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may lag before it misses
    /// events.
    pub fn with_capacity(name: &str, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            span: tracing::info_span!("msa", engine = name),
            events,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Publishes an event. Never blocks; dropped when nobody listens.
    pub fn publish(&self, kind: MonitorKind, time: f64, description: impl Into<String>) {
        let event = MonitorEvent {
            kind,
            time,
            description: description.into(),
        };
        tracing::debug!(parent: &self.span, kind = ?event.kind, time, "{}", event.description);
        let _ = self.events.send(event);
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new("engine")
    }
}

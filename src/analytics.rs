//! Analytics events and their deferred, idle-gated delivery.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const SWAP_COMPLETED: &str = "Swap Completed";
pub const SWAP_FAILED: &str = "Swap Failed";
pub const SWAP_TRACKING_FAILED: &str = "Swap Tracking Failed";

/// Terminal swap outcome being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapEvent {
    Completed,
    Failed,
}

impl SwapEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::Completed => SWAP_COMPLETED,
            Self::Failed => SWAP_FAILED,
        }
    }
}

/// One analytics emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub name: String,
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Sent without user identity.
    pub anonymous: bool,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: serde_json::Map::new(),
            anonymous: false,
        }
    }

    pub fn with_params(mut self, params: serde_json::Map<String, serde_json::Value>) -> Self {
        self.params = params;
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// Analytics transport. Fire-and-forget.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: AnalyticsEvent);
}

/// Reports whether the user is mid-interaction. Deferred work waits for idle.
#[derive(Debug, Clone)]
pub struct InteractionGate {
    busy: Arc<watch::Sender<bool>>,
}

impl Default for InteractionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionGate {
    pub fn new() -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            busy: Arc::new(busy),
        }
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.send_replace(busy);
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }
}

/// Queues analytics until the interaction gate is idle, then delivers them
/// in submission order.
#[derive(Debug, Clone)]
pub struct DeferredAnalytics {
    tx: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl DeferredAnalytics {
    /// Start the delivery worker. It exits once every handle is dropped and
    /// the queue is drained.
    pub fn spawn(sink: Arc<dyn AnalyticsSink>, idle: watch::Receiver<bool>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver(sink, idle, rx));
        (Self { tx }, worker)
    }

    /// Queue an event. Never blocks.
    pub fn defer(&self, event: AnalyticsEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::warn!("Analytics worker stopped, dropping {}", e.0.name);
        }
    }
}

async fn deliver(
    sink: Arc<dyn AnalyticsSink>,
    mut idle: watch::Receiver<bool>,
    mut rx: mpsc::UnboundedReceiver<AnalyticsEvent>,
) {
    while let Some(event) = rx.recv().await {
        // A closed gate counts as idle.
        let _ = idle.wait_for(|busy| !*busy).await;
        tracing::debug!(event = %event.name, anonymous = event.anonymous, "Delivering analytics");
        sink.track(event);
    }
}

//! Collaborator boundaries: the pipelines that originate requests and receive
//! decisions, plus the one-shot completion signals for submitted transactions.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::arbiter::Surfaced;
use crate::error::{RejectionError, SigningError};
use crate::request::{Category, Decision, MessageKind};
use crate::transaction::{TransactionId, TransactionMeta};

/// Completion signal kinds delivered by the transaction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    /// Terminal submit-or-fail.
    Finished,
    /// Chain confirmation.
    Confirmed,
}

impl CompletionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Confirmed => "confirmed",
        }
    }
}

/// Receivers for both completion signals of one transaction.
#[derive(Debug)]
pub struct CompletionWatch {
    pub finished: oneshot::Receiver<TransactionMeta>,
    pub confirmed: oneshot::Receiver<TransactionMeta>,
}

/// Per-id one-shot completion signals.
///
/// Each `(id, kind)` pair fires at most once; the sender is removed on
/// emission, so a second emit for the same pair is dropped.
#[derive(Debug, Default)]
pub struct CompletionHub {
    senders: Mutex<HashMap<(TransactionId, CompletionKind), oneshot::Sender<TransactionMeta>>>,
}

impl CompletionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register both signals for `id`, replacing any earlier registration.
    pub fn subscribe(&self, id: &TransactionId) -> CompletionWatch {
        let (finished_tx, finished) = oneshot::channel();
        let (confirmed_tx, confirmed) = oneshot::channel();

        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.insert((id.clone(), CompletionKind::Finished), finished_tx);
        senders.insert((id.clone(), CompletionKind::Confirmed), confirmed_tx);

        CompletionWatch {
            finished,
            confirmed,
        }
    }

    /// Deliver a completion signal. Returns false when nobody was waiting.
    pub fn emit(&self, kind: CompletionKind, meta: TransactionMeta) -> bool {
        let sender = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(meta.id.clone(), kind));

        match sender {
            Some(sender) => {
                let id = meta.id.clone();
                let delivered = sender.send(meta).is_ok();
                if !delivered {
                    tracing::debug!("Completion {} for {} dropped by receiver", kind.as_str(), id);
                }
                delivered
            }
            None => false,
        }
    }

    /// Number of registered signals that have not fired.
    pub fn pending(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Upstream transaction pipeline.
#[async_trait]
pub trait TransactionPipeline: Send + Sync {
    /// Hand the transaction to the signer. Failures are terminal.
    async fn approve_transaction(&self, id: &TransactionId) -> Result<(), SigningError>;

    /// Register completion signals for `id`.
    fn subscribe(&self, id: &TransactionId) -> CompletionWatch;

    /// Look up a known transaction (used to find an approval's hash).
    fn transaction(&self, id: &TransactionId) -> Option<TransactionMeta>;

    /// Forward the user's decision on a surfaced transaction.
    fn settle_transaction(&self, id: &TransactionId, decision: Decision);
}

/// Upstream signature-request pipelines, one per message kind.
pub trait MessagePipeline: Send + Sync {
    fn settle_message(&self, kind: MessageKind, id: &str, decision: Decision);
}

/// Upstream approval registry holding chain add/switch requests.
pub trait ApprovalRegistry: Send + Sync {
    fn accept(&self, id: &str, data: &serde_json::Value);

    fn reject(&self, id: &str, error: RejectionError);
}

/// Outcome emitted back to the session transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Approved,
    Rejected,
}

impl SessionOutcome {
    /// Event name on the transport hub.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Approved => "sessionRequest::approved",
            Self::Rejected => "sessionRequest::rejected",
        }
    }
}

impl From<Decision> for SessionOutcome {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => Self::Approved,
            Decision::Reject => Self::Rejected,
        }
    }
}

/// Peer-to-peer session transport.
pub trait SessionTransport: Send + Sync {
    fn emit_session_outcome(&self, peer_id: &str, outcome: SessionOutcome);
}

/// Watches submitted transactions for user notifications. Fire-and-forget.
pub trait NotificationSink: Send + Sync {
    fn watch_submitted_transaction(&self, meta: &TransactionMeta);
}

/// Blocking user-facing notice.
pub trait UserNotice: Send + Sync {
    fn blocking_notice(&self, title: &str, message: &str);
}

/// Renders surfaced items. Rendering itself is external.
pub trait SurfacePresenter: Send + Sync {
    fn present(&self, item: &Surfaced);

    fn dismiss(&self, category: Category);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionStatus;

    #[tokio::test]
    async fn completion_signal_fires_once() {
        let hub = CompletionHub::new();
        let id = TransactionId::from("tx-1");
        let watch = hub.subscribe(&id);
        assert_eq!(hub.pending(), 2);

        let meta = TransactionMeta::new(id.clone(), TransactionStatus::Submitted);
        assert!(hub.emit(CompletionKind::Finished, meta.clone()));
        assert!(!hub.emit(CompletionKind::Finished, meta));
        assert_eq!(hub.pending(), 1);

        let received = watch.finished.await.expect("finished delivered");
        assert_eq!(received.status, TransactionStatus::Submitted);
    }

    #[tokio::test]
    async fn dropped_receiver_is_not_delivered() {
        let hub = CompletionHub::new();
        let id = TransactionId::from("tx-2");
        let watch = hub.subscribe(&id);
        drop(watch.confirmed);

        let meta = TransactionMeta::new(id, TransactionStatus::Confirmed);
        assert!(!hub.emit(CompletionKind::Confirmed, meta));
    }

    #[test]
    fn emit_without_subscription_is_ignored() {
        let hub = CompletionHub::new();
        let meta = TransactionMeta::new(TransactionId::from("nobody"), TransactionStatus::Failed);
        assert!(!hub.emit(CompletionKind::Finished, meta));
    }

    #[test]
    fn session_outcome_event_names() {
        assert_eq!(
            SessionOutcome::from(Decision::Approve).event_name(),
            "sessionRequest::approved"
        );
        assert_eq!(
            SessionOutcome::from(Decision::Reject).event_name(),
            "sessionRequest::rejected"
        );
    }
}

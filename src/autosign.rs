//! Signing path for trusted swap transactions.

use std::sync::Arc;

use crate::analytics::SwapEvent;
use crate::error::SigningError;
use crate::pipeline::{NotificationSink, TransactionPipeline, UserNotice};
use crate::swaps::SwapOutcomeTracker;
use crate::transaction::{PendingTransaction, TransactionStatus};

/// Title of the blocking notice shown when signing fails.
pub const TRANSACTION_ERROR_TITLE: &str = "Transaction error";

/// How an auto-signed transaction ended, as far as this path observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSignOutcome {
    /// The signer refused before anything was submitted.
    SigningFailed(SigningError),
    /// Finished with a status other than submitted.
    Failed(SigningError),
    /// Submitted, but the confirmation signal was dropped.
    Submitted,
    Confirmed,
    /// The pipeline dropped the finished signal.
    Abandoned,
}

/// Signs trusted transactions and follows their completion signals.
pub struct AutoSigner {
    transactions: Arc<dyn TransactionPipeline>,
    notifications: Arc<dyn NotificationSink>,
    notice: Arc<dyn UserNotice>,
    tracker: Arc<SwapOutcomeTracker>,
}

impl AutoSigner {
    pub fn new(
        transactions: Arc<dyn TransactionPipeline>,
        notifications: Arc<dyn NotificationSink>,
        notice: Arc<dyn UserNotice>,
        tracker: Arc<SwapOutcomeTracker>,
    ) -> Self {
        Self {
            transactions,
            notifications,
            notice,
            tracker,
        }
    }

    /// Approve `tx` and follow it to its terminal signal. Signing failures
    /// are shown to the user and never retried.
    pub async fn run(&self, tx: PendingTransaction) -> AutoSignOutcome {
        let id = tx.id.clone();
        let watch = self.transactions.subscribe(&id);

        if let Err(e) = self.transactions.approve_transaction(&id).await {
            tracing::error!(tx_id = %id, "Error while trying to send transaction: {}", e);
            self.notice
                .blocking_notice(TRANSACTION_ERROR_TITLE, &e.to_string());
            self.tracker.store().remove(&id);
            return AutoSignOutcome::SigningFailed(e);
        }

        let Ok(finished) = watch.finished.await else {
            tracing::warn!(tx_id = %id, "Finished signal dropped before delivery");
            self.tracker.store().remove(&id);
            return AutoSignOutcome::Abandoned;
        };

        if finished.status != TransactionStatus::Submitted {
            drop(watch.confirmed);
            if self.tracker.store().has_analytics(&id) {
                // Measuring can wait on the chain; the notice must not.
                let tracker = Arc::clone(&self.tracker);
                let failed = finished.clone();
                tokio::spawn(async move { tracker.track(SwapEvent::Failed, &failed).await });
            }
            let reason = finished
                .error
                .clone()
                .unwrap_or_else(|| format!("transaction ended as {:?}", finished.status));
            let error = SigningError::Failed {
                id: id.to_string(),
                reason,
            };
            tracing::error!(tx_id = %id, "Auto-signed transaction failed: {}", error);
            self.notice
                .blocking_notice(TRANSACTION_ERROR_TITLE, &error.to_string());
            return AutoSignOutcome::Failed(error);
        }

        let mut submitted = finished;
        if submitted.asset_type.is_none() {
            submitted.asset_type = tx.asset_type.clone();
        }
        tracing::info!(tx_id = %id, "Auto-signed transaction submitted");
        self.notifications.watch_submitted_transaction(&submitted);

        match watch.confirmed.await {
            Ok(confirmed) => {
                if self.tracker.store().has_analytics(&id) {
                    self.tracker.track(SwapEvent::Completed, &confirmed).await;
                }
                AutoSignOutcome::Confirmed
            }
            Err(_) => AutoSignOutcome::Submitted,
        }
    }
}

//! The mediator event loop.
//!
//! One task owns the [`ApprovalArbiter`]. Collaborators push events through a
//! [`MediatorHandle`]; classification runs on spawned tasks and comes back as
//! [`MediatorEvent::Classified`], so the loop never waits on the chain.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::analytics::{AnalyticsSink, DeferredAnalytics};
use crate::arbiter::{ApprovalArbiter, Offer, Originators, Resolution};
use crate::autosign::AutoSigner;
use crate::classifier::{Classification, ClassifierPolicy, TransactionClassifier, WalletContext};
use crate::config::MediatorConfig;
use crate::error::{ArbiterError, Error};
use crate::gateway::ChainGateway;
use crate::pipeline::{
    ApprovalRegistry, MessagePipeline, NotificationSink, SessionTransport, SurfacePresenter,
    TransactionPipeline, UserNotice,
};
use crate::request::{
    ApprovalStateSnapshot, Category, Decision, MessageKind, PendingMessage, PendingPeerSession,
};
use crate::swaps::{SwapOutcomeTracker, SwapTrackingRecord, SwapTrackingStore};
use crate::transaction::{PendingTransaction, TransactionId};

/// Everything the mediator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub transactions: Arc<dyn TransactionPipeline>,
    pub messages: Arc<dyn MessagePipeline>,
    pub approvals: Arc<dyn ApprovalRegistry>,
    pub sessions: Arc<dyn SessionTransport>,
    pub presenter: Arc<dyn SurfacePresenter>,
    pub notifications: Arc<dyn NotificationSink>,
    pub notice: Arc<dyn UserNotice>,
    pub gateway: Arc<dyn ChainGateway>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

/// Inputs to the mediator loop.
#[derive(Debug)]
pub enum MediatorEvent {
    UnapprovedTransaction(PendingTransaction),
    UnapprovedMessage {
        kind: MessageKind,
        params: serde_json::Value,
    },
    ApprovalStateChanged(ApprovalStateSnapshot),
    SessionRequest(PendingPeerSession),
    Classified(Classification),
    Decide {
        category: Category,
        decision: Decision,
        ticket: Option<Uuid>,
        reply: oneshot::Sender<Result<Resolution, ArbiterError>>,
    },
    WalletChanged(WalletContext),
    Shutdown,
}

/// Cloneable entry point into a running mediator.
#[derive(Debug, Clone)]
pub struct MediatorHandle {
    tx: mpsc::UnboundedSender<MediatorEvent>,
    swaps: Arc<SwapTrackingStore>,
}

impl MediatorHandle {
    fn send(&self, event: MediatorEvent) -> Result<(), Error> {
        self.tx.send(event).map_err(|_| Error::MediatorClosed)
    }

    pub fn unapproved_transaction(&self, tx: PendingTransaction) -> Result<(), Error> {
        self.send(MediatorEvent::UnapprovedTransaction(tx))
    }

    pub fn unapproved_message(
        &self,
        kind: MessageKind,
        params: serde_json::Value,
    ) -> Result<(), Error> {
        self.send(MediatorEvent::UnapprovedMessage { kind, params })
    }

    pub fn approval_state_changed(&self, snapshot: ApprovalStateSnapshot) -> Result<(), Error> {
        self.send(MediatorEvent::ApprovalStateChanged(snapshot))
    }

    pub fn session_request(&self, session: PendingPeerSession) -> Result<(), Error> {
        self.send(MediatorEvent::SessionRequest(session))
    }

    pub fn wallet_changed(&self, wallet: WalletContext) -> Result<(), Error> {
        self.send(MediatorEvent::WalletChanged(wallet))
    }

    /// Submit a user decision and wait for the arbiter's answer.
    pub async fn decide(
        &self,
        category: Category,
        decision: Decision,
        ticket: Option<Uuid>,
    ) -> Result<Resolution, Error> {
        let (reply, answer) = oneshot::channel();
        self.send(MediatorEvent::Decide {
            category,
            decision,
            ticket,
            reply,
        })?;
        let resolution = answer.await.map_err(|_| Error::MediatorClosed)??;
        Ok(resolution)
    }

    pub async fn approve(&self, category: Category) -> Result<Resolution, Error> {
        self.decide(category, Decision::Approve, None).await
    }

    pub async fn reject(&self, category: Category) -> Result<Resolution, Error> {
        self.decide(category, Decision::Reject, None).await
    }

    /// Record quote-time data for a swap so its outcome can be tracked.
    pub fn register_swap(&self, id: TransactionId, record: SwapTrackingRecord) {
        self.swaps.insert(id, record);
    }

    pub fn shutdown(&self) -> Result<(), Error> {
        self.send(MediatorEvent::Shutdown)
    }
}

/// Owns arbitration state; driven by [`Mediator::run`].
pub struct Mediator {
    arbiter: ApprovalArbiter,
    classifier: Arc<TransactionClassifier>,
    signer: Arc<AutoSigner>,
    wallet: WalletContext,
    rx: mpsc::UnboundedReceiver<MediatorEvent>,
    feedback: mpsc::WeakUnboundedSender<MediatorEvent>,
}

impl Mediator {
    /// Wire the mediator and spawn its loop and analytics worker. Must be
    /// called inside a tokio runtime. `idle` is the interaction gate that
    /// holds analytics back while the user is busy.
    pub fn start(
        config: &MediatorConfig,
        collaborators: Collaborators,
        idle: watch::Receiver<bool>,
    ) -> (MediatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let swaps = Arc::new(SwapTrackingStore::new());
        let (analytics, _worker) = DeferredAnalytics::spawn(collaborators.analytics.clone(), idle);

        let tracker = Arc::new(SwapOutcomeTracker::new(
            collaborators.gateway.clone(),
            collaborators.transactions.clone(),
            swaps.clone(),
            analytics,
            config.selected_address,
        ));
        let signer = Arc::new(AutoSigner::new(
            collaborators.transactions.clone(),
            collaborators.notifications.clone(),
            collaborators.notice.clone(),
            tracker,
        ));
        let classifier = Arc::new(TransactionClassifier::new(
            ClassifierPolicy::from(config),
            collaborators.gateway.clone(),
        ));
        let arbiter = ApprovalArbiter::new(
            Originators {
                transactions: collaborators.transactions,
                messages: collaborators.messages,
                approvals: collaborators.approvals,
                sessions: collaborators.sessions,
            },
            collaborators.presenter,
        );

        let mediator = Self {
            arbiter,
            classifier,
            signer,
            wallet: WalletContext::from_config(config),
            rx,
            feedback: tx.downgrade(),
        };
        let task = tokio::spawn(mediator.run());

        (MediatorHandle { tx, swaps }, task)
    }

    /// Process events until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("Mediator started");
        while let Some(event) = self.rx.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        tracing::info!("Mediator stopped");
    }

    fn handle(&mut self, event: MediatorEvent) -> bool {
        match event {
            MediatorEvent::UnapprovedTransaction(tx) => self.classify(tx),
            MediatorEvent::Classified(classification) => self.on_classified(classification),
            MediatorEvent::UnapprovedMessage { kind, params } => {
                match PendingMessage::from_params(kind, params) {
                    Some(message) => {
                        let offer = self.arbiter.offer_message(message);
                        log_offer(&offer);
                    }
                    None => tracing::warn!(
                        kind = kind.as_str(),
                        "Dropping signature request without an id"
                    ),
                }
            }
            MediatorEvent::ApprovalStateChanged(snapshot) => {
                let offer = self.arbiter.on_approval_state_change(&snapshot);
                log_offer(&offer);
            }
            MediatorEvent::SessionRequest(session) => {
                let offer = self.arbiter.offer_peer_session(session);
                log_offer(&offer);
            }
            MediatorEvent::Decide {
                category,
                decision,
                ticket,
                reply,
            } => {
                let result = self.arbiter.decide(category, decision, ticket);
                if let Err(e) = &result {
                    tracing::warn!("Decision refused: {}", e);
                }
                let _ = reply.send(result);
            }
            MediatorEvent::WalletChanged(wallet) => {
                tracing::debug!(chain_id = wallet.chain_id, "Wallet context updated");
                self.wallet = wallet;
            }
            MediatorEvent::Shutdown => return false,
        }
        true
    }

    fn classify(&self, tx: PendingTransaction) {
        let classifier = self.classifier.clone();
        let wallet = self.wallet.clone();
        let feedback = self.feedback.clone();
        tokio::spawn(async move {
            let classification = classifier.classify(tx, &wallet).await;
            if let Some(tx) = feedback.upgrade() {
                let _ = tx.send(MediatorEvent::Classified(classification));
            }
        });
    }

    fn on_classified(&mut self, classification: Classification) {
        match classification {
            Classification::Suppressed { id } => {
                tracing::debug!(tx_id = %id, "Internal transaction not surfaced");
            }
            Classification::AutoSign { transaction } => {
                let signer = self.signer.clone();
                tokio::spawn(async move {
                    let id = transaction.id.clone();
                    let outcome = signer.run(transaction).await;
                    tracing::debug!(tx_id = %id, ?outcome, "Auto-sign finished");
                });
            }
            Classification::Surface { transaction } => {
                let offer = self.arbiter.offer_transaction(transaction);
                log_offer(&offer);
            }
        }
    }
}

fn log_offer(offer: &Offer) {
    if let Offer::Busy(item) = offer {
        tracing::debug!(
            category = %item.category(),
            id = %item.id(),
            "Request left with its pipeline until the category is free"
        );
    }
}

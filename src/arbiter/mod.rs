//! Approval queue arbitration.
//!
//! Every [`Category`] is an independent Idle/Surfaced state machine holding at
//! most one item. Offers made while a category is surfaced are handed back;
//! queueing belongs to the upstream collaborators, which re-report their head
//! once the current decision is settled.

mod item;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::classifier::ClassifiedTransaction;
use crate::error::{ArbiterError, RejectionError};
use crate::pipeline::{
    ApprovalRegistry, MessagePipeline, SessionTransport, SurfacePresenter, TransactionPipeline,
};
use crate::request::{
    ApprovalStateSnapshot, ApprovalType, Category, Decision, PageMeta, PendingMessage,
    PendingPeerSession,
};

pub use self::item::{Offer, Resolution, Surfaced, SurfacedItem};

/// Collaborators that receive the user's decisions.
#[derive(Clone)]
pub struct Originators {
    pub transactions: Arc<dyn TransactionPipeline>,
    pub messages: Arc<dyn MessagePipeline>,
    pub approvals: Arc<dyn ApprovalRegistry>,
    pub sessions: Arc<dyn SessionTransport>,
}

/// Owns the per-category slots. Only the mediator loop holds it.
pub struct ApprovalArbiter {
    slots: HashMap<Category, Surfaced>,
    page_context: Option<PageMeta>,
    originators: Originators,
    presenter: Arc<dyn SurfacePresenter>,
}

impl ApprovalArbiter {
    pub fn new(originators: Originators, presenter: Arc<dyn SurfacePresenter>) -> Self {
        Self {
            slots: HashMap::new(),
            page_context: None,
            originators,
            presenter,
        }
    }

    /// Offer a signature request. The message's own `meta` refreshes the
    /// page context.
    pub fn offer_message(&mut self, message: PendingMessage) -> Offer {
        if let Some(meta) = &message.page_meta {
            self.page_context = Some(meta.clone());
        }
        let page_meta = self.page_context.clone();
        self.offer(SurfacedItem::Message(message), page_meta)
    }

    /// Offer a classified dapp transaction on the surface it was classified for.
    pub fn offer_transaction(&mut self, transaction: ClassifiedTransaction) -> Offer {
        let page_meta = self.page_context.clone();
        self.offer(SurfacedItem::Transaction(transaction), page_meta)
    }

    /// React to an approval registry change. Only the head entry is examined;
    /// request types other than chain add/switch are ignored.
    pub fn on_approval_state_change(&mut self, snapshot: &ApprovalStateSnapshot) -> Offer {
        let Some((id, head)) = snapshot.head() else {
            return Offer::Ignored;
        };
        if let Some(meta) = head.page_meta() {
            self.page_context = Some(meta);
        }

        if let ApprovalType::Other(kind) = head.kind() {
            tracing::debug!(request_id = %id, kind = %kind, "Ignoring approval request type");
            return Offer::Ignored;
        }
        let Some(request) = head.clone().into_chain_request(id) else {
            return Offer::Ignored;
        };
        let page_meta = self.page_context.clone();
        self.offer(SurfacedItem::Chain(request), page_meta)
    }

    /// Offer a peer session proposal. Page info comes from the peer's own
    /// metadata, not the shared context.
    pub fn offer_peer_session(&mut self, session: PendingPeerSession) -> Offer {
        let page_meta = Some(session.page_meta()).filter(|meta| !meta.is_empty());
        self.offer(SurfacedItem::Peer(session), page_meta)
    }

    fn offer(&mut self, item: SurfacedItem, page_meta: Option<PageMeta>) -> Offer {
        let category = item.category();

        if let Some(current) = self.slots.get(&category) {
            if current.item.id() == item.id() {
                tracing::debug!(%category, id = %item.id(), "Request already surfaced");
                return Offer::Duplicate {
                    ticket: current.ticket,
                };
            }
            tracing::warn!(
                %category,
                surfaced = %current.item.id(),
                offered = %item.id(),
                "Category busy, handing request back"
            );
            return Offer::Busy(item);
        }

        let surfaced = Surfaced {
            ticket: Uuid::new_v4(),
            category,
            item,
            page_meta,
            surfaced_at: Utc::now(),
        };
        let ticket = surfaced.ticket;
        tracing::info!(%category, id = %surfaced.item.id(), %ticket, "Surfacing request");
        self.presenter.present(&surfaced);
        self.slots.insert(category, surfaced);
        Offer::Surfaced { ticket }
    }

    pub fn approve(&mut self, category: Category) -> Resolution {
        self.settle(category, Decision::Approve)
    }

    pub fn reject(&mut self, category: Category) -> Resolution {
        self.settle(category, Decision::Reject)
    }

    fn settle(&mut self, category: Category, decision: Decision) -> Resolution {
        self.decide(category, decision, None)
            .unwrap_or(Resolution::Idle)
    }

    /// Apply a user decision. An Idle category is a no-op. When a ticket is
    /// given it must match the surfaced item, otherwise the slot is untouched.
    pub fn decide(
        &mut self,
        category: Category,
        decision: Decision,
        ticket: Option<Uuid>,
    ) -> Result<Resolution, ArbiterError> {
        let Some(current) = self.slots.get(&category) else {
            tracing::debug!(%category, ?decision, "Decision on idle category ignored");
            return Ok(Resolution::Idle);
        };

        if let Some(got) = ticket
            && got != current.ticket
        {
            return Err(ArbiterError::TicketMismatch {
                category,
                expected: current.ticket,
                got,
            });
        }

        let Some(surfaced) = self.slots.remove(&category) else {
            return Ok(Resolution::Idle);
        };
        self.dispatch(&surfaced.item, decision);
        self.presenter.dismiss(category);
        tracing::info!(%category, id = %surfaced.item.id(), ?decision, "Request settled");

        Ok(Resolution::Resolved {
            category,
            ticket: surfaced.ticket,
            decision,
        })
    }

    fn dispatch(&self, item: &SurfacedItem, decision: Decision) {
        match item {
            SurfacedItem::Message(message) => {
                self.originators
                    .messages
                    .settle_message(message.kind, &message.id, decision);
            }
            SurfacedItem::Transaction(transaction) => {
                self.originators
                    .transactions
                    .settle_transaction(transaction.id(), decision);
            }
            SurfacedItem::Chain(request) => match decision {
                Decision::Approve => self
                    .originators
                    .approvals
                    .accept(&request.id, &request.request_data),
                Decision::Reject => self
                    .originators
                    .approvals
                    .reject(&request.id, RejectionError::user_rejected_request()),
            },
            SurfacedItem::Peer(session) => {
                self.originators
                    .sessions
                    .emit_session_outcome(&session.peer_id, decision.into());
            }
        }
    }

    pub fn surfaced(&self, category: Category) -> Option<&Surfaced> {
        self.slots.get(&category)
    }

    pub fn is_idle(&self, category: Category) -> bool {
        !self.slots.contains_key(&category)
    }

    pub fn surfaced_count(&self) -> usize {
        self.slots.len()
    }

    /// Latest page metadata reported by any category.
    pub fn page_context(&self) -> Option<&PageMeta> {
        self.page_context.as_ref()
    }
}

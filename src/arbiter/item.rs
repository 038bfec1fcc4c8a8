use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::classifier::ClassifiedTransaction;
use crate::request::{
    Category, ChainRequestKind, Decision, PageMeta, PendingChainRequest, PendingMessage,
    PendingPeerSession,
};

/// A request that can occupy an arbitration slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "request")]
pub enum SurfacedItem {
    Message(PendingMessage),
    Transaction(ClassifiedTransaction),
    Chain(PendingChainRequest),
    Peer(PendingPeerSession),
}

impl SurfacedItem {
    pub fn category(&self) -> Category {
        match self {
            Self::Message(message) => Category::Message(message.kind),
            Self::Transaction(transaction) => transaction.surface.category(),
            Self::Chain(request) => match request.kind {
                ChainRequestKind::Add => Category::ChainAdd,
                ChainRequestKind::Switch => Category::ChainSwitch,
            },
            Self::Peer(_) => Category::PeerSession,
        }
    }

    /// Upstream identifier of the request.
    pub fn id(&self) -> &str {
        match self {
            Self::Message(message) => &message.id,
            Self::Transaction(transaction) => transaction.id().as_str(),
            Self::Chain(request) => &request.id,
            Self::Peer(session) => &session.peer_id,
        }
    }
}

/// Occupant of a surfaced slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Surfaced {
    /// Identifies this surfacing; decisions may quote it.
    pub ticket: Uuid,
    pub category: Category,
    pub item: SurfacedItem,
    /// Page context captured when the item was surfaced.
    pub page_meta: Option<PageMeta>,
    pub surfaced_at: DateTime<Utc>,
}

/// Result of offering a request to the arbiter.
#[derive(Debug, Clone, PartialEq)]
pub enum Offer {
    Surfaced { ticket: Uuid },
    /// The same request is already surfaced.
    Duplicate { ticket: Uuid },
    /// Another request holds the category; the item is handed back.
    Busy(SurfacedItem),
    Ignored,
}

impl Offer {
    pub fn ticket(&self) -> Option<Uuid> {
        match self {
            Self::Surfaced { ticket } | Self::Duplicate { ticket } => Some(*ticket),
            Self::Busy(_) | Self::Ignored => None,
        }
    }
}

/// Result of a user decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "resolution")]
pub enum Resolution {
    Resolved {
        category: Category,
        ticket: Uuid,
        decision: Decision,
    },
    /// Nothing was surfaced in the category.
    Idle,
}

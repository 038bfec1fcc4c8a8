//! In-memory collaborators for tests and offline tooling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use uuid::Uuid;

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::arbiter::{Originators, Surfaced};
use crate::error::{GatewayError, RejectionError, SigningError};
use crate::gateway::{Block, ChainGateway, TransactionReceipt};
use crate::pipeline::{
    ApprovalRegistry, CompletionHub, CompletionWatch, MessagePipeline, NotificationSink,
    SessionOutcome, SessionTransport, SurfacePresenter, TransactionPipeline, UserNotice,
};
use crate::request::{Category, Decision, MessageKind};
use crate::token::TokenAsset;
use crate::transaction::{TransactionId, TransactionMeta};

/// Chain state served from memory. Missing entries fail like a real node.
#[derive(Debug, Default, Clone)]
pub struct FakeChain {
    balances: HashMap<Address, U256>,
    receipts: HashMap<B256, TransactionReceipt>,
    blocks: HashMap<B256, Block>,
    tokens: HashMap<Address, TokenAsset>,
    receipt_lookups: Arc<Mutex<Vec<B256>>>,
}

impl FakeChain {
    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.balances.insert(address, balance);
        self
    }

    pub fn with_receipt(mut self, receipt: TransactionReceipt) -> Self {
        self.receipts.insert(receipt.transaction_hash, receipt);
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.insert(block.hash, block);
        self
    }

    pub fn with_token(mut self, address: Address, symbol: &str, decimals: u8) -> Self {
        self.tokens
            .insert(address, TokenAsset::new(address, symbol, decimals));
        self
    }

    /// Hashes passed to `get_transaction_receipt`, shared between clones.
    pub fn receipt_lookups(&self) -> Vec<B256> {
        self.receipt_lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ChainGateway for FakeChain {
    async fn get_balance(&self, address: Address) -> Result<U256, GatewayError> {
        self.balances
            .get(&address)
            .copied()
            .ok_or_else(|| GatewayError::NotFound {
                entity: "account",
                id: address.to_string(),
            })
    }

    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<TransactionReceipt, GatewayError> {
        self.receipt_lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hash);
        self.receipts
            .get(&hash)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                entity: "receipt",
                id: hash.to_string(),
            })
    }

    async fn get_block_by_hash(
        &self,
        hash: B256,
        _full_transactions: bool,
    ) -> Result<Block, GatewayError> {
        self.blocks
            .get(&hash)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                entity: "block",
                id: hash.to_string(),
            })
    }

    async fn get_token_decimals(&self, token: Address) -> Result<u8, GatewayError> {
        self.tokens
            .get(&token)
            .map(|asset| asset.decimals)
            .ok_or_else(|| GatewayError::MetadataLookupFailed {
                address: token.to_string(),
                reason: "execution reverted".to_string(),
            })
    }

    async fn get_asset_symbol(&self, token: Address) -> Result<String, GatewayError> {
        self.tokens
            .get(&token)
            .map(|asset| asset.symbol.clone())
            .ok_or_else(|| GatewayError::MetadataLookupFailed {
                address: token.to_string(),
                reason: "execution reverted".to_string(),
            })
    }
}

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ApproveTransaction(TransactionId),
    SettleTransaction(TransactionId, Decision),
    SettleMessage(MessageKind, String, Decision),
    Accept(String, serde_json::Value),
    Reject(String, RejectionError),
    SessionOutcome(String, SessionOutcome),
    WatchSubmitted(TransactionId),
    Notice { title: String, message: String },
    Present(Category, Uuid),
    Dismiss(Category),
}

/// Records every call made to the collaborator traits it implements.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    analytics: Mutex<Vec<AnalyticsEvent>>,
    transactions: Mutex<HashMap<TransactionId, TransactionMeta>>,
    approve_failure: Mutex<Option<SigningError>>,
    hub: CompletionHub,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    pub fn analytics(&self) -> Vec<AnalyticsEvent> {
        self.analytics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Completion signals handed out by `subscribe`.
    pub fn hub(&self) -> &CompletionHub {
        &self.hub
    }

    /// Make a transaction visible to `transaction(id)` lookups.
    pub fn insert_transaction(&self, meta: TransactionMeta) {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(meta.id.clone(), meta);
    }

    /// Make every later `approve_transaction` fail with `error`.
    pub fn fail_approvals_with(&self, error: SigningError) {
        *self
            .approve_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// All originator roles backed by this recorder.
    pub fn originators(self: &Arc<Self>) -> Originators {
        Originators {
            transactions: self.clone(),
            messages: self.clone(),
            approvals: self.clone(),
            sessions: self.clone(),
        }
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl TransactionPipeline for Recorder {
    async fn approve_transaction(&self, id: &TransactionId) -> Result<(), SigningError> {
        self.record(Call::ApproveTransaction(id.clone()));
        match self
            .approve_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn subscribe(&self, id: &TransactionId) -> CompletionWatch {
        self.hub.subscribe(id)
    }

    fn transaction(&self, id: &TransactionId) -> Option<TransactionMeta> {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn settle_transaction(&self, id: &TransactionId, decision: Decision) {
        self.record(Call::SettleTransaction(id.clone(), decision));
    }
}

impl MessagePipeline for Recorder {
    fn settle_message(&self, kind: MessageKind, id: &str, decision: Decision) {
        self.record(Call::SettleMessage(kind, id.to_string(), decision));
    }
}

impl ApprovalRegistry for Recorder {
    fn accept(&self, id: &str, data: &serde_json::Value) {
        self.record(Call::Accept(id.to_string(), data.clone()));
    }

    fn reject(&self, id: &str, error: RejectionError) {
        self.record(Call::Reject(id.to_string(), error));
    }
}

impl SessionTransport for Recorder {
    fn emit_session_outcome(&self, peer_id: &str, outcome: SessionOutcome) {
        self.record(Call::SessionOutcome(peer_id.to_string(), outcome));
    }
}

impl NotificationSink for Recorder {
    fn watch_submitted_transaction(&self, meta: &TransactionMeta) {
        self.record(Call::WatchSubmitted(meta.id.clone()));
    }
}

impl UserNotice for Recorder {
    fn blocking_notice(&self, title: &str, message: &str) {
        self.record(Call::Notice {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

impl SurfacePresenter for Recorder {
    fn present(&self, item: &Surfaced) {
        self.record(Call::Present(item.category, item.ticket));
    }

    fn dismiss(&self, category: Category) {
        self.record(Call::Dismiss(category));
    }
}

impl AnalyticsSink for Recorder {
    fn track(&self, event: AnalyticsEvent) {
        self.analytics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

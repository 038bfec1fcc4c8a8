//! Transaction classification: decide what an unapproved transaction is and
//! enrich it with what the user needs to judge it.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::config::MediatorConfig;
use crate::gateway::ChainGateway;
use crate::request::Category;
use crate::token::{
    DecodedTokenCall, TokenAsset, TokenList, TokenMethod, TokenRegistry, calc_token_amount,
    decode_approve_data, decode_token_call, from_wei, is_approve_call,
};
use crate::transaction::{PendingTransaction, TransactionId};

/// Wallet state the classifier reads. Cheap to clone per event.
#[derive(Debug, Clone, Default)]
pub struct WalletContext {
    pub chain_id: u64,
    pub selected_address: Option<Address>,
    pub tokens: TokenList,
    pub registry: TokenRegistry,
}

impl WalletContext {
    pub fn from_config(config: &MediatorConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            selected_address: config.selected_address,
            tokens: config.tokens.clone(),
            registry: config.token_registry.clone(),
        }
    }
}

/// Origin tags and trusted contracts that steer classification.
#[derive(Debug, Clone)]
pub struct ClassifierPolicy {
    pub internal_origin: String,
    pub swap_origin: Option<String>,
    pub swap_contracts: BTreeMap<u64, Address>,
}

impl From<&MediatorConfig> for ClassifierPolicy {
    fn from(config: &MediatorConfig) -> Self {
        Self {
            internal_origin: config.internal_origin.clone(),
            swap_origin: config.swap_origin.clone(),
            swap_contracts: config.swap_contracts.clone(),
        }
    }
}

/// Which decision surface a surfaced transaction needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalSurface {
    DappTransaction,
    TokenApproval,
}

impl ApprovalSurface {
    pub fn category(self) -> Category {
        match self {
            Self::DappTransaction => Category::DappTransaction,
            Self::TokenApproval => Category::TokenApproval,
        }
    }
}

/// What the transaction moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TransferKind {
    Native,
    Token {
        asset: TokenAsset,
        call: DecodedTokenCall,
    },
}

/// A pending transaction plus derived fields. The raw record is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedTransaction {
    pub pending: PendingTransaction,
    pub kind: TransferKind,
    /// Token recipient for token transfers, raw `to` otherwise.
    pub effective_to: Option<Address>,
    /// Token amount for token transfers, raw value otherwise.
    pub effective_value: U256,
    pub readable_value: String,
    pub surface: ApprovalSurface,
}

impl ClassifiedTransaction {
    pub fn id(&self) -> &TransactionId {
        &self.pending.id
    }
}

/// Classifier outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Classification {
    /// Wallet-internal transaction; never surfaced.
    Suppressed { id: TransactionId },
    /// Trusted swap transaction; signed without user approval.
    AutoSign { transaction: PendingTransaction },
    /// Needs a user decision.
    Surface { transaction: ClassifiedTransaction },
}

/// Classifies unapproved transactions.
pub struct TransactionClassifier {
    policy: ClassifierPolicy,
    gateway: Arc<dyn ChainGateway>,
}

impl TransactionClassifier {
    pub fn new(policy: ClassifierPolicy, gateway: Arc<dyn ChainGateway>) -> Self {
        Self { policy, gateway }
    }

    /// Classify one transaction. Never fails: lookup and decode failures
    /// degrade to defaults.
    pub async fn classify(&self, tx: PendingTransaction, ctx: &WalletContext) -> Classification {
        if tx.origin == self.policy.internal_origin {
            tracing::debug!(tx_id = %tx.id, "Suppressing wallet-internal transaction");
            return Classification::Suppressed { id: tx.id };
        }

        if self.is_trusted_swap(&tx, ctx.chain_id) {
            tracing::info!(tx_id = %tx.id, origin = %tx.origin, "Auto-signing swap transaction");
            return Classification::AutoSign { transaction: tx };
        }

        let surface = match tx.transaction.call_data() {
            Some(data) if is_approve_call(data) => ApprovalSurface::TokenApproval,
            _ => ApprovalSurface::DappTransaction,
        };

        let transaction = match self.token_transfer(&tx) {
            Some((token, call)) => {
                let asset = self.resolve_asset(token, ctx).await;
                ClassifiedTransaction {
                    effective_to: Some(call.address),
                    effective_value: call.amount,
                    readable_value: calc_token_amount(call.amount, asset.decimals),
                    kind: TransferKind::Token { asset, call },
                    pending: tx,
                    surface,
                }
            }
            None => {
                let value = tx.transaction.value.unwrap_or_default();
                ClassifiedTransaction {
                    effective_to: tx.transaction.to,
                    effective_value: value,
                    readable_value: from_wei(value),
                    kind: TransferKind::Native,
                    pending: tx,
                    surface,
                }
            }
        };

        tracing::info!(
            tx_id = %transaction.id(),
            surface = ?transaction.surface,
            readable_value = %transaction.readable_value,
            "Classified transaction for approval"
        );
        Classification::Surface { transaction }
    }

    fn is_trusted_swap(&self, tx: &PendingTransaction, chain_id: u64) -> bool {
        let Some(swap_origin) = self.policy.swap_origin.as_deref() else {
            return false;
        };
        if tx.origin != swap_origin {
            return false;
        }
        let (Some(to), Some(contract)) = (
            tx.transaction.to,
            self.policy.swap_contracts.get(&chain_id).copied(),
        ) else {
            return false;
        };
        if to == contract {
            return true;
        }

        match tx.transaction.call_data() {
            Some(data) if is_approve_call(data) => match decode_approve_data(data) {
                Ok(approve) => approve.spender == contract,
                Err(e) => {
                    tracing::debug!(tx_id = %tx.id, "Swap approve data did not decode: {}", e);
                    false
                }
            },
            _ => false,
        }
    }

    /// Token contract and decoded call when the transaction is a plain
    /// `transfer` with no native value.
    fn token_transfer(&self, tx: &PendingTransaction) -> Option<(Address, DecodedTokenCall)> {
        if !tx.transaction.is_zero_value() {
            return None;
        }
        let data = tx.transaction.call_data()?;
        let token = tx.transaction.to?;

        match decode_token_call(data) {
            Ok(call) if call.method == TokenMethod::Transfer => Some((token, call)),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(tx_id = %tx.id, "Call data is not a token transfer: {}", e);
                None
            }
        }
    }

    async fn resolve_asset(&self, token: Address, ctx: &WalletContext) -> TokenAsset {
        if let Some(asset) = ctx.tokens.find(token) {
            return asset.clone();
        }
        if let Some(asset) = ctx.registry.get(token) {
            return asset.clone();
        }

        let decimals = match self.gateway.get_token_decimals(token).await {
            Ok(decimals) => decimals,
            Err(e) => {
                tracing::warn!(%token, "Token decimals lookup failed, treating as unknown: {}", e);
                return TokenAsset::unknown(token);
            }
        };
        match self.gateway.get_asset_symbol(token).await {
            Ok(symbol) => TokenAsset::new(token, symbol, decimals),
            Err(e) => {
                tracing::warn!(%token, "Token symbol lookup failed, treating as unknown: {}", e);
                TokenAsset::unknown(token)
            }
        }
    }
}

//! Swap outcome tracking: quote-time records and post-finalization metrics.

mod received;
mod tracker;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::transaction::TransactionId;

pub use self::received::tokens_received;
pub use self::tracker::{SwapMetrics, SwapOutcomeTracker};

/// Token the swap pays out. The zero address stands for the native currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationToken {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl DestinationToken {
    pub fn is_native(&self) -> bool {
        self.address == Address::ZERO
    }
}

/// Quote-time values needed to judge execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapAnalyticsParams {
    /// Unix seconds when the swap was sent.
    pub sent_at: i64,
    pub gas_estimate: U256,
    /// Native balance before the swap.
    pub eth_account_balance: U256,
    #[serde(default)]
    pub approval_transaction_id: Option<TransactionId>,
}

/// Everything known about one swap transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTrackingRecord {
    pub destination_token: DestinationToken,
    /// Quoted amount in whole destination-token units.
    pub destination_amount: Decimal,
    /// Base analytics properties captured at quote time.
    #[serde(default)]
    pub analytics: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub params_for_analytics: Option<SwapAnalyticsParams>,
    #[serde(default)]
    pub gas_used: Option<U256>,
    /// Amount received in base units.
    #[serde(default)]
    pub received_destination_amount: Option<U256>,
}

/// Swap records keyed by transaction id.
#[derive(Debug, Default)]
pub struct SwapTrackingStore {
    records: Mutex<HashMap<TransactionId, SwapTrackingRecord>>,
}

impl SwapTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: TransactionId, record: SwapTrackingRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, record);
    }

    pub fn get(&self, id: &TransactionId) -> Option<SwapTrackingRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// True while the swap still has analytics to emit.
    pub fn has_analytics(&self, id: &TransactionId) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .is_some_and(|record| record.analytics.is_some())
    }

    /// Record the measured outcome and take the analytics payload. After this
    /// the swap can no longer be tracked; the caller removes the record once
    /// the metrics are out.
    pub fn finalize(
        &self,
        id: &TransactionId,
        gas_used: U256,
        received: Option<U256>,
    ) -> Option<serde_json::Map<String, serde_json::Value>> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = records.get_mut(id)?;
        record.gas_used = Some(gas_used);
        if received.is_some() {
            record.received_destination_amount = received;
        }
        record.params_for_analytics = None;
        record.analytics.take()
    }

    pub fn remove(&self, id: &TransactionId) -> Option<SwapTrackingRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

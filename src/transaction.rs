//! Pending transaction records as emitted by the upstream transaction pipeline.

use std::fmt;

use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Opaque transaction id assigned by the transaction pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Raw call fields of an unapproved transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

impl TransactionParams {
    /// Call data, or `None` when absent or `0x`.
    pub fn call_data(&self) -> Option<&[u8]> {
        self.data
            .as_ref()
            .map(|data| data.as_ref())
            .filter(|data| !data.is_empty())
    }

    /// True when the value is absent or zero.
    pub fn is_zero_value(&self) -> bool {
        self.value.is_none_or(|value| value.is_zero())
    }
}

/// One not-yet-approved transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub id: TransactionId,
    pub origin: String,
    pub transaction: TransactionParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
}

/// Lifecycle status reported by the transaction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Unapproved,
    Approved,
    Signed,
    Submitted,
    Confirmed,
    Failed,
    Rejected,
    Dropped,
}

/// Transaction record delivered on completion signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    pub id: TransactionId,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub transaction: TransactionParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionMeta {
    pub fn new(id: TransactionId, status: TransactionStatus) -> Self {
        Self {
            id,
            status,
            transaction_hash: None,
            transaction: TransactionParams::default(),
            asset_type: None,
            error: None,
        }
    }

    pub fn with_hash(mut self, hash: B256) -> Self {
        self.transaction_hash = Some(hash);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_call_data_is_treated_as_absent() {
        let params = TransactionParams {
            data: Some(Bytes::new()),
            ..Default::default()
        };
        assert!(params.call_data().is_none());
        assert!(params.is_zero_value());
    }

    #[test]
    fn parses_pipeline_json() {
        let tx: PendingTransaction = serde_json::from_value(serde_json::json!({
            "id": "a1b2",
            "origin": "dapp.eth",
            "transaction": {
                "to": "0x6b175474e89094c44da98b954eedeac495271d0f",
                "value": "0x0",
                "gasPrice": "0x3b9aca00",
                "data": "0x"
            }
        }))
        .expect("valid pending transaction");

        assert_eq!(tx.id.as_str(), "a1b2");
        assert_eq!(tx.transaction.gas_price, Some(U256::from(1_000_000_000u64)));
        assert!(tx.transaction.call_data().is_none());
    }
}

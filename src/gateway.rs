//! Chain Gateway boundary: read-only chain queries used for enrichment and tracking.

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Event log emitted by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

/// Transaction receipt fields this core reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_hash: B256,
    pub gas_used: U256,
    #[serde(default)]
    pub effective_gas_price: Option<U256>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Gas cost in wei, falling back to the submitted gas price.
    pub fn gas_cost(&self, fallback_gas_price: Option<U256>) -> Option<U256> {
        let price = self.effective_gas_price.or(fallback_gas_price)?;
        self.gas_used.checked_mul(price)
    }
}

/// Block header fields this core reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: B256,
    pub number: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

/// Query surface of the chain. Key management, broadcasting and node
/// selection live behind this trait and are not this crate's concern.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn get_balance(&self, address: Address) -> Result<U256, GatewayError>;

    async fn get_transaction_receipt(&self, hash: B256)
    -> Result<TransactionReceipt, GatewayError>;

    async fn get_block_by_hash(
        &self,
        hash: B256,
        full_transactions: bool,
    ) -> Result<Block, GatewayError>;

    async fn get_token_decimals(&self, token: Address) -> Result<u8, GatewayError>;

    async fn get_asset_symbol(&self, token: Address) -> Result<String, GatewayError>;
}

/// Gateway for offline tooling: every query reports the chain as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGateway;

#[async_trait]
impl ChainGateway for OfflineGateway {
    async fn get_balance(&self, _address: Address) -> Result<U256, GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn get_transaction_receipt(
        &self,
        _hash: B256,
    ) -> Result<TransactionReceipt, GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn get_block_by_hash(
        &self,
        _hash: B256,
        _full_transactions: bool,
    ) -> Result<Block, GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn get_token_decimals(&self, _token: Address) -> Result<u8, GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn get_asset_symbol(&self, _token: Address) -> Result<String, GatewayError> {
        Err(GatewayError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_cost_prefers_effective_price() {
        let receipt = TransactionReceipt {
            transaction_hash: B256::ZERO,
            block_hash: B256::ZERO,
            gas_used: U256::from(21_000u64),
            effective_gas_price: Some(U256::from(2u64)),
            logs: Vec::new(),
        };
        assert_eq!(
            receipt.gas_cost(Some(U256::from(5u64))),
            Some(U256::from(42_000u64))
        );
    }

    #[test]
    fn gas_cost_needs_some_price() {
        let receipt = TransactionReceipt {
            transaction_hash: B256::ZERO,
            block_hash: B256::ZERO,
            gas_used: U256::from(21_000u64),
            effective_gas_price: None,
            logs: Vec::new(),
        };
        assert_eq!(receipt.gas_cost(None), None);
    }

    #[tokio::test]
    async fn offline_gateway_reports_unavailable() {
        let err = OfflineGateway.get_token_decimals(Address::ZERO).await.unwrap_err();
        assert_eq!(err, GatewayError::Unavailable);
    }
}

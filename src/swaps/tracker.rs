use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::{SwapTrackingStore, tokens_received};
use crate::analytics::{AnalyticsEvent, DeferredAnalytics, SWAP_TRACKING_FAILED, SwapEvent};
use crate::error::TrackingError;
use crate::gateway::ChainGateway;
use crate::pipeline::TransactionPipeline;
use crate::token::calc_token_amount;
use crate::transaction::TransactionMeta;

/// Realized-vs-quoted execution metrics of one swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapMetrics {
    /// Seconds between sending and the containing block.
    pub time_to_mine: i64,
    pub estimated_vs_used_gas_ratio: String,
    pub quote_vs_execution_ratio: String,
    pub token_to_amount_received: String,
}

/// Measures finalized swaps and emits their metrics off the interactive path.
pub struct SwapOutcomeTracker {
    gateway: Arc<dyn ChainGateway>,
    transactions: Arc<dyn TransactionPipeline>,
    store: Arc<SwapTrackingStore>,
    analytics: DeferredAnalytics,
    selected_address: Option<Address>,
}

impl SwapOutcomeTracker {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        transactions: Arc<dyn TransactionPipeline>,
        store: Arc<SwapTrackingStore>,
        analytics: DeferredAnalytics,
        selected_address: Option<Address>,
    ) -> Self {
        Self {
            gateway,
            transactions,
            store,
            analytics,
            selected_address,
        }
    }

    pub fn store(&self) -> &Arc<SwapTrackingStore> {
        &self.store
    }

    /// Track a swap outcome. Never fails: errors become a
    /// `SWAP_TRACKING_FAILED` event. The record is released once either event
    /// is queued.
    pub async fn track(&self, event: SwapEvent, meta: &TransactionMeta) {
        match self.measure(meta).await {
            Ok((metrics, mut params)) => {
                tracing::info!(
                    tx_id = %meta.id,
                    event = event.name(),
                    gas_ratio = %metrics.estimated_vs_used_gas_ratio,
                    quote_ratio = %metrics.quote_vs_execution_ratio,
                    "Swap outcome measured"
                );
                if let Ok(serde_json::Value::Object(measured)) = serde_json::to_value(&metrics) {
                    params.extend(measured);
                }
                self.analytics.defer(AnalyticsEvent::new(event.name()));
                self.analytics
                    .defer(AnalyticsEvent::new(event.name()).with_params(params).anonymous());
                if let Some(record) = self.store.remove(&meta.id) {
                    tracing::debug!(
                        tx_id = %meta.id,
                        gas_used = ?record.gas_used,
                        received = ?record.received_destination_amount,
                        "Swap tracking record released"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(tx_id = %meta.id, "Swap tracking failed: {}", e);
                let mut params = serde_json::Map::new();
                params.insert("error".to_string(), serde_json::Value::from(e.to_string()));
                self.analytics
                    .defer(AnalyticsEvent::new(SWAP_TRACKING_FAILED).with_params(params));
                self.store.remove(&meta.id);
            }
        }
    }

    async fn measure(
        &self,
        meta: &TransactionMeta,
    ) -> Result<(SwapMetrics, serde_json::Map<String, serde_json::Value>), TrackingError> {
        let missing = || TrackingError::MissingRecord {
            id: meta.id.to_string(),
        };
        let record = self.store.get(&meta.id).ok_or_else(missing)?;
        let params = record.params_for_analytics.clone().ok_or_else(missing)?;
        let user = self.selected_address.ok_or(TrackingError::NoSelectedAddress)?;
        let hash = meta.transaction_hash.ok_or_else(|| TrackingError::MissingHash {
            id: meta.id.to_string(),
        })?;

        let approval = params
            .approval_transaction_id
            .as_ref()
            .and_then(|id| self.transactions.transaction(id));

        let balance = self.gateway.get_balance(user).await?;
        let receipt = self.gateway.get_transaction_receipt(hash).await?;
        let block = self.gateway.get_block_by_hash(receipt.block_hash, false).await?;
        let approval_receipt = match approval.as_ref().and_then(|tx| tx.transaction_hash) {
            Some(approval_hash) => Some(self.gateway.get_transaction_receipt(approval_hash).await?),
            None => None,
        };

        let received = tokens_received(
            &receipt,
            approval_receipt.as_ref(),
            &meta.transaction,
            approval.as_ref().map(|tx| &tx.transaction),
            &record.destination_token,
            user,
            params.eth_account_balance,
            balance,
        );

        let decimals = record.destination_token.decimals;
        let received_units = calc_token_amount(received.unwrap_or_default(), decimals);

        let time_to_mine = i64::try_from(block.timestamp)
            .map_err(|e| TrackingError::Arithmetic {
                reason: format!("block timestamp out of range: {e}"),
            })?
            - params.sent_at;
        let estimated_vs_used_gas_ratio = percentage(
            to_decimal(receipt.gas_used)?,
            to_decimal(params.gas_estimate)?,
            "gas estimate",
        )?;
        let quote_vs_execution_ratio = percentage(
            parse_decimal(&received_units)?,
            record.destination_amount,
            "quoted destination amount",
        )?;

        let metrics = SwapMetrics {
            time_to_mine,
            estimated_vs_used_gas_ratio,
            quote_vs_execution_ratio,
            token_to_amount_received: received_units,
        };

        let analytics = self
            .store
            .finalize(&meta.id, receipt.gas_used, received)
            .unwrap_or_default();

        Ok((metrics, analytics))
    }
}

/// `part / whole * 100` rounded half away from zero to 2 places, with `%`.
fn percentage(part: Decimal, whole: Decimal, what: &str) -> Result<String, TrackingError> {
    let ratio = part
        .checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| TrackingError::Arithmetic {
            reason: format!("cannot divide by {what} {whole}"),
        })?;
    let rounded = ratio.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Ok(format!("{rounded:.2}%"))
}

fn to_decimal(value: U256) -> Result<Decimal, TrackingError> {
    parse_decimal(&value.to_string())
}

fn parse_decimal(value: &str) -> Result<Decimal, TrackingError> {
    Decimal::from_str(value).map_err(|e| TrackingError::Arithmetic {
        reason: format!("{value} is not representable: {e}"),
    })
}

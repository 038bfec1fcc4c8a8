//! End-to-end flows through a running mediator with in-memory collaborators.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy_primitives::{Address, B256, Bytes, U256, address};
use alloy_sol_types::SolCall;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;

use approval_mediator::analytics::{InteractionGate, SWAP_COMPLETED};
use approval_mediator::arbiter::{Resolution, Surfaced, SurfacedItem};
use approval_mediator::config::{LoggingConfig, MediatorConfig};
use approval_mediator::gateway::{Block, TransactionReceipt};
use approval_mediator::mediator::{Collaborators, Mediator, MediatorHandle};
use approval_mediator::pipeline::{CompletionKind, SessionOutcome, SurfacePresenter};
use approval_mediator::request::{
    ApprovalStateSnapshot, Category, Decision, PeerMeta, PendingPeerSession,
};
use approval_mediator::swaps::{DestinationToken, SwapAnalyticsParams, SwapTrackingRecord};
use approval_mediator::testing::{Call, FakeChain, Recorder};
use approval_mediator::token::{IERC20, TokenList, TokenRegistry};
use approval_mediator::transaction::{
    PendingTransaction, TransactionId, TransactionMeta, TransactionParams, TransactionStatus,
};

const USER: Address = address!("0x2222222222222222222222222222222222222222");
const SWAP_CONTRACT: Address = address!("0x881d40237659c251811cec9c364ef91dc08d300c");
const USDC: Address = address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
const RECIPIENT: Address = address!("0x4444444444444444444444444444444444444444");
const SWAP_HASH: B256 = B256::repeat_byte(0xaa);
const BLOCK_HASH: B256 = B256::repeat_byte(0xbb);

/// Presenter that keeps what was put on screen.
#[derive(Default)]
struct Screen {
    shown: Mutex<Vec<Surfaced>>,
}

impl Screen {
    fn shown(&self) -> Vec<Surfaced> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SurfacePresenter for Screen {
    fn present(&self, item: &Surfaced) {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item.clone());
    }

    fn dismiss(&self, _category: Category) {}
}

struct Harness {
    recorder: Arc<Recorder>,
    screen: Arc<Screen>,
    handle: MediatorHandle,
    _gate: InteractionGate,
}

fn config() -> MediatorConfig {
    MediatorConfig {
        internal_origin: "MMM".to_string(),
        swap_origin: Some("swaps.example".to_string()),
        chain_id: 1,
        selected_address: Some(USER),
        swap_contracts: BTreeMap::from([(1, SWAP_CONTRACT)]),
        tokens: TokenList::default(),
        token_registry: TokenRegistry::default(),
        logging: LoggingConfig {
            filter: "info".to_string(),
            json: false,
        },
    }
}

fn chain() -> FakeChain {
    FakeChain::default()
        .with_token(USDC, "USDC", 6)
        .with_balance(USER, U256::from(2_000_000_000_000_000_000u128))
        .with_receipt(TransactionReceipt {
            transaction_hash: SWAP_HASH,
            block_hash: BLOCK_HASH,
            gas_used: U256::from(23_000u64),
            effective_gas_price: Some(U256::ZERO),
            logs: Vec::new(),
        })
        .with_block(Block {
            hash: BLOCK_HASH,
            number: 19_000_000,
            timestamp: 1_700_000_042,
        })
}

fn start() -> Harness {
    let recorder = Recorder::new();
    let screen = Arc::new(Screen::default());
    let gate = InteractionGate::new();
    let collaborators = Collaborators {
        transactions: recorder.clone(),
        messages: recorder.clone(),
        approvals: recorder.clone(),
        sessions: recorder.clone(),
        presenter: screen.clone(),
        notifications: recorder.clone(),
        notice: recorder.clone(),
        gateway: Arc::new(chain()),
        analytics: recorder.clone(),
    };
    let (handle, _task) = Mediator::start(&config(), collaborators, gate.subscribe());
    Harness {
        recorder,
        screen,
        handle,
        _gate: gate,
    }
}

async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached in time");
}

#[tokio::test]
async fn token_transfer_is_surfaced_with_readable_amount() {
    let h = start();
    let data = IERC20::transferCall {
        to: RECIPIENT,
        value: U256::from(1_000_000u64),
    }
    .abi_encode();

    h.handle
        .unapproved_transaction(PendingTransaction {
            id: TransactionId::from("tx-usdc"),
            origin: "dapp.eth".to_string(),
            transaction: TransactionParams {
                to: Some(USDC),
                value: Some(U256::ZERO),
                data: Some(Bytes::from(data)),
                ..Default::default()
            },
            asset_type: None,
        })
        .expect("mediator running");
    eventually(|| !h.screen.shown().is_empty()).await;

    let shown = h.screen.shown();
    assert_eq!(shown[0].category, Category::DappTransaction);
    let SurfacedItem::Transaction(tx) = &shown[0].item else {
        panic!("expected a transaction, got {:?}", shown[0].item);
    };
    assert_eq!(tx.readable_value, "1");
    assert_eq!(tx.effective_to, Some(RECIPIENT));

    h.handle
        .reject(Category::DappTransaction)
        .await
        .expect("decided");
    assert_eq!(
        h.recorder.calls(),
        vec![Call::SettleTransaction(
            TransactionId::from("tx-usdc"),
            Decision::Reject
        )]
    );
}

#[tokio::test]
async fn trusted_swap_is_signed_and_measured() {
    let h = start();
    let id = TransactionId::from("swap-1");
    h.handle.register_swap(
        id.clone(),
        SwapTrackingRecord {
            destination_token: DestinationToken {
                address: Address::ZERO,
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            destination_amount: dec!(1),
            analytics: Some(serde_json::Map::from_iter([(
                "token_to".to_string(),
                serde_json::Value::from("ETH"),
            )])),
            params_for_analytics: Some(SwapAnalyticsParams {
                sent_at: 1_700_000_000,
                gas_estimate: U256::from(21_000u64),
                eth_account_balance: U256::from(1_000_000_000_000_000_000u128),
                approval_transaction_id: None,
            }),
            gas_used: None,
            received_destination_amount: None,
        },
    );

    h.handle
        .unapproved_transaction(PendingTransaction {
            id: id.clone(),
            origin: "swaps.example".to_string(),
            transaction: TransactionParams {
                to: Some(SWAP_CONTRACT),
                value: Some(U256::ZERO),
                ..Default::default()
            },
            asset_type: Some("ETH".to_string()),
        })
        .expect("mediator running");
    eventually(|| {
        h.recorder
            .count(|call| matches!(call, Call::ApproveTransaction(_)))
            == 1
    })
    .await;

    assert!(h.recorder.hub().emit(
        CompletionKind::Finished,
        TransactionMeta::new(id.clone(), TransactionStatus::Submitted).with_hash(SWAP_HASH),
    ));
    eventually(|| {
        h.recorder
            .count(|call| matches!(call, Call::WatchSubmitted(_)))
            == 1
    })
    .await;
    assert!(h.recorder.hub().emit(
        CompletionKind::Confirmed,
        TransactionMeta::new(id.clone(), TransactionStatus::Confirmed).with_hash(SWAP_HASH),
    ));
    eventually(|| h.recorder.analytics().len() == 2).await;

    let events = h.recorder.analytics();
    assert_eq!(events[0].name, SWAP_COMPLETED);
    assert!(events[0].params.is_empty());
    assert!(events[1].anonymous);
    assert_eq!(events[1].params["token_to"], "ETH");
    assert_eq!(events[1].params["estimated_vs_used_gas_ratio"], "109.52%");
    assert_eq!(events[1].params["time_to_mine"], 42);
    assert!(h.screen.shown().is_empty());
}

#[tokio::test]
async fn chain_switch_is_accepted_once() {
    let h = start();
    let request_data = json!({
        "chainId": "0x89",
        "type": "switch",
        "pageMeta": { "title": "Uniswap", "url": "https://app.uniswap.org" }
    });
    let snapshot: ApprovalStateSnapshot = serde_json::from_value(json!({
        "pendingApprovalCount": 1,
        "pendingApprovals": {
            "approval-1": {
                "type": "SWITCH_ETHEREUM_CHAIN",
                "origin": "app.uniswap.org",
                "requestData": request_data.clone()
            }
        }
    }))
    .expect("registry payload");

    h.handle
        .approval_state_changed(snapshot.clone())
        .expect("mediator running");
    h.handle
        .approval_state_changed(snapshot)
        .expect("mediator running");

    let first = h.handle.approve(Category::ChainSwitch).await.expect("decided");
    let second = h.handle.approve(Category::ChainSwitch).await.expect("decided");

    assert!(matches!(first, Resolution::Resolved { .. }));
    assert_eq!(second, Resolution::Idle);
    assert_eq!(
        h.recorder.calls(),
        vec![Call::Accept("approval-1".to_string(), request_data)]
    );
    let shown = h.screen.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(
        shown[0].page_meta.as_ref().and_then(|m| m.title.as_deref()),
        Some("Uniswap")
    );
}

#[tokio::test]
async fn peer_session_rejection_is_reported_to_the_transport() {
    let h = start();
    h.handle
        .session_request(PendingPeerSession {
            peer_id: "peer-7".to_string(),
            peer_meta: Some(PeerMeta {
                name: Some("Zapper".to_string()),
                url: Some("https://zapper.fi".to_string()),
                ..Default::default()
            }),
        })
        .expect("mediator running");

    let resolution = h.handle.reject(Category::PeerSession).await.expect("decided");

    assert!(matches!(
        resolution,
        Resolution::Resolved {
            decision: Decision::Reject,
            ..
        }
    ));
    assert_eq!(
        h.recorder.calls(),
        vec![Call::SessionOutcome(
            "peer-7".to_string(),
            SessionOutcome::Rejected
        )]
    );
}

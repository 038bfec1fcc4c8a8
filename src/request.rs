//! Non-transaction approval requests: signatures, chain requests, peer sessions.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Signature request flavour; each kind owns its own arbitration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Personal,
    Typed,
    Eth,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Typed => "typed",
            Self::Eth => "eth",
        }
    }
}

/// Arbitration category. Categories are fully independent state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "category", content = "kind")]
pub enum Category {
    Message(MessageKind),
    DappTransaction,
    TokenApproval,
    ChainAdd,
    ChainSwitch,
    PeerSession,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(kind) => write!(f, "message:{}", kind.as_str()),
            Self::DappTransaction => f.write_str("dapp_transaction"),
            Self::TokenApproval => f.write_str("token_approval"),
            Self::ChainAdd => f.write_str("chain_add"),
            Self::ChainSwitch => f.write_str("chain_switch"),
            Self::PeerSession => f.write_str("peer_session"),
        }
    }
}

/// User decision on a surfaced request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// Provenance of the page that issued a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl PageMeta {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.icon.is_none()
    }

    fn from_value(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value::<Self>(value)
            .ok()
            .filter(|meta| !meta.is_empty())
    }
}

/// An unapproved signature request with its page metadata detached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingMessage {
    pub id: String,
    pub kind: MessageKind,
    pub params: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_meta: Option<PageMeta>,
}

impl PendingMessage {
    /// Build from raw pipeline params, moving `meta` out of the payload.
    ///
    /// The id is read from `metamaskId` or `id`; a payload without either
    /// cannot be settled and is rejected.
    pub fn from_params(kind: MessageKind, params: serde_json::Value) -> Option<Self> {
        let serde_json::Value::Object(mut params) = params else {
            return None;
        };
        let page_meta = params.remove("meta").and_then(PageMeta::from_value);
        let id = ["metamaskId", "id"]
            .iter()
            .find_map(|key| params.get(*key))
            .and_then(|value| match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })?;
        Some(Self {
            id,
            kind,
            params,
            page_meta,
        })
    }
}

/// Network-add or network-switch request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainRequestKind {
    Add,
    Switch,
}

/// A pending chain request taken from the head of the approval registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingChainRequest {
    pub id: String,
    pub kind: ChainRequestKind,
    pub request_data: serde_json::Value,
    /// Switch subtype discriminator carried in `requestData.type`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_type: Option<String>,
}

/// Display metadata of a peer proposing a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icons: Vec<String>,
}

/// Inbound peer-to-peer session proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPeerSession {
    pub peer_id: String,
    #[serde(default)]
    pub peer_meta: Option<PeerMeta>,
}

impl PendingPeerSession {
    pub fn page_meta(&self) -> PageMeta {
        let meta = self.peer_meta.as_ref();
        PageMeta {
            title: meta.and_then(|m| m.name.clone()),
            url: meta.and_then(|m| m.url.clone()),
            icon: meta.and_then(|m| m.icons.first().cloned()),
        }
    }
}

/// Request types reported by the approval registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalType {
    SwitchEthereumChain,
    AddEthereumChain,
    Other(String),
}

impl From<&str> for ApprovalType {
    fn from(value: &str) -> Self {
        match value {
            "SWITCH_ETHEREUM_CHAIN" => Self::SwitchEthereumChain,
            "ADD_ETHEREUM_CHAIN" => Self::AddEthereumChain,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One entry of the approval registry queue. The registry keys entries by id;
/// the entry may repeat it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub approval_type: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub request_data: serde_json::Value,
}

impl PendingApproval {
    pub fn kind(&self) -> ApprovalType {
        ApprovalType::from(self.approval_type.as_str())
    }

    /// Fresh page metadata carried in `requestData.pageMeta`, if any.
    pub fn page_meta(&self) -> Option<PageMeta> {
        self.request_data
            .get("pageMeta")
            .cloned()
            .and_then(PageMeta::from_value)
    }

    /// Convert into a chain request when the type is one this core handles.
    /// `id` is the registry key of the entry.
    pub fn into_chain_request(self, id: impl Into<String>) -> Option<PendingChainRequest> {
        let kind = match self.kind() {
            ApprovalType::SwitchEthereumChain => ChainRequestKind::Switch,
            ApprovalType::AddEthereumChain => ChainRequestKind::Add,
            ApprovalType::Other(_) => return None,
        };
        let switch_type = match kind {
            ChainRequestKind::Switch => self
                .request_data
                .get("type")
                .and_then(|value| value.as_str())
                .map(str::to_string),
            ChainRequestKind::Add => None,
        };
        Some(PendingChainRequest {
            id: id.into(),
            kind,
            request_data: self.request_data,
            switch_type,
        })
    }
}

/// Approval registry state-change payload. `pending_approvals` is keyed by
/// request id and keeps the registry's insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStateSnapshot {
    pub pending_approval_count: usize,
    #[serde(default)]
    pub pending_approvals: IndexMap<String, PendingApproval>,
}

impl ApprovalStateSnapshot {
    /// Snapshot holding `entries` in order, with a matching count.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, PendingApproval)>) -> Self {
        let pending_approvals: IndexMap<_, _> = entries.into_iter().collect();
        Self {
            pending_approval_count: pending_approvals.len(),
            pending_approvals,
        }
    }

    /// Id and entry at the head of the registry queue; this core never looks
    /// past it.
    pub fn head(&self) -> Option<(&str, &PendingApproval)> {
        if self.pending_approval_count == 0 {
            return None;
        }
        self.pending_approvals
            .first()
            .map(|(id, approval)| (id.as_str(), approval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_meta_is_detached_from_params() {
        let message = PendingMessage::from_params(
            MessageKind::Personal,
            serde_json::json!({
                "metamaskId": "msg-1",
                "data": "0x68656c6c6f",
                "meta": { "title": "Uniswap", "url": "https://app.uniswap.org" }
            }),
        )
        .expect("message with id");

        assert_eq!(message.id, "msg-1");
        assert!(!message.params.contains_key("meta"));
        assert_eq!(
            message.page_meta.and_then(|m| m.url).as_deref(),
            Some("https://app.uniswap.org")
        );
    }

    #[test]
    fn message_without_id_is_refused() {
        let message =
            PendingMessage::from_params(MessageKind::Eth, serde_json::json!({ "data": "0x00" }));
        assert!(message.is_none());
    }

    #[test]
    fn unknown_approval_types_are_not_chain_requests() {
        let approval = PendingApproval {
            id: None,
            approval_type: "WALLET_REQUEST_PERMISSIONS".to_string(),
            origin: None,
            request_data: serde_json::json!({}),
        };
        assert_eq!(
            approval.kind(),
            ApprovalType::Other("WALLET_REQUEST_PERMISSIONS".to_string())
        );
        assert!(approval.into_chain_request("req-1").is_none());
    }

    #[test]
    fn switch_request_carries_subtype() {
        let approval = PendingApproval {
            id: Some("req-2".to_string()),
            approval_type: "SWITCH_ETHEREUM_CHAIN".to_string(),
            origin: Some("https://app.example".to_string()),
            request_data: serde_json::json!({ "chainId": "0x89", "type": "switch" }),
        };
        let request = approval.into_chain_request("req-2").expect("chain request");
        assert_eq!(request.id, "req-2");
        assert_eq!(request.kind, ChainRequestKind::Switch);
        assert_eq!(request.switch_type.as_deref(), Some("switch"));
    }

    #[test]
    fn empty_snapshot_has_no_head() {
        let mut snapshot = ApprovalStateSnapshot::from_entries([(
            "stale".to_string(),
            PendingApproval {
                id: None,
                approval_type: "ADD_ETHEREUM_CHAIN".to_string(),
                origin: None,
                request_data: serde_json::Value::Null,
            },
        )]);
        snapshot.pending_approval_count = 0;
        assert!(snapshot.head().is_none());
    }

    #[test]
    fn registry_payload_is_keyed_by_id_in_insertion_order() {
        let snapshot: ApprovalStateSnapshot = serde_json::from_value(serde_json::json!({
            "pendingApprovalCount": 2,
            "pendingApprovals": {
                "zzz": {
                    "id": "zzz",
                    "type": "SWITCH_ETHEREUM_CHAIN",
                    "requestData": { "chainId": "0x89" }
                },
                "aaa": {
                    "type": "ADD_ETHEREUM_CHAIN",
                    "requestData": { "chainId": "0xa" }
                }
            }
        }))
        .expect("map-shaped registry payload");

        let (id, head) = snapshot.head().expect("head entry");
        assert_eq!(id, "zzz");
        assert_eq!(head.kind(), ApprovalType::SwitchEthereumChain);
        assert_eq!(head.request_data["chainId"], "0x89");

        let request = head.clone().into_chain_request(id).expect("chain request");
        assert_eq!(request.id, "zzz");
        assert_eq!(snapshot.pending_approvals[1].id, None);
    }
}

//! Error types for the approval mediator.

use serde::Serialize;
use uuid::Uuid;

use crate::request::Category;

/// Top-level error type for the mediator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Swap tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Arbiter error: {0}")]
    Arbiter(#[from] ArbiterError),

    #[error("Mediator event loop is no longer running")]
    MediatorClosed,
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Token call data decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Unrecognized token method selector {selector}")]
    UnrecognizedSelector { selector: String },

    #[error("Malformed {method} call data: {reason}")]
    Malformed {
        method: &'static str,
        reason: String,
    },
}

/// Chain gateway query errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Token metadata lookup failed for {address}: {reason}")]
    MetadataLookupFailed { address: String, reason: String },

    #[error("Chain query {method} failed: {reason}")]
    QueryFailed { method: &'static str, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Chain gateway unavailable")]
    Unavailable,
}

/// Swap outcome tracking errors. Never surfaced to the user.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("No swap tracking record for transaction {id}")]
    MissingRecord { id: String },

    #[error("Swap transaction {id} has no transaction hash")]
    MissingHash { id: String },

    #[error("No selected account to measure balances for")]
    NoSelectedAddress,

    #[error("Chain query failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Metric calculation failed: {reason}")]
    Arithmetic { reason: String },
}

/// Signing path failures. Surfaced to the user as a blocking notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("Transaction {id} could not be signed: {reason}")]
    Failed { id: String, reason: String },

    #[error("Signer rejected transaction {id}: {reason}")]
    Rejected { id: String, reason: String },
}

/// Arbitration failures for user decisions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArbiterError {
    #[error("Decision ticket {got} does not match surfaced {category} request {expected}")]
    TicketMismatch {
        category: Category,
        expected: Uuid,
        got: Uuid,
    },
}

/// Typed rejection handed back to the approval registry (EIP-1193 style).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct RejectionError {
    pub code: i64,
    pub message: String,
}

impl RejectionError {
    /// Code used by providers when the user declines a request.
    pub const USER_REJECTED_REQUEST: i64 = 4001;

    pub fn user_rejected_request() -> Self {
        Self {
            code: Self::USER_REJECTED_REQUEST,
            message: "User rejected the request.".to_string(),
        }
    }
}

/// Failure domains for status/incident consumers.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDomain {
    Config,
    Decode,
    Chain,
    Tracking,
    Signing,
    Arbitration,
    Runtime,
}

/// Structured error payload for logs and status surfaces.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub domain: ErrorDomain,
    pub code: &'static str,
    pub user_visible: bool,
    pub message: String,
}

impl ErrorPayload {
    fn new(
        domain: ErrorDomain,
        code: &'static str,
        user_visible: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            code,
            user_visible,
            message: message.into(),
        }
    }
}

impl Error {
    /// Map errors into a stable structure. Only signing failures are user-visible;
    /// decode, chain and tracking failures are recovered where they occur.
    pub fn to_error_payload(&self) -> ErrorPayload {
        match self {
            Self::Config(err) => ErrorPayload::new(
                ErrorDomain::Config,
                "config.invalid",
                false,
                err.to_string(),
            ),
            Self::Decode(err) => match err {
                DecodeError::UnrecognizedSelector { .. } => ErrorPayload::new(
                    ErrorDomain::Decode,
                    "decode.unrecognized_selector",
                    false,
                    err.to_string(),
                ),
                DecodeError::Malformed { .. } => ErrorPayload::new(
                    ErrorDomain::Decode,
                    "decode.malformed",
                    false,
                    err.to_string(),
                ),
            },
            Self::Gateway(err) => match err {
                GatewayError::MetadataLookupFailed { .. } => ErrorPayload::new(
                    ErrorDomain::Chain,
                    "chain.metadata_lookup_failed",
                    false,
                    err.to_string(),
                ),
                GatewayError::QueryFailed { .. } | GatewayError::Unavailable => {
                    ErrorPayload::new(
                        ErrorDomain::Chain,
                        "chain.query_failed",
                        false,
                        err.to_string(),
                    )
                }
                GatewayError::NotFound { .. } => ErrorPayload::new(
                    ErrorDomain::Chain,
                    "chain.not_found",
                    false,
                    err.to_string(),
                ),
            },
            Self::Tracking(err) => ErrorPayload::new(
                ErrorDomain::Tracking,
                "tracking.swap_tracking_failed",
                false,
                err.to_string(),
            ),
            Self::Signing(err) => ErrorPayload::new(
                ErrorDomain::Signing,
                "signing.failed",
                true,
                err.to_string(),
            ),
            Self::Arbiter(err) => ErrorPayload::new(
                ErrorDomain::Arbitration,
                "arbiter.ticket_mismatch",
                false,
                err.to_string(),
            ),
            Self::MediatorClosed => ErrorPayload::new(
                ErrorDomain::Runtime,
                "runtime.mediator_closed",
                false,
                self.to_string(),
            ),
        }
    }
}

/// Result type alias for the mediator.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_failures_are_user_visible() {
        let err = Error::from(SigningError::Failed {
            id: "tx-1".to_string(),
            reason: "nonce too low".to_string(),
        });
        let payload = err.to_error_payload();

        assert_eq!(payload.domain, ErrorDomain::Signing);
        assert_eq!(payload.code, "signing.failed");
        assert!(payload.user_visible);
    }

    #[test]
    fn metadata_failures_stay_internal() {
        let err = Error::from(GatewayError::MetadataLookupFailed {
            address: "0xdead".to_string(),
            reason: "execution reverted".to_string(),
        });
        let payload = err.to_error_payload();

        assert_eq!(payload.domain, ErrorDomain::Chain);
        assert_eq!(payload.code, "chain.metadata_lookup_failed");
        assert!(!payload.user_visible);
    }

    #[test]
    fn tracking_failures_map_to_tracking_domain() {
        let err = Error::from(TrackingError::from(GatewayError::Unavailable));
        let payload = err.to_error_payload();

        assert_eq!(payload.domain, ErrorDomain::Tracking);
        assert!(payload.message.contains("unavailable"));
    }

    #[test]
    fn user_rejection_uses_provider_code() {
        let rejection = RejectionError::user_rejected_request();
        let value = serde_json::to_value(&rejection).expect("valid json");

        assert_eq!(value["code"], 4001);
        assert_eq!(rejection.to_string(), "User rejected the request. (code 4001)");
    }
}

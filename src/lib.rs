//! Approval mediation for dapp-originated wallet requests.
//!
//! Unapproved transactions, signature requests, chain approvals and peer
//! session requests arrive through a [`mediator::MediatorHandle`]. Each
//! transaction is classified (suppressed, auto-signed, or surfaced), and the
//! [`arbiter::ApprovalArbiter`] keeps at most one item surfaced per category
//! until the user decides. Auto-signed swaps are followed to completion and
//! measured by the [`swaps::SwapOutcomeTracker`].

pub mod analytics;
pub mod arbiter;
pub mod autosign;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mediator;
pub mod pipeline;
pub mod request;
pub mod settings;
pub mod swaps;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod token;
pub mod transaction;

pub use config::MediatorConfig;
pub use error::{Error, Result};
pub use mediator::{Collaborators, Mediator, MediatorHandle};

// Relay routing over a pool of untrusted ledger endpoints

pub mod defaults;
pub mod node;
pub mod router;
pub mod selector;

pub use defaults::{default_relay_nodes, default_relay_nodes_with, MAINNET_BETA_ENDPOINT};
pub use node::ProxyNode;
pub use router::{RelayRouter, RelayRouterConfig, DEFAULT_MAX_RETRIES};
pub use selector::{NodeSelector, RoundRobinSelector, WeightedSelector};

use crate::ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("No relay nodes available")]
    NoRelayNodesAvailable,
    #[error("Relay submission failed after {attempts} attempts: {last_error}")]
    SubmissionFailed { attempts: u32, last_error: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// Ledger client collaborator: what the core needs from a ledger node

use super::types::{Address, Anchor, Commitment};
use super::LedgerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Options passed along with a raw submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Skip the node's simulation step
    pub skip_preflight: bool,
    /// Commitment used for the simulation step
    pub preflight_commitment: Commitment,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: Commitment::Confirmed,
        }
    }
}

/// Paging for signature history lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureQuery {
    pub limit: usize,
    /// Start searching backwards from this signature
    pub before: Option<String>,
}

impl Default for SignatureQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            before: None,
        }
    }
}

/// One entry of an address's signature history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
}

/// A handle to one ledger node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// URL of the node this handle talks to
    fn endpoint(&self) -> String;

    /// Latest anchor a new transaction can be bound to
    async fn latest_anchor(&self) -> Result<Anchor, LedgerError>;

    /// Submit serialized signed bytes, returning the transaction signature
    async fn submit_raw(&self, payload: &[u8], options: SendOptions) -> Result<String, LedgerError>;

    /// Wait until `signature` reaches `commitment`
    async fn confirm(&self, signature: &str, commitment: Commitment) -> Result<(), LedgerError>;

    /// Balance in base units
    async fn get_balance(&self, address: &Address) -> Result<u64, LedgerError>;

    async fn get_signatures_for_address(
        &self,
        address: &Address,
        query: SignatureQuery,
    ) -> Result<Vec<SignatureInfo>, LedgerError>;

    /// Full transaction details, or `None` if the node does not know it
    async fn get_transaction(&self, signature: &str) -> Result<Option<serde_json::Value>, LedgerError>;

    /// Cheap liveness call
    async fn get_slot(&self) -> Result<u64, LedgerError>;
}

/// Builds one client handle per node URL.
pub trait LedgerClientFactory: Send + Sync {
    fn connect(&self, url: &str, commitment: Commitment) -> Arc<dyn LedgerClient>;
}

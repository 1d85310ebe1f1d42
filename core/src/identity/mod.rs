// Signing identity (the wallet key that authorises outgoing transfers)
//
// The core never holds the user's main key directly; it asks a signing
// identity to connect and sign. `LocalSigner` covers a keypair file or an
// in-memory key; hardware and browser wallets plug in behind the same trait.

mod local;

pub use local::LocalSigner;

use crate::ledger::{Address, SignedTransaction, Transaction};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("Signing identity unavailable: {0}")]
    Unavailable(String),
    #[error("Signing identity not connected")]
    NotConnected,
    #[error("Signing rejected: {0}")]
    Rejected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SigningIdentity: Send + Sync {
    /// Whether the identity can be used at all (device present, key loaded)
    fn is_available(&self) -> bool;

    /// Connect and return the identity's public address
    async fn connect(&self) -> Result<Address, SigningError>;

    async fn disconnect(&self) -> Result<(), SigningError>;

    /// Sign as every required signer this identity controls
    async fn sign_transaction(&self, transaction: Transaction) -> Result<SignedTransaction, SigningError>;
}

// Hidden Wallet Core — transaction privacy layer for a public-ledger wallet
//
// Three services do the work: key protection for secrets at rest, a builder
// that reshapes outgoing transfers into obfuscated routes, and a router that
// delivers signed payloads through a pool of untrusted relay endpoints. The
// `HiddenWallet` facade wires them to a signing identity and a ledger client.

pub mod config;
pub mod crypto;
pub mod identity;
pub mod ledger;
pub mod level;
pub mod privacy;
pub mod relay;
pub mod wallet;

use thiserror::Error;

pub use config::{Network, WalletConfig};
pub use crypto::{CryptoError, KeyProtectionService};
pub use identity::{LocalSigner, SigningError, SigningIdentity};
pub use ledger::{
    Address, Anchor, Commitment, Keypair, LedgerClient, LedgerClientFactory, LedgerError,
    RpcClientFactory, RpcLedgerClient, SignedTransaction, Transaction, TransferStep,
};
pub use level::SecurityLevel;
pub use privacy::{
    obfuscate_address, BuildError, PrivacyTransactionBuilder, PrivateTransfer,
    PrivateTransferRequest, RoutePlan,
};
pub use relay::{ProxyNode, RelayError, RelayRouter, RelayRouterConfig};
pub use wallet::{
    HiddenAddress, HiddenWallet, HistoryQuery, TransactionOptions, TransactionRecord, TransferReceipt,
};

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HiddenWalletError {
    #[error("Invalid transfer request: {0}")]
    InvalidTransferRequest(String),
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("No relay nodes available")]
    NoRelayNodesAvailable,
    #[error("Relay submission failed after {attempts} attempts: {last_error}")]
    RelaySubmissionFailed { attempts: u32, last_error: String },
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("Signing unavailable: {0}")]
    SigningUnavailable(String),
    #[error("Ledger error: {0}")]
    Ledger(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, HiddenWalletError>;

impl From<CryptoError> for HiddenWalletError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::EncryptionFailed(msg) => HiddenWalletError::EncryptionFailed(msg),
            CryptoError::DecryptionFailed(msg) => HiddenWalletError::DecryptionFailed(msg),
            CryptoError::InvalidKey(msg) => HiddenWalletError::InvalidConfig(msg),
        }
    }
}

impl From<BuildError> for HiddenWalletError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::InvalidRequest(msg) => HiddenWalletError::InvalidTransferRequest(msg),
        }
    }
}

impl From<RelayError> for HiddenWalletError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::NoRelayNodesAvailable => HiddenWalletError::NoRelayNodesAvailable,
            RelayError::SubmissionFailed {
                attempts,
                last_error,
            } => HiddenWalletError::RelaySubmissionFailed {
                attempts,
                last_error,
            },
            RelayError::Ledger(err) => err.into(),
        }
    }
}

impl From<LedgerError> for HiddenWalletError {
    fn from(err: LedgerError) -> Self {
        HiddenWalletError::Ledger(err.to_string())
    }
}

impl From<SigningError> for HiddenWalletError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::NotConnected => HiddenWalletError::WalletNotConnected,
            SigningError::Unavailable(msg) | SigningError::Rejected(msg) => {
                HiddenWalletError::SigningUnavailable(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        assert_eq!(
            HiddenWalletError::from(BuildError::InvalidRequest("x".into())),
            HiddenWalletError::InvalidTransferRequest("x".into())
        );
        assert_eq!(
            HiddenWalletError::from(RelayError::SubmissionFailed {
                attempts: 3,
                last_error: "boom".into()
            }),
            HiddenWalletError::RelaySubmissionFailed {
                attempts: 3,
                last_error: "boom".into()
            }
        );
        assert_eq!(
            HiddenWalletError::from(RelayError::NoRelayNodesAvailable),
            HiddenWalletError::NoRelayNodesAvailable
        );
        assert!(matches!(
            HiddenWalletError::from(CryptoError::DecryptionFailed("bad".into())),
            HiddenWalletError::DecryptionFailed(_)
        ));
        assert_eq!(
            HiddenWalletError::from(SigningError::NotConnected),
            HiddenWalletError::WalletNotConnected
        );
        assert!(matches!(
            HiddenWalletError::from(LedgerError::Transport("down".into())),
            HiddenWalletError::Ledger(_)
        ));
    }
}

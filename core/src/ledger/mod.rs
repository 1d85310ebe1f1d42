// Ledger collaborator: data model, client trait, JSON-RPC client

pub mod client;
pub mod rpc;
pub mod types;

pub use client::{LedgerClient, LedgerClientFactory, SendOptions, SignatureInfo, SignatureQuery};
pub use rpc::{RpcClientFactory, RpcLedgerClient};
pub use types::{
    lamports_to_sol, sol_to_lamports, Address, Anchor, Commitment, Keypair, SignatureEntry,
    SignedTransaction, Transaction, TransferStep, LAMPORTS_PER_SOL,
};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Transaction {0} failed: {1}")]
    TransactionFailed(String, String),
    #[error("Confirmation timed out for {0}")]
    ConfirmationTimeout(String),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

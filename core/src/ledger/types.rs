// Ledger data model — addresses, keypairs, transfer steps, transactions
//
// The core never speaks the ledger's native wire format. A `Transaction` is
// an opaque signable unit: a fee payer, a recent anchor and an ordered list
// of transfer steps. `SignedTransaction::serialize` produces the bytes the
// ledger client submits.

use super::LedgerError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, Zeroizing};

/// Base units per whole ledger-native unit.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert a fractional amount to base units, rounding to the nearest unit.
pub fn sol_to_lamports(amount: f64) -> u64 {
    (amount * LAMPORTS_PER_SOL as f64).round() as u64
}

/// Convert base units back to a fractional amount.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

// ============================================================================
// ADDRESS
// ============================================================================

/// A 32-byte ed25519 public key, rendered as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 32]);

impl Address {
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidAddress("empty address".to_string()));
        }
        let bytes = bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| LedgerError::InvalidAddress(format!("{}: {}", trimmed, e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            LedgerError::InvalidAddress(format!(
                "{}: expected {} bytes, got {}",
                trimmed,
                Self::LEN,
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

// ============================================================================
// KEYPAIR
// ============================================================================

/// ed25519 keypair used for hidden addresses, intermediates and local signing.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new keypair from the OS random source
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rngs::OsRng)
    }

    /// Generate a new keypair from the supplied random source
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut secret_key_bytes = [0u8; 32];
        rng.fill_bytes(&mut secret_key_bytes);
        let signing_key = SigningKey::from_bytes(&secret_key_bytes);
        secret_key_bytes.zeroize();
        Self { signing_key }
    }

    /// Restore from either a 32-byte secret or the 64-byte `secret ‖ public` form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        match bytes.len() {
            32 => {
                let mut secret = [0u8; 32];
                secret.copy_from_slice(bytes);
                let signing_key = SigningKey::from_bytes(&secret);
                secret.zeroize();
                Ok(Self { signing_key })
            }
            64 => {
                let mut pair = [0u8; 64];
                pair.copy_from_slice(bytes);
                let result = SigningKey::from_keypair_bytes(&pair)
                    .map_err(|e| LedgerError::InvalidKeypair(e.to_string()));
                pair.zeroize();
                Ok(Self {
                    signing_key: result?,
                })
            }
            n => Err(LedgerError::InvalidKeypair(format!(
                "expected 32 or 64 bytes, got {}",
                n
            ))),
        }
    }

    /// `secret ‖ public`, wiped on drop.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn address(&self) -> Address {
        Address(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Sign a transaction on its own.
    pub fn sign_transaction(&self, transaction: Transaction) -> Result<SignedTransaction, LedgerError> {
        let mut signed = SignedTransaction::new(transaction);
        signed.sign_with(self)?;
        Ok(signed)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ANCHOR & COMMITMENT
// ============================================================================

/// Freshness token (a recent ledger state reference) a transaction is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor(String);

impl Anchor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How final a ledger state must be before it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl Default for Commitment {
    fn default() -> Self {
        Commitment::Confirmed
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(LedgerError::UnexpectedResponse(format!(
                "unknown commitment level: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// One value movement inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferStep {
    pub from: Address,
    pub to: Address,
    /// Fractional ledger-native amount
    pub amount: f64,
}

impl TransferStep {
    pub fn new(from: Address, to: Address, amount: f64) -> Self {
        Self { from, to, amount }
    }

    pub fn lamports(&self) -> u64 {
        sol_to_lamports(self.amount)
    }
}

/// An unsigned, signable transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    fee_payer: Address,
    recent_anchor: Anchor,
    steps: Vec<TransferStep>,
}

impl Transaction {
    pub fn new(fee_payer: Address, recent_anchor: Anchor) -> Self {
        Self {
            fee_payer,
            recent_anchor,
            steps: Vec::new(),
        }
    }

    pub fn add_transfer_step(&mut self, step: TransferStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn fee_payer(&self) -> Address {
        self.fee_payer
    }

    pub fn recent_anchor(&self) -> &Anchor {
        &self.recent_anchor
    }

    pub fn steps(&self) -> &[TransferStep] {
        &self.steps
    }

    pub fn total_amount(&self) -> f64 {
        self.steps.iter().map(|s| s.amount).sum()
    }

    /// Every address whose signature is required: fee payer first, then each
    /// distinct sender in step order.
    pub fn required_signers(&self) -> Vec<Address> {
        let mut signers = vec![self.fee_payer];
        for step in &self.steps {
            if !signers.contains(&step.from) {
                signers.push(step.from);
            }
        }
        signers
    }

    /// Canonical bytes covered by signatures.
    pub fn message_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

/// A signature attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub signer: Address,
    pub signature: Vec<u8>,
}

/// A transaction plus the signatures collected so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    transaction: Transaction,
    signatures: Vec<SignatureEntry>,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            signatures: Vec::new(),
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn signatures(&self) -> &[SignatureEntry] {
        &self.signatures
    }

    /// Add `keypair`'s signature. Fails if the keypair is not a required signer.
    pub fn sign_with(&mut self, keypair: &Keypair) -> Result<(), LedgerError> {
        let signer = keypair.address();
        if !self.transaction.required_signers().contains(&signer) {
            return Err(LedgerError::InvalidKeypair(format!(
                "{} is not a signer of this transaction",
                signer
            )));
        }
        let message = self.transaction.message_bytes()?;
        let signature = keypair.sign(&message).to_vec();
        self.signatures.retain(|entry| entry.signer != signer);
        self.signatures.push(SignatureEntry { signer, signature });
        Ok(())
    }

    pub fn is_fully_signed(&self) -> bool {
        self.transaction
            .required_signers()
            .iter()
            .all(|signer| self.signatures.iter().any(|entry| entry.signer == *signer))
    }

    /// Check every attached signature against the transaction bytes.
    pub fn verify(&self) -> Result<bool, LedgerError> {
        let message = self.transaction.message_bytes()?;
        for entry in &self.signatures {
            let key = VerifyingKey::from_bytes(entry.signer.as_bytes())
                .map_err(|e| LedgerError::InvalidKeypair(e.to_string()))?;
            let bytes: [u8; 64] = entry
                .signature
                .as_slice()
                .try_into()
                .map_err(|_| LedgerError::Serialization("invalid signature length".to_string()))?;
            if key.verify(&message, &Signature::from_bytes(&bytes)).is_err() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The fee payer's signature, base58; the ledger's transaction id.
    pub fn signature(&self) -> Option<String> {
        let fee_payer = self.transaction.fee_payer;
        self.signatures
            .iter()
            .find(|entry| entry.signer == fee_payer)
            .map(|entry| bs58::encode(&entry.signature).into_string())
    }

    pub fn serialize(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

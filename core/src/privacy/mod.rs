// Privacy transactions — tiered route obfuscation for outgoing payments
//
// Direct, single-hop and multi-hop transfer construction, the mixing pool,
// intermediate keys and inter-hop timing jitter.

pub mod builder;
pub mod pool;
pub mod strategy;
pub mod timing;

pub use builder::{MixingParticipant, PrivacyTransactionBuilder, HIGH_TIER_POOL_SEED};
pub use pool::{IntermediateKeyStore, MixingPool};
pub use strategy::{
    split_amount, strategy_for, DirectStrategy, HopContext, MultiHopStrategy, PrivateTransfer,
    RoutePlan, SingleHopStrategy, TransferStrategy, MAX_HOPS, MIN_HOPS,
};
pub use timing::{apply_jitter, compute_jitter, JitterConfig};

use crate::ledger::Address;
use crate::level::SecurityLevel;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("Invalid transfer request: {0}")]
    InvalidRequest(String),
}

/// A payment to be routed at a given tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrivateTransferRequest {
    pub from: Address,
    pub to: Address,
    /// Fractional ledger-native amount
    pub amount: f64,
    pub tier: SecurityLevel,
}

impl PrivateTransferRequest {
    pub fn new(from: Address, to: Address, amount: f64, tier: SecurityLevel) -> Self {
        Self {
            from,
            to,
            amount,
            tier,
        }
    }

    /// Build a request from a recipient string, validating the address
    pub fn parse(from: Address, to: &str, amount: f64, tier: SecurityLevel) -> Result<Self, BuildError> {
        let to = to
            .parse::<Address>()
            .map_err(|e| BuildError::InvalidRequest(e.to_string()))?;
        Ok(Self::new(from, to, amount, tier))
    }
}

/// Check a fractional amount is usable as a transfer value
pub fn validate_amount(amount: f64) -> Result<(), BuildError> {
    if !amount.is_finite() {
        return Err(BuildError::InvalidRequest(format!(
            "amount must be finite, got {}",
            amount
        )));
    }
    if amount <= 0.0 {
        return Err(BuildError::InvalidRequest(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Shortened form for display and logs: first four and last four characters
pub fn obfuscate_address(address: &Address) -> String {
    let text = address.to_string();
    if text.len() <= 8 {
        return text;
    }
    format!("{}...{}", &text[..4], &text[text.len() - 4..])
}

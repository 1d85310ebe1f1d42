// Transfer strategies — one per security tier, chosen once per builder

use super::pool::{IntermediateKeyStore, MixingPool};
use super::timing::{apply_jitter, JitterConfig};
use super::{obfuscate_address, BuildError, PrivateTransferRequest};
use crate::ledger::{Address, Anchor, Keypair, Transaction, TransferStep};
use crate::level::SecurityLevel;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Hop depth range for the multi-hop strategy, inclusive
pub const MIN_HOPS: usize = 2;
pub const MAX_HOPS: usize = 4;

/// Conceptual route behind a built transaction.
///
/// Only the first leg is returned as a transaction; the remaining legs are
/// described here so callers can build them later.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    /// Intermediates in hop order. Empty for direct transfers.
    pub intermediates: Vec<Address>,
    /// Amount carried by each leg. Sums to the requested amount.
    pub amounts: Vec<f64>,
    /// Delay applied before the transaction was emitted
    pub delay: Duration,
}

impl RoutePlan {
    pub fn hop_count(&self) -> usize {
        self.intermediates.len()
    }

    pub fn total_amount(&self) -> f64 {
        self.amounts.iter().sum()
    }
}

/// Result of `build_private_transfer`
#[derive(Debug, Clone)]
pub struct PrivateTransfer {
    pub transaction: Transaction,
    pub plan: RoutePlan,
}

/// Mutable builder state a strategy may use
pub struct HopContext<'a> {
    pub pool: &'a mut MixingPool,
    pub keys: &'a mut IntermediateKeyStore,
    pub rng: &'a mut StdRng,
}

#[async_trait]
pub trait TransferStrategy: Send + Sync {
    fn level(&self) -> SecurityLevel;

    async fn build(
        &self,
        request: &PrivateTransferRequest,
        anchor: &Anchor,
        ctx: HopContext<'_>,
    ) -> Result<PrivateTransfer, BuildError>;
}

pub fn strategy_for(level: SecurityLevel) -> Box<dyn TransferStrategy> {
    match level {
        SecurityLevel::Basic => Box::new(DirectStrategy),
        SecurityLevel::Standard => Box::new(SingleHopStrategy),
        SecurityLevel::High => Box::new(MultiHopStrategy),
    }
}

fn single_step(from: Address, to: Address, amount: f64, anchor: &Anchor) -> Transaction {
    let mut transaction = Transaction::new(from, anchor.clone());
    transaction.add_transfer_step(TransferStep::new(from, to, amount));
    transaction
}

/// Sender → recipient, no delay
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStrategy;

#[async_trait]
impl TransferStrategy for DirectStrategy {
    fn level(&self) -> SecurityLevel {
        SecurityLevel::Basic
    }

    async fn build(
        &self,
        request: &PrivateTransferRequest,
        anchor: &Anchor,
        _ctx: HopContext<'_>,
    ) -> Result<PrivateTransfer, BuildError> {
        Ok(PrivateTransfer {
            transaction: single_step(request.from, request.to, request.amount, anchor),
            plan: RoutePlan {
                intermediates: Vec::new(),
                amounts: vec![request.amount],
                delay: Duration::ZERO,
            },
        })
    }
}

/// Sender → fresh intermediate, full amount
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleHopStrategy;

#[async_trait]
impl TransferStrategy for SingleHopStrategy {
    fn level(&self) -> SecurityLevel {
        SecurityLevel::Standard
    }

    async fn build(
        &self,
        request: &PrivateTransferRequest,
        anchor: &Anchor,
        ctx: HopContext<'_>,
    ) -> Result<PrivateTransfer, BuildError> {
        let intermediate = ctx.keys.retain(Keypair::generate_with(&mut *ctx.rng));
        tracing::debug!(intermediate = %obfuscate_address(&intermediate), "generated intermediate");

        let delay = apply_jitter(&JitterConfig::SINGLE_HOP, &mut *ctx.rng).await;

        Ok(PrivateTransfer {
            transaction: single_step(request.from, intermediate, request.amount, anchor),
            plan: RoutePlan {
                intermediates: vec![intermediate],
                amounts: vec![request.amount],
                delay,
            },
        })
    }
}

/// Sender → first of 2..=4 distinct pool members, amount split across hops
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiHopStrategy;

/// `amount / hops` per leg; the first leg also carries the rounding remainder
pub fn split_amount(amount: f64, hops: usize) -> Vec<f64> {
    let hops = hops.max(1);
    let per_hop = amount / hops as f64;
    let remainder = amount - per_hop * hops as f64;
    let mut amounts = vec![per_hop; hops];
    amounts[0] += remainder;
    amounts
}

#[async_trait]
impl TransferStrategy for MultiHopStrategy {
    fn level(&self) -> SecurityLevel {
        SecurityLevel::High
    }

    async fn build(
        &self,
        request: &PrivateTransferRequest,
        anchor: &Anchor,
        ctx: HopContext<'_>,
    ) -> Result<PrivateTransfer, BuildError> {
        let hop_count = ctx.rng.gen_range(MIN_HOPS..=MAX_HOPS);

        let mut candidates = ctx.pool.candidates(&request.from, &request.to);
        while candidates.len() < hop_count {
            let member = ctx.keys.retain(Keypair::generate_with(&mut *ctx.rng));
            ctx.pool.insert(member);
            candidates.push(member);
        }
        let hops: Vec<Address> = candidates
            .choose_multiple(&mut *ctx.rng, hop_count)
            .copied()
            .collect();
        let amounts = split_amount(request.amount, hop_count);

        let delay = apply_jitter(&JitterConfig::MULTI_HOP, &mut *ctx.rng).await;
        tracing::debug!(hops = hop_count, "built multi-hop route");

        Ok(PrivateTransfer {
            transaction: single_step(request.from, hops[0], amounts[0], anchor),
            plan: RoutePlan {
                intermediates: hops,
                amounts,
                delay,
            },
        })
    }
}

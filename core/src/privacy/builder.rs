// Privacy transaction builder
//
// Owns the mixing pool, the intermediate key store and the random source.
// Never talks to the network: the caller supplies the recent anchor.
// Builds exactly one hop per call; chaining is the caller's decision.

use super::pool::{IntermediateKeyStore, MixingPool};
use super::strategy::{strategy_for, HopContext, PrivateTransfer, TransferStrategy};
use super::timing::{apply_jitter, JitterConfig};
use super::{obfuscate_address, validate_amount, BuildError, PrivateTransferRequest};
use crate::ledger::{Address, Anchor, Keypair, Transaction, TransferStep};
use crate::level::SecurityLevel;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Number of keyed members a high-tier builder starts with
pub const HIGH_TIER_POOL_SEED: usize = 10;

/// One leg of a batched mixing transaction
pub type MixingParticipant = TransferStep;

pub struct PrivacyTransactionBuilder {
    level: SecurityLevel,
    strategy: Box<dyn TransferStrategy>,
    pool: MixingPool,
    keys: IntermediateKeyStore,
    rng: StdRng,
}

impl PrivacyTransactionBuilder {
    pub fn new(level: SecurityLevel) -> Self {
        Self::with_rng(level, StdRng::from_entropy())
    }

    /// Construct with an explicit random source (seed it for reproducible routes)
    pub fn with_rng(level: SecurityLevel, mut rng: StdRng) -> Self {
        let mut pool = MixingPool::new();
        let mut keys = IntermediateKeyStore::new();

        if level == SecurityLevel::High {
            for _ in 0..HIGH_TIER_POOL_SEED {
                let member = keys.retain(Keypair::generate_with(&mut rng));
                pool.insert(member);
            }
            tracing::debug!(members = pool.len(), "seeded mixing pool");
        }

        Self {
            level,
            strategy: strategy_for(level),
            pool,
            keys,
            rng,
        }
    }

    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// Build the first leg of a private transfer for this builder's tier.
    ///
    /// Suspends for the tier's delay window before returning.
    pub async fn build_private_transfer(
        &mut self,
        request: &PrivateTransferRequest,
        anchor: &Anchor,
    ) -> Result<PrivateTransfer, BuildError> {
        if request.tier != self.level {
            return Err(BuildError::InvalidRequest(format!(
                "request tier {} does not match builder tier {}",
                request.tier, self.level
            )));
        }
        validate_amount(request.amount)?;

        let ctx = HopContext {
            pool: &mut self.pool,
            keys: &mut self.keys,
            rng: &mut self.rng,
        };
        let transfer = self.strategy.build(request, anchor, ctx).await?;

        tracing::debug!(
            tier = %self.level,
            to = %obfuscate_address(&request.to),
            hops = transfer.plan.hop_count(),
            "built private transfer"
        );
        Ok(transfer)
    }

    /// Build intermediate → recipient for a hop produced earlier.
    ///
    /// The intermediate pays the fee and must sign; its key is available
    /// through [`PrivacyTransactionBuilder::get_intermediate_keypair`] when
    /// this builder generated it.
    pub async fn build_completing_hop(
        &mut self,
        intermediate: &Address,
        to: &Address,
        amount: f64,
        anchor: &Anchor,
    ) -> Result<Transaction, BuildError> {
        validate_amount(amount)?;
        if intermediate == to {
            return Err(BuildError::InvalidRequest(
                "intermediate and recipient are the same address".to_string(),
            ));
        }

        apply_jitter(&JitterConfig::SINGLE_HOP, &mut self.rng).await;

        let mut transaction = Transaction::new(*intermediate, anchor.clone());
        transaction.add_transfer_step(TransferStep::new(*intermediate, *to, amount));
        Ok(transaction)
    }

    /// Batch every participant's transfer into one transaction, then delay.
    ///
    /// The first participant's sender pays the fee.
    pub async fn build_mixing_transaction(
        &mut self,
        participants: &[MixingParticipant],
        anchor: &Anchor,
    ) -> Result<Transaction, BuildError> {
        let first = participants.first().ok_or_else(|| {
            BuildError::InvalidRequest("mixing transaction needs at least one participant".to_string())
        })?;
        for participant in participants {
            validate_amount(participant.amount)?;
        }

        let mut transaction = Transaction::new(first.from, anchor.clone());
        for participant in participants {
            transaction.add_transfer_step(participant.clone());
        }

        let delay = apply_jitter(&JitterConfig::MIXING, &mut self.rng).await;
        tracing::debug!(
            participants = participants.len(),
            delay_ms = delay.as_millis() as u64,
            "built mixing transaction"
        );
        Ok(transaction)
    }

    /// Add an external member. Returns `false` if it was already present.
    pub fn add_to_mixing_pool(&mut self, address: Address) -> bool {
        self.pool.insert(address)
    }

    /// Remove a member; returns the number of entries dropped.
    ///
    /// A retained intermediate key stays in the key store.
    pub fn remove_from_mixing_pool(&mut self, address: &Address) -> usize {
        self.pool.remove(address)
    }

    /// Key for an intermediate this builder generated, if any
    pub fn get_intermediate_keypair(&self, address: &Address) -> Option<&Keypair> {
        self.keys.get(address)
    }

    /// Copy of the current pool members
    pub fn mixing_pool(&self) -> Vec<Address> {
        self.pool.members().to_vec()
    }

    pub fn obfuscate_address(&self, address: &Address) -> String {
        obfuscate_address(address)
    }
}

impl std::fmt::Debug for PrivacyTransactionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivacyTransactionBuilder")
            .field("level", &self.level)
            .field("pool", &self.pool.len())
            .field("keys", &self.keys.len())
            .finish()
    }
}

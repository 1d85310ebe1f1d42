// HiddenWallet — composition root
//
// Wires a signing identity, the key-protection service, the transaction
// builder and the relay router into wallet-level operations. Holds no
// persistent state: hidden addresses are returned to the caller for storage.

use crate::config::WalletConfig;
use crate::crypto::KeyProtectionService;
use crate::identity::SigningIdentity;
use crate::ledger::{
    lamports_to_sol, Address, Keypair, LedgerClient, LedgerClientFactory, LedgerError, SendOptions,
    SignatureInfo, SignatureQuery, SignedTransaction, Transaction, TransferStep,
};
use crate::level::SecurityLevel;
use crate::privacy::{
    obfuscate_address, validate_amount, PrivacyTransactionBuilder, PrivateTransferRequest, RoutePlan,
};
use crate::relay::{RelayRouter, RelayRouterConfig};
use crate::{HiddenWalletError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

/// A locally generated address whose private key is kept only in encrypted form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenAddress {
    pub public_key: String,
    pub encrypted_private_key: String,
    /// Unix seconds
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOptions {
    pub to: String,
    pub amount: f64,
    /// Route through the privacy builder (ignored at the basic tier)
    pub hide_origin: bool,
}

impl TransactionOptions {
    pub fn new(to: impl Into<String>, amount: f64) -> Self {
        Self {
            to: to.into(),
            amount,
            hide_origin: true,
        }
    }

    pub fn direct(mut self) -> Self {
        self.hide_origin = false;
        self
    }
}

/// First leg of a sent payment plus the route still to be delivered
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// Signature of the submitted first leg
    pub signature: String,
    pub to: Address,
    /// Intermediates are empty when the payment went straight to `to`
    pub plan: RoutePlan,
}

impl TransferReceipt {
    /// Whether `to` already holds the full amount
    pub fn is_delivered(&self) -> bool {
        self.plan.intermediates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: usize,
    pub before: Option<String>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            before: None,
        }
    }
}

/// One confirmed transaction touching the wallet's address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub failed: bool,
    /// Ledger-specific transaction details as returned by the node
    pub details: serde_json::Value,
}

pub struct HiddenWallet {
    config: WalletConfig,
    identity: Box<dyn SigningIdentity>,
    key_service: KeyProtectionService,
    builder: PrivacyTransactionBuilder,
    router: RelayRouter,
    connection: Arc<dyn LedgerClient>,
    public_key: Option<Address>,
}

impl HiddenWallet {
    pub fn new(
        config: WalletConfig,
        identity: Box<dyn SigningIdentity>,
        factory: Arc<dyn LedgerClientFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let level = config.security_level;

        let key_service = match &config.master_key {
            Some(master_key) => KeyProtectionService::with_master_key(level, master_key.as_str())?,
            None => KeyProtectionService::new(level),
        };
        let connection = factory.connect(&config.rpc_endpoint(), config.commitment);
        let router = RelayRouter::new(
            config.relay_nodes(),
            factory,
            RelayRouterConfig {
                commitment: config.commitment,
                ..RelayRouterConfig::default()
            },
        );

        tracing::debug!(tier = %level, network = %config.network, "hidden wallet created");
        Ok(Self {
            builder: PrivacyTransactionBuilder::new(level),
            config,
            identity,
            key_service,
            router,
            connection,
            public_key: None,
        })
    }

    /// Replace the transaction builder; it must match the wallet's tier
    pub fn with_builder(mut self, builder: PrivacyTransactionBuilder) -> Result<Self> {
        if builder.level() != self.config.security_level {
            return Err(HiddenWalletError::InvalidConfig(format!(
                "builder tier {} does not match wallet tier {}",
                builder.level(),
                self.config.security_level
            )));
        }
        self.builder = builder;
        Ok(self)
    }

    pub fn with_router(mut self, router: RelayRouter) -> Self {
        self.router = router;
        self
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.config.security_level
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn builder_mut(&mut self) -> &mut PrivacyTransactionBuilder {
        &mut self.builder
    }

    pub fn router_mut(&mut self) -> &mut RelayRouter {
        &mut self.router
    }

    // ========================================================================
    // CONNECTION
    // ========================================================================

    pub async fn connect(&mut self) -> Result<Address> {
        if !self.identity.is_available() {
            return Err(HiddenWalletError::SigningUnavailable(
                "no signing identity available".to_string(),
            ));
        }
        let address = self.identity.connect().await?;
        self.public_key = Some(address);
        tracing::info!(address = %obfuscate_address(&address), "wallet connected");
        Ok(address)
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.identity.disconnect().await?;
        self.public_key = None;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.public_key.is_some()
    }

    pub fn get_public_key(&self) -> Option<Address> {
        self.public_key
    }

    fn require_connected(&self) -> Result<Address> {
        self.public_key.ok_or(HiddenWalletError::WalletNotConnected)
    }

    // ========================================================================
    // HIDDEN ADDRESSES
    // ========================================================================

    /// Generate a fresh address and encrypt its 64-byte key.
    ///
    /// `passphrase` defaults to the key-protection master key.
    pub fn create_hidden_address(&self, passphrase: Option<&str>) -> Result<HiddenAddress> {
        let keypair = Keypair::generate();
        let hidden = self.seal_keypair(&keypair, passphrase)?;
        tracing::info!(address = %obfuscate_address(&keypair.address()), "hidden address created");
        Ok(hidden)
    }

    /// Seal the key the builder retained for a route intermediate.
    ///
    /// Storing the result keeps funds parked on the intermediate spendable
    /// through [`HiddenWallet::send_from_hidden_address`] after a restart.
    pub fn seal_intermediate_key(&self, intermediate: &Address, passphrase: Option<&str>) -> Result<HiddenAddress> {
        let keypair = self.intermediate_keypair(intermediate)?;
        self.seal_keypair(keypair, passphrase)
    }

    fn seal_keypair(&self, keypair: &Keypair, passphrase: Option<&str>) -> Result<HiddenAddress> {
        let secret = keypair.to_bytes();
        let encoded = Zeroizing::new(STANDARD.encode(secret.as_slice()));
        let encrypted_private_key = self.key_service.encrypt(&encoded, passphrase)?;
        Ok(HiddenAddress {
            public_key: keypair.address().to_string(),
            encrypted_private_key,
            created_at: current_timestamp(),
        })
    }

    /// Decrypt a hidden address back into its keypair
    pub fn unlock_hidden_address(&self, hidden: &HiddenAddress, passphrase: Option<&str>) -> Result<Keypair> {
        let encoded = Zeroizing::new(self.key_service.decrypt(&hidden.encrypted_private_key, passphrase)?);
        let secret = Zeroizing::new(
            STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| HiddenWalletError::DecryptionFailed(format!("invalid key encoding: {}", e)))?,
        );
        let keypair = Keypair::from_bytes(&secret)
            .map_err(|e| HiddenWalletError::DecryptionFailed(e.to_string()))?;

        if keypair.address().to_string() != hidden.public_key {
            return Err(HiddenWalletError::DecryptionFailed(
                "decrypted key does not match the hidden address".to_string(),
            ));
        }
        Ok(keypair)
    }

    // ========================================================================
    // TRANSFERS
    // ========================================================================

    /// Build, sign and submit a transfer from the connected address.
    ///
    /// Above the basic tier, `hide_origin` routes the payment through the
    /// privacy builder and only the first leg is sent; the receipt's plan
    /// describes the rest (see [`HiddenWallet::complete_route`]). The high
    /// tier submits through the relay router; other tiers submit to the
    /// configured endpoint directly.
    pub async fn send_transaction(&mut self, options: &TransactionOptions) -> Result<TransferReceipt> {
        let from = self.require_connected()?;
        if !self.identity.is_available() {
            return Err(HiddenWalletError::SigningUnavailable(
                "signing identity went away".to_string(),
            ));
        }
        let level = self.config.security_level;
        let to = parse_recipient(&options.to)?;
        validate_amount(options.amount)?;

        let anchor = self.connection.latest_anchor().await?;

        let (transaction, plan) = if options.hide_origin && level != SecurityLevel::Basic {
            let request = PrivateTransferRequest::new(from, to, options.amount, level);
            let transfer = self.builder.build_private_transfer(&request, &anchor).await?;
            (transfer.transaction, transfer.plan)
        } else {
            let mut transaction = Transaction::new(from, anchor);
            transaction.add_transfer_step(TransferStep::new(from, to, options.amount));
            let plan = RoutePlan {
                intermediates: Vec::new(),
                amounts: vec![options.amount],
                delay: Duration::ZERO,
            };
            (transaction, plan)
        };

        let signed = self.identity.sign_transaction(transaction).await?;
        let signature = self.submit(&signed).await?;

        tracing::info!(signature = %signature, tier = %level, hops = plan.hop_count(), "transaction sent");
        Ok(TransferReceipt { signature, to, plan })
    }

    /// Deliver the legs of a route that `send_transaction` left open.
    ///
    /// The connected identity funds every intermediate after the first, then
    /// each intermediate forwards its share to the recipient under the key
    /// the builder retained for it. Returns the signatures in submission
    /// order; empty for a delivered receipt.
    pub async fn complete_route(&mut self, receipt: &TransferReceipt) -> Result<Vec<String>> {
        let from = self.require_connected()?;
        let plan = &receipt.plan;
        if plan.intermediates.len() != plan.amounts.len() && !receipt.is_delivered() {
            return Err(HiddenWalletError::InvalidTransferRequest(format!(
                "route has {} intermediates but {} amounts",
                plan.intermediates.len(),
                plan.amounts.len()
            )));
        }
        // Every forwarding key must be at hand before more funds move
        for intermediate in &plan.intermediates {
            self.intermediate_keypair(intermediate)?;
        }

        let mut signatures = Vec::new();
        for (intermediate, amount) in plan.intermediates.iter().zip(&plan.amounts).skip(1) {
            let anchor = self.connection.latest_anchor().await?;
            let mut leg = Transaction::new(from, anchor);
            leg.add_transfer_step(TransferStep::new(from, *intermediate, *amount));
            let signed = self.identity.sign_transaction(leg).await?;
            signatures.push(self.submit(&signed).await?);
        }

        for (intermediate, amount) in plan.intermediates.iter().zip(&plan.amounts) {
            let anchor = self.connection.latest_anchor().await?;
            let hop = self
                .builder
                .build_completing_hop(intermediate, &receipt.to, *amount, &anchor)
                .await?;
            let signed = self.intermediate_keypair(intermediate)?.sign_transaction(hop)?;
            signatures.push(self.submit(&signed).await?);
        }

        tracing::info!(
            to = %obfuscate_address(&receipt.to),
            legs = signatures.len(),
            "route completed"
        );
        Ok(signatures)
    }

    /// Spend from a hidden address with its own key.
    ///
    /// The hidden address pays the fee; no connected identity is needed.
    pub async fn send_from_hidden_address(
        &mut self,
        hidden: &HiddenAddress,
        passphrase: Option<&str>,
        to: &str,
        amount: f64,
    ) -> Result<String> {
        let to = parse_recipient(to)?;
        validate_amount(amount)?;
        let keypair = self.unlock_hidden_address(hidden, passphrase)?;
        let from = keypair.address();

        let anchor = self.connection.latest_anchor().await?;
        let mut transaction = Transaction::new(from, anchor);
        transaction.add_transfer_step(TransferStep::new(from, to, amount));
        let signed = keypair.sign_transaction(transaction)?;

        let signature = self.submit(&signed).await?;
        tracing::info!(from = %obfuscate_address(&from), signature = %signature, "hidden address spent");
        Ok(signature)
    }

    fn intermediate_keypair(&self, intermediate: &Address) -> Result<&Keypair> {
        self.builder.get_intermediate_keypair(intermediate).ok_or_else(|| {
            HiddenWalletError::InvalidTransferRequest(format!(
                "no retained key for intermediate {}",
                obfuscate_address(intermediate)
            ))
        })
    }

    /// High tier through the relay router, others to the configured endpoint
    async fn submit(&mut self, signed: &SignedTransaction) -> Result<String> {
        if self.config.security_level.uses_relay() {
            return Ok(self.router.submit(signed, self.config.max_retries).await?);
        }
        let payload = signed.serialize()?;
        let signature = self.connection.submit_raw(&payload, SendOptions::default()).await?;
        self.connection.confirm(&signature, self.config.commitment).await?;
        Ok(signature)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// High tier reads go through a relay node; others use the configured endpoint
    fn read_connection(&mut self) -> Result<Arc<dyn LedgerClient>> {
        if self.config.security_level.uses_relay() {
            Ok(self.router.connection()?)
        } else {
            Ok(self.connection.clone())
        }
    }

    /// Balance of the connected address in whole units
    pub async fn get_balance(&mut self) -> Result<f64> {
        let address = self.require_connected()?;
        let connection = self.read_connection()?;
        let lamports = connection.get_balance(&address).await?;
        Ok(lamports_to_sol(lamports))
    }

    /// Balance of any address, e.g. a stored hidden address
    pub async fn get_address_balance(&mut self, address: &Address) -> Result<f64> {
        let connection = self.read_connection()?;
        let lamports = connection.get_balance(address).await?;
        Ok(lamports_to_sol(lamports))
    }

    /// Recent transactions of the connected address, newest first.
    ///
    /// Signatures the node no longer has details for are skipped.
    pub async fn get_transaction_history(&mut self, query: &HistoryQuery) -> Result<Vec<TransactionRecord>> {
        let address = self.require_connected()?;
        let connection = self.read_connection()?;

        let signatures: Vec<SignatureInfo> = connection
            .get_signatures_for_address(
                &address,
                SignatureQuery {
                    limit: query.limit,
                    before: query.before.clone(),
                },
            )
            .await?;

        let details = join_all(
            signatures
                .iter()
                .map(|info| connection.get_transaction(&info.signature)),
        )
        .await;

        let mut records = Vec::with_capacity(signatures.len());
        for (info, detail) in signatures.into_iter().zip(details) {
            if let Some(details) = detail? {
                records.push(TransactionRecord {
                    signature: info.signature,
                    slot: info.slot,
                    block_time: info.block_time,
                    failed: info.err.is_some(),
                    details,
                });
            }
        }
        Ok(records)
    }
}

impl std::fmt::Debug for HiddenWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiddenWallet")
            .field("level", &self.config.security_level)
            .field("network", &self.config.network)
            .field("connected", &self.public_key.is_some())
            .finish_non_exhaustive()
    }
}

fn parse_recipient(to: &str) -> Result<Address> {
    to.parse()
        .map_err(|e: LedgerError| HiddenWalletError::InvalidTransferRequest(e.to_string()))
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MockSigningIdentity, SigningError};
    use crate::ledger::{Anchor, Commitment, LedgerError, SignedTransaction};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const RPC: &str = "https://rpc.test";
    const RELAY: &str = "https://relay.test";

    #[derive(Default)]
    struct Ledger {
        submitted: Mutex<Vec<(String, Vec<u8>)>>,
        balance: u64,
        history: Vec<SignatureInfo>,
        details: HashMap<String, serde_json::Value>,
    }

    struct Node {
        url: String,
        ledger: Arc<Ledger>,
    }

    #[async_trait]
    impl LedgerClient for Node {
        fn endpoint(&self) -> String {
            self.url.clone()
        }

        async fn latest_anchor(&self) -> std::result::Result<Anchor, LedgerError> {
            Ok(Anchor::new("GHtXQBsoZHVnNFa9YevAzFr17DJjgHXk3ycTKD5xD3Zi"))
        }

        async fn submit_raw(&self, payload: &[u8], _options: SendOptions) -> std::result::Result<String, LedgerError> {
            let mut submitted = self.ledger.submitted.lock().unwrap();
            submitted.push((self.url.clone(), payload.to_vec()));
            Ok(format!("sig{}", submitted.len()))
        }

        async fn confirm(&self, _signature: &str, _commitment: Commitment) -> std::result::Result<(), LedgerError> {
            Ok(())
        }

        async fn get_balance(&self, _address: &Address) -> std::result::Result<u64, LedgerError> {
            Ok(self.ledger.balance)
        }

        async fn get_signatures_for_address(
            &self,
            _address: &Address,
            query: SignatureQuery,
        ) -> std::result::Result<Vec<SignatureInfo>, LedgerError> {
            Ok(self.ledger.history.iter().take(query.limit).cloned().collect())
        }

        async fn get_transaction(&self, signature: &str) -> std::result::Result<Option<serde_json::Value>, LedgerError> {
            Ok(self.ledger.details.get(signature).cloned())
        }

        async fn get_slot(&self) -> std::result::Result<u64, LedgerError> {
            Ok(42)
        }
    }

    struct Factory(Arc<Ledger>);

    impl LedgerClientFactory for Factory {
        fn connect(&self, url: &str, _commitment: Commitment) -> Arc<dyn LedgerClient> {
            Arc::new(Node {
                url: url.to_string(),
                ledger: self.0.clone(),
            })
        }
    }

    fn signer_for(keypair: Keypair) -> MockSigningIdentity {
        let address = keypair.address();
        let mut identity = MockSigningIdentity::new();
        identity.expect_is_available().return_const(true);
        identity.expect_connect().returning(move || Ok(address));
        identity.expect_disconnect().returning(|| Ok(()));
        identity
            .expect_sign_transaction()
            .returning(move |tx| keypair.sign_transaction(tx).map_err(|e| SigningError::Rejected(e.to_string())));
        identity
    }

    fn wallet(level: SecurityLevel, ledger: Arc<Ledger>, identity: MockSigningIdentity) -> HiddenWallet {
        let config = WalletConfig {
            security_level: level,
            rpc_url: Some(RPC.to_string()),
            relay_nodes: vec![RELAY.to_string()],
            master_key: Some("test master key".to_string()),
            ..WalletConfig::default()
        };
        HiddenWallet::new(config, Box::new(identity), Arc::new(Factory(ledger))).unwrap()
    }

    fn submitted(ledger: &Ledger) -> Vec<(String, SignedTransaction)> {
        ledger
            .submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(url, bytes)| (url.clone(), SignedTransaction::deserialize(bytes).unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let keypair = Keypair::generate();
        let address = keypair.address();
        let mut wallet = wallet(SecurityLevel::Basic, Arc::default(), signer_for(keypair));

        assert!(!wallet.is_connected());
        assert_eq!(wallet.connect().await.unwrap(), address);
        assert_eq!(wallet.get_public_key(), Some(address));

        wallet.disconnect().await.unwrap();
        assert!(!wallet.is_connected());
        assert_eq!(wallet.get_public_key(), None);
    }

    #[tokio::test]
    async fn test_connect_without_identity() {
        let mut identity = MockSigningIdentity::new();
        identity.expect_is_available().return_const(false);
        let mut wallet = wallet(SecurityLevel::Basic, Arc::default(), identity);
        assert!(matches!(
            wallet.connect().await,
            Err(HiddenWalletError::SigningUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut wallet = wallet(SecurityLevel::Basic, Arc::default(), signer_for(Keypair::generate()));
        let recipient = Keypair::generate().address().to_string();
        assert_eq!(
            wallet.send_transaction(&TransactionOptions::new(recipient, 1.0)).await,
            Err(HiddenWalletError::WalletNotConnected)
        );
    }

    #[tokio::test]
    async fn test_send_rejects_bad_input() {
        let mut wallet = wallet(SecurityLevel::Basic, Arc::default(), signer_for(Keypair::generate()));
        wallet.connect().await.unwrap();

        assert!(matches!(
            wallet.send_transaction(&TransactionOptions::new("nope", 1.0)).await,
            Err(HiddenWalletError::InvalidTransferRequest(_))
        ));
        let recipient = Keypair::generate().address().to_string();
        assert!(matches!(
            wallet.send_transaction(&TransactionOptions::new(recipient, -1.0)).await,
            Err(HiddenWalletError::InvalidTransferRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_basic_sends_directly_to_rpc() {
        let ledger = Arc::new(Ledger::default());
        let keypair = Keypair::generate();
        let from = keypair.address();
        let mut wallet = wallet(SecurityLevel::Basic, ledger.clone(), signer_for(keypair));
        wallet.connect().await.unwrap();

        let to = Keypair::generate().address();
        let receipt = wallet
            .send_transaction(&TransactionOptions::new(to.to_string(), 1.5))
            .await
            .unwrap();
        assert_eq!(receipt.signature, "sig1");
        assert!(receipt.is_delivered());
        assert_eq!(wallet.complete_route(&receipt).await.unwrap(), Vec::<String>::new());

        let sent = submitted(&ledger);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RPC);
        assert_eq!(sent[0].1.transaction().steps(), &[TransferStep::new(from, to, 1.5)]);
        assert!(sent[0].1.verify().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_standard_hides_origin_through_intermediate() {
        let ledger = Arc::new(Ledger::default());
        let keypair = Keypair::generate();
        let from = keypair.address();
        let mut wallet = wallet(SecurityLevel::Standard, ledger.clone(), signer_for(keypair));
        wallet.connect().await.unwrap();

        let to = Keypair::generate().address();
        wallet
            .send_transaction(&TransactionOptions::new(to.to_string(), 2.0))
            .await
            .unwrap();

        let sent = submitted(&ledger);
        assert_eq!(sent[0].0, RPC);
        let steps = sent[0].1.transaction().steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].from, from);
        assert_ne!(steps[0].to, to);
        assert_ne!(steps[0].to, from);
        assert!(wallet.builder_mut().get_intermediate_keypair(&steps[0].to).is_some());
    }

    #[tokio::test]
    async fn test_standard_direct_when_origin_not_hidden() {
        let ledger = Arc::new(Ledger::default());
        let keypair = Keypair::generate();
        let mut wallet = wallet(SecurityLevel::Standard, ledger.clone(), signer_for(keypair));
        wallet.connect().await.unwrap();

        let to = Keypair::generate().address();
        wallet
            .send_transaction(&TransactionOptions::new(to.to_string(), 2.0).direct())
            .await
            .unwrap();
        assert_eq!(submitted(&ledger)[0].1.transaction().steps()[0].to, to);
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_submits_through_relay() {
        let ledger = Arc::new(Ledger::default());
        let keypair = Keypair::generate();
        let mut wallet = wallet(SecurityLevel::High, ledger.clone(), signer_for(keypair));
        wallet.connect().await.unwrap();

        let to = Keypair::generate().address();
        wallet
            .send_transaction(&TransactionOptions::new(to.to_string(), 3.0))
            .await
            .unwrap();

        let sent = submitted(&ledger);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RELAY);
        let step = &sent[0].1.transaction().steps()[0];
        assert!(wallet.builder_mut().mixing_pool().contains(&step.to));
        assert!(step.amount < 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_standard_route_completes_from_intermediate() {
        let ledger = Arc::new(Ledger::default());
        let keypair = Keypair::generate();
        let from = keypair.address();
        let mut wallet = wallet(SecurityLevel::Standard, ledger.clone(), signer_for(keypair));
        wallet.connect().await.unwrap();

        let to = Keypair::generate().address();
        let receipt = wallet
            .send_transaction(&TransactionOptions::new(to.to_string(), 2.0))
            .await
            .unwrap();
        assert!(!receipt.is_delivered());
        assert_eq!(receipt.to, to);
        assert_eq!(receipt.plan.amounts, vec![2.0]);
        let intermediate = receipt.plan.intermediates[0];

        let signatures = wallet.complete_route(&receipt).await.unwrap();
        assert_eq!(signatures, vec!["sig2".to_string()]);

        let sent = submitted(&ledger);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].1.transaction().steps(), &[TransferStep::new(intermediate, to, 2.0)]);
        assert_eq!(sent[1].1.transaction().fee_payer(), intermediate);
        assert!(sent[1].1.verify().unwrap());
        for (_, tx) in &sent {
            let step = &tx.transaction().steps()[0];
            assert!(!(step.from == from && step.to == to));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_route_needs_every_intermediate_key() {
        let ledger = Arc::new(Ledger::default());
        let mut wallet = wallet(SecurityLevel::High, ledger.clone(), signer_for(Keypair::generate()));
        wallet.connect().await.unwrap();

        let receipt = TransferReceipt {
            signature: "sig0".to_string(),
            to: Keypair::generate().address(),
            plan: RoutePlan {
                intermediates: vec![wallet.builder_mut().mixing_pool()[0], Keypair::generate().address()],
                amounts: vec![1.0, 1.0],
                delay: Duration::ZERO,
            },
        };
        assert!(matches!(
            wallet.complete_route(&receipt).await,
            Err(HiddenWalletError::InvalidTransferRequest(_))
        ));
        assert!(submitted(&ledger).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sealed_intermediate_key_unlocks() {
        let ledger = Arc::new(Ledger::default());
        let mut wallet = wallet(SecurityLevel::Standard, ledger.clone(), signer_for(Keypair::generate()));
        wallet.connect().await.unwrap();

        let to = Keypair::generate().address();
        let receipt = wallet
            .send_transaction(&TransactionOptions::new(to.to_string(), 1.0))
            .await
            .unwrap();
        let intermediate = receipt.plan.intermediates[0];

        let sealed = wallet.seal_intermediate_key(&intermediate, None).unwrap();
        assert_eq!(sealed.public_key, intermediate.to_string());
        let keypair = wallet.unlock_hidden_address(&sealed, None).unwrap();
        assert_eq!(keypair.address(), intermediate);

        assert!(matches!(
            wallet.seal_intermediate_key(&Keypair::generate().address(), None),
            Err(HiddenWalletError::InvalidTransferRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_send_from_hidden_address_signs_with_its_key() {
        let ledger = Arc::new(Ledger::default());
        let mut wallet = wallet(SecurityLevel::Standard, ledger.clone(), signer_for(Keypair::generate()));
        let hidden = wallet.create_hidden_address(Some("pw")).unwrap();
        let to = Keypair::generate().address();

        assert!(matches!(
            wallet.send_from_hidden_address(&hidden, None, &to.to_string(), 1.0).await,
            Err(HiddenWalletError::DecryptionFailed(_))
        ));
        let signature = wallet
            .send_from_hidden_address(&hidden, Some("pw"), &to.to_string(), 1.0)
            .await
            .unwrap();
        assert_eq!(signature, "sig1");

        let sent = submitted(&ledger);
        assert_eq!(sent[0].1.transaction().fee_payer().to_string(), hidden.public_key);
        assert!(sent[0].1.verify().unwrap());
    }

    #[test]
    fn test_hidden_address_roundtrip() {
        let wallet = wallet(SecurityLevel::High, Arc::default(), signer_for(Keypair::generate()));
        let hidden = wallet.create_hidden_address(None).unwrap();
        assert!(hidden.public_key.parse::<Address>().is_ok());
        assert!(hidden.created_at > 0);

        let keypair = wallet.unlock_hidden_address(&hidden, None).unwrap();
        assert_eq!(keypair.address().to_string(), hidden.public_key);

        let protected = wallet.create_hidden_address(Some("passphrase")).unwrap();
        assert!(matches!(
            wallet.unlock_hidden_address(&protected, None),
            Err(HiddenWalletError::DecryptionFailed(_))
        ));
        assert!(wallet.unlock_hidden_address(&protected, Some("passphrase")).is_ok());
    }

    #[test]
    fn test_unlock_rejects_mismatched_address() {
        let wallet = wallet(SecurityLevel::Standard, Arc::default(), signer_for(Keypair::generate()));
        let mut hidden = wallet.create_hidden_address(None).unwrap();
        hidden.public_key = Keypair::generate().address().to_string();
        assert!(matches!(
            wallet.unlock_hidden_address(&hidden, None),
            Err(HiddenWalletError::DecryptionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_balance_and_history() {
        let info = |signature: &str, slot: u64, err: Option<serde_json::Value>| SignatureInfo {
            signature: signature.to_string(),
            slot,
            block_time: Some(1_700_000_000),
            err,
        };
        let mut details = HashMap::new();
        details.insert("a".to_string(), json!({"slot": 3}));
        details.insert("c".to_string(), json!({"slot": 1}));
        let ledger = Arc::new(Ledger {
            balance: 2_500_000_000,
            history: vec![
                info("a", 3, None),
                info("b", 2, None),
                info("c", 1, Some(json!({"InstructionError": [0, "Custom"]}))),
            ],
            details,
            ..Ledger::default()
        });
        let mut wallet = wallet(SecurityLevel::Basic, ledger, signer_for(Keypair::generate()));

        assert_eq!(wallet.get_balance().await, Err(HiddenWalletError::WalletNotConnected));
        wallet.connect().await.unwrap();
        assert_eq!(wallet.get_balance().await.unwrap(), 2.5);

        let records = wallet.get_transaction_history(&HistoryQuery::default()).await.unwrap();
        let signatures: Vec<_> = records.iter().map(|r| r.signature.as_str()).collect();
        assert_eq!(signatures, ["a", "c"]);
        assert!(!records[0].failed);
        assert!(records[1].failed);

        let limited = wallet
            .get_transaction_history(&HistoryQuery {
                limit: 1,
                before: None,
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_builder_tier_must_match() {
        let wallet = wallet(SecurityLevel::Standard, Arc::default(), signer_for(Keypair::generate()));
        assert!(wallet
            .with_builder(PrivacyTransactionBuilder::new(SecurityLevel::High))
            .is_err());
    }
}

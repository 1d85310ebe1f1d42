//! In-memory ledger network shared by the integration tests.
//!
//! Every client handed out by `FakeFactory` talks to the same `FakeLedger`,
//! which records submissions per endpoint and can be told to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use hiddenwallet_core::ledger::{
    Address, Anchor, Commitment, LedgerClient, LedgerClientFactory, LedgerError, SendOptions,
    SignatureInfo, SignatureQuery, SignedTransaction,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const ANCHOR: &str = "9zyLN5CQwxWrEPit1sFy5DZ5xfRWP3Y1ZdmcAD2XT3Ag";

#[derive(Debug, Clone)]
pub struct Submission {
    pub endpoint: String,
    pub at: Instant,
    pub transaction: SignedTransaction,
}

#[derive(Default)]
pub struct FakeLedger {
    /// Endpoints whose liveness probe fails
    pub down: Mutex<HashSet<String>>,
    /// Endpoints that refuse every submission
    pub rejecting: Mutex<HashSet<String>>,
    /// Probe latency per endpoint
    pub latency: Mutex<HashMap<String, Duration>>,
    /// Submissions refused before any endpoint accepts
    pub failures_left: Mutex<u32>,
    pub submissions: Mutex<Vec<Submission>>,
    pub balances: Mutex<HashMap<Address, u64>>,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_down(&self, endpoint: &str) {
        self.down.lock().unwrap().insert(endpoint.to_string());
    }

    pub fn set_rejecting(&self, endpoint: &str) {
        self.rejecting.lock().unwrap().insert(endpoint.to_string());
    }

    pub fn set_latency(&self, endpoint: &str, latency: Duration) {
        self.latency.lock().unwrap().insert(endpoint.to_string(), latency);
    }

    pub fn fail_next(&self, count: u32) {
        *self.failures_left.lock().unwrap() = count;
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    /// Apply every confirmed transfer step to the balance sheet
    fn settle(&self, transaction: &SignedTransaction) {
        let mut balances = self.balances.lock().unwrap();
        for step in transaction.transaction().steps() {
            let lamports = step.lamports();
            let from = balances.entry(step.from).or_insert(0);
            *from = from.saturating_sub(lamports);
            *balances.entry(step.to).or_insert(0) += lamports;
        }
    }
}

pub struct FakeClient {
    endpoint: String,
    ledger: Arc<FakeLedger>,
}

#[async_trait]
impl LedgerClient for FakeClient {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn latest_anchor(&self) -> Result<Anchor, LedgerError> {
        Ok(Anchor::new(ANCHOR))
    }

    async fn submit_raw(&self, payload: &[u8], _options: SendOptions) -> Result<String, LedgerError> {
        let transaction = SignedTransaction::deserialize(payload)?;
        if !transaction.is_fully_signed() || !transaction.verify()? {
            return Err(LedgerError::TransactionFailed(
                "unsigned".to_string(),
                "signature verification failed".to_string(),
            ));
        }

        self.ledger.submissions.lock().unwrap().push(Submission {
            endpoint: self.endpoint.clone(),
            at: Instant::now(),
            transaction: transaction.clone(),
        });

        if self.ledger.rejecting.lock().unwrap().contains(&self.endpoint) {
            return Err(LedgerError::Transport(format!("{} refused the payload", self.endpoint)));
        }
        {
            let mut failures = self.ledger.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(LedgerError::Transport("temporarily unavailable".to_string()));
            }
        }

        self.ledger.settle(&transaction);
        transaction
            .signature()
            .ok_or_else(|| LedgerError::UnexpectedResponse("missing fee payer signature".to_string()))
    }

    async fn confirm(&self, _signature: &str, _commitment: Commitment) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, LedgerError> {
        Ok(self.ledger.balances.lock().unwrap().get(address).copied().unwrap_or(0))
    }

    async fn get_signatures_for_address(
        &self,
        address: &Address,
        query: SignatureQuery,
    ) -> Result<Vec<SignatureInfo>, LedgerError> {
        let submissions = self.ledger.submissions();
        let infos = submissions
            .iter()
            .rev()
            .filter(|s| s.transaction.transaction().required_signers().contains(address))
            .filter_map(|s| s.transaction.signature())
            .enumerate()
            .map(|(i, signature)| SignatureInfo {
                signature,
                slot: 100 - i as u64,
                block_time: None,
                err: None,
            })
            .take(query.limit)
            .collect();
        Ok(infos)
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<serde_json::Value>, LedgerError> {
        let found = self
            .ledger
            .submissions()
            .into_iter()
            .find(|s| s.transaction.signature().as_deref() == Some(signature));
        Ok(found.map(|s| {
            serde_json::json!({
                "endpoint": s.endpoint,
                "steps": s.transaction.transaction().steps().len(),
            })
        }))
    }

    async fn get_slot(&self) -> Result<u64, LedgerError> {
        let latency = self.ledger.latency.lock().unwrap().get(&self.endpoint).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.ledger.down.lock().unwrap().contains(&self.endpoint) {
            return Err(LedgerError::Transport(format!("{} unreachable", self.endpoint)));
        }
        Ok(100)
    }
}

pub struct FakeFactory(pub Arc<FakeLedger>);

impl LedgerClientFactory for FakeFactory {
    fn connect(&self, url: &str, _commitment: Commitment) -> Arc<dyn LedgerClient> {
        Arc::new(FakeClient {
            endpoint: url.to_string(),
            ledger: self.0.clone(),
        })
    }
}

// JSON-RPC ledger client
//
// Speaks JSON-RPC 2.0 over HTTP to a single node. Submitted payloads are
// base64 encoded; confirmation polls `getSignatureStatuses` until the
// requested commitment is reached, the transaction reports an error, or
// the confirmation timeout elapses.

use super::client::{LedgerClient, LedgerClientFactory, SendOptions, SignatureInfo, SignatureQuery};
use super::types::{Address, Anchor, Commitment};
use super::LedgerError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<Commitment>,
}

/// Ledger client for one JSON-RPC endpoint
pub struct RpcLedgerClient {
    url: String,
    commitment: Commitment,
    http: reqwest::Client,
    next_id: AtomicU64,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcLedgerClient {
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Self {
        Self::with_http(url, commitment, reqwest::Client::new())
    }

    /// Share a connection pool between clients
    pub fn with_http(url: impl Into<String>, commitment: Commitment, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            commitment,
            http,
            next_id: AtomicU64::new(1),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::trace!(method, endpoint = %self.url, "rpc call");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::UnexpectedResponse(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(body.result)
            .map_err(|e| LedgerError::UnexpectedResponse(format!("{}: {}", method, e)))
    }

    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, LedgerError> {
        let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(statuses.value.into_iter().next().flatten())
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn latest_anchor(&self) -> Result<Anchor, LedgerError> {
        let response: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        Ok(Anchor::new(response.value.blockhash))
    }

    async fn submit_raw(&self, payload: &[u8], options: SendOptions) -> Result<String, LedgerError> {
        self.call(
            "sendTransaction",
            json!([
                STANDARD.encode(payload),
                {
                    "encoding": "base64",
                    "skipPreflight": options.skip_preflight,
                    "preflightCommitment": options.preflight_commitment.as_str(),
                }
            ]),
        )
        .await
    }

    async fn confirm(&self, signature: &str, commitment: Commitment) -> Result<(), LedgerError> {
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;

        loop {
            if let Some(status) = self.signature_status(signature).await? {
                if let Some(err) = status.err.filter(|e| !e.is_null()) {
                    return Err(LedgerError::TransactionFailed(
                        signature.to_string(),
                        err.to_string(),
                    ));
                }
                if status
                    .confirmation_status
                    .map_or(false, |reached| reached >= commitment)
                {
                    return Ok(());
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(LedgerError::ConfirmationTimeout(signature.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, LedgerError> {
        let response: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment.as_str() }]),
            )
            .await?;
        Ok(response.value)
    }

    async fn get_signatures_for_address(
        &self,
        address: &Address,
        query: SignatureQuery,
    ) -> Result<Vec<SignatureInfo>, LedgerError> {
        let mut config = json!({ "limit": query.limit });
        if let Some(before) = query.before {
            config["before"] = Value::String(before);
        }
        self.call(
            "getSignaturesForAddress",
            json!([address.to_string(), config]),
        )
        .await
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<Value>, LedgerError> {
        self.call(
            "getTransaction",
            json!([
                signature,
                {
                    "encoding": "json",
                    "maxSupportedTransactionVersion": 0,
                    "commitment": self.commitment.as_str(),
                }
            ]),
        )
        .await
    }

    async fn get_slot(&self) -> Result<u64, LedgerError> {
        self.call("getSlot", json!([{ "commitment": self.commitment.as_str() }]))
            .await
    }
}

/// Factory producing [`RpcLedgerClient`]s that share one HTTP pool
#[derive(Clone, Default)]
pub struct RpcClientFactory {
    http: reqwest::Client,
}

impl RpcClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a per-request timeout to every client built by this factory
    pub fn with_timeout(timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self { http })
    }
}

impl LedgerClientFactory for RpcClientFactory {
    fn connect(&self, url: &str, commitment: Commitment) -> Arc<dyn LedgerClient> {
        Arc::new(RpcLedgerClient::with_http(url, commitment, self.http.clone()))
    }
}

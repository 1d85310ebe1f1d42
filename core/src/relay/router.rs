// Relay router — endpoint selection, health probing and retried submission
//
// Nodes are untrusted and interchangeable: any of them may be slow, down or
// refuse a payload. The router keeps a latency-ordered view of the pool and
// spreads submission attempts across it.

use super::node::ProxyNode;
use super::selector::{NodeSelector, RoundRobinSelector, WeightedSelector};
use super::RelayError;
use crate::ledger::{Commitment, LedgerClient, LedgerClientFactory, SendOptions, SignedTransaction};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct RelayRouterConfig {
    /// Commitment each submission waits for
    pub commitment: Commitment,
    /// Backoff unit: attempt `n` failing waits `retry_base_delay × (n + 1)`
    pub retry_base_delay: Duration,
}

impl Default for RelayRouterConfig {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            retry_base_delay: Duration::from_millis(1000),
        }
    }
}

pub struct RelayRouter {
    nodes: Vec<ProxyNode>,
    config: RelayRouterConfig,
    factory: Arc<dyn LedgerClientFactory>,
    clients: HashMap<String, Arc<dyn LedgerClient>>,
    selectors: Vec<Box<dyn NodeSelector>>,
    rng: StdRng,
}

impl RelayRouter {
    pub fn new(
        nodes: Vec<ProxyNode>,
        factory: Arc<dyn LedgerClientFactory>,
        config: RelayRouterConfig,
    ) -> Self {
        Self {
            nodes,
            config,
            factory,
            clients: HashMap::new(),
            selectors: vec![
                Box::new(WeightedSelector),
                Box::new(RoundRobinSelector::default()),
            ],
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the random source (seed it for reproducible selection)
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &RelayRouterConfig {
        &self.config
    }

    // ========================================================================
    // NODE SET
    // ========================================================================

    /// Copy of the node list in its current order
    pub fn nodes(&self) -> Vec<ProxyNode> {
        self.nodes.clone()
    }

    pub fn add_node(&mut self, node: ProxyNode) {
        tracing::debug!(url = %node.url, weight = node.weight, "relay node added");
        self.nodes.push(node);
    }

    /// Remove every node whose URL matches exactly; returns how many were removed
    pub fn remove_node(&mut self, url: &str) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.url != url);
        self.clients.remove(url);
        before - self.nodes.len()
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    /// Pick a node: weighted random, round-robin when weights are unusable
    pub fn select(&mut self) -> Result<ProxyNode, RelayError> {
        for selector in self.selectors.iter_mut() {
            if let Some(index) = selector.select(&self.nodes, &mut self.rng) {
                tracing::debug!(policy = selector.name(), url = %self.nodes[index].url, "selected relay node");
                return Ok(self.nodes[index].clone());
            }
        }
        Err(RelayError::NoRelayNodesAvailable)
    }

    /// Uniformly random node
    pub fn random_node(&mut self) -> Option<ProxyNode> {
        if self.nodes.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.nodes.len());
        Some(self.nodes[index].clone())
    }

    /// Lowest known latency; earliest in order on ties, unknown latencies last
    pub fn best_node(&self) -> Option<ProxyNode> {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| a.cmp_latency(b).then(ia.cmp(ib)))
            .map(|(_, node)| node.clone())
    }

    /// Client for a node chosen by [`RelayRouter::select`]
    pub fn connection(&mut self) -> Result<Arc<dyn LedgerClient>, RelayError> {
        let node = self.select()?;
        Ok(self.client_for(&node.url))
    }

    fn client_for(&mut self, url: &str) -> Arc<dyn LedgerClient> {
        let factory = &self.factory;
        let commitment = self.config.commitment;
        self.clients
            .entry(url.to_string())
            .or_insert_with(|| factory.connect(url, commitment))
            .clone()
    }

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Probe one node by index and record the result.
    ///
    /// Returns the measured round trip, or `None` (latency cleared) if the
    /// probe failed or the index is out of range.
    pub async fn measure_latency(&mut self, index: usize) -> Option<u64> {
        let url = self.nodes.get(index)?.url.clone();
        let client = self.client_for(&url);
        let latency = probe(client).await;
        if let Some(node) = self.nodes.get_mut(index) {
            node.latency_ms = latency;
        }
        latency
    }

    /// Whether the node at `url` answers a liveness call
    pub async fn check_node_health(&mut self, url: &str) -> bool {
        let client = self.client_for(url);
        probe(client).await.is_some()
    }

    /// Probe every node concurrently; reachability per URL
    pub async fn check_all_nodes_health(&mut self) -> HashMap<String, bool> {
        let urls: Vec<String> = self.nodes.iter().map(|node| node.url.clone()).collect();
        let clients: Vec<_> = urls.iter().map(|url| self.client_for(url)).collect();
        let results = join_all(clients.into_iter().map(probe)).await;

        urls.into_iter()
            .zip(results)
            .map(|(url, latency)| (url, latency.is_some()))
            .collect()
    }

    /// Probe every node concurrently, then re-sort by ascending latency
    pub async fn refresh_health(&mut self) {
        let urls: Vec<String> = self.nodes.iter().map(|node| node.url.clone()).collect();
        let clients: Vec<_> = urls.iter().map(|url| self.client_for(url)).collect();
        let results = join_all(clients.into_iter().map(probe)).await;

        for (node, latency) in self.nodes.iter_mut().zip(results) {
            node.latency_ms = latency;
        }
        self.nodes.sort_by(ProxyNode::cmp_latency);

        let reachable = self.nodes.iter().filter(|node| node.latency_ms.is_some()).count();
        tracing::debug!(nodes = self.nodes.len(), reachable, "relay health refreshed");
    }

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    /// Submit a signed transaction and wait for confirmation.
    ///
    /// The first attempt refreshes health and uses the fastest node; later
    /// attempts pick a random node. A failed attempt `n` is followed by a
    /// wait of `retry_base_delay × (n + 1)`, except after the last one.
    /// `max_retries` below one is treated as one.
    pub async fn submit(
        &mut self,
        transaction: &SignedTransaction,
        max_retries: u32,
    ) -> Result<String, RelayError> {
        if self.nodes.is_empty() {
            return Err(RelayError::NoRelayNodesAvailable);
        }
        let attempts = max_retries.max(1);
        let payload = transaction.serialize()?;
        let options = SendOptions::default();
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let node = if attempt == 0 {
                self.refresh_health().await;
                self.best_node()
            } else {
                self.random_node()
            };
            let node = node.ok_or(RelayError::NoRelayNodesAvailable)?;
            let client = self.client_for(&node.url);

            let result = match client.submit_raw(&payload, options).await {
                Ok(signature) => client
                    .confirm(&signature, self.config.commitment)
                    .await
                    .map(|_| signature),
                Err(e) => Err(e),
            };

            match result {
                Ok(signature) => {
                    tracing::info!(signature = %signature, url = %node.url, attempt, "transaction confirmed");
                    return Ok(signature);
                }
                Err(e) => {
                    tracing::warn!(url = %node.url, attempt, error = %e, "relay submission attempt failed");
                    last_error = e.to_string();
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.config.retry_base_delay * (attempt + 1)).await;
            }
        }

        Err(RelayError::SubmissionFailed {
            attempts,
            last_error,
        })
    }
}

impl std::fmt::Debug for RelayRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayRouter")
            .field("nodes", &self.nodes)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Liveness call timed in milliseconds
async fn probe(client: Arc<dyn LedgerClient>) -> Option<u64> {
    let start = tokio::time::Instant::now();
    match client.get_slot().await {
        Ok(_) => Some(start.elapsed().as_millis() as u64),
        Err(e) => {
            tracing::warn!(url = %client.endpoint(), error = %e, "relay health probe failed");
            None
        }
    }
}

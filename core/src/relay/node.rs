// Relay node: one candidate ledger endpoint with its health signal

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyNode {
    pub url: String,
    /// Relative selection weight, ≥ 0
    pub weight: f64,
    /// Last measured round trip in milliseconds; `None` is unknown or unreachable
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

impl ProxyNode {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_weight(url, 1.0)
    }

    /// Negative or non-finite weights are stored as zero
    pub fn with_weight(url: impl Into<String>, weight: f64) -> Self {
        let weight = if weight.is_finite() && weight > 0.0 { weight } else { 0.0 };
        Self {
            url: url.into(),
            weight,
            latency_ms: None,
        }
    }

    /// Latency as a sort key: missing latency sorts last
    pub fn latency_key(&self) -> f64 {
        self.latency_ms.map(|ms| ms as f64).unwrap_or(f64::INFINITY)
    }

    pub fn cmp_latency(&self, other: &ProxyNode) -> Ordering {
        self.latency_key().total_cmp(&other.latency_key())
    }
}

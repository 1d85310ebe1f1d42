// Timing jitter — randomised suspension between hops
//
// Breaks the timing link between an incoming payment and the hop that
// forwards it. Every delay is a tokio sleep, so a paused test clock can
// observe it without waiting in real time.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inclusive window a delay is drawn from, uniformly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitterConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl JitterConfig {
    /// Standard tier: sender → intermediate, and the completing hop
    pub const SINGLE_HOP: JitterConfig = JitterConfig::new(100, 500);
    /// High tier: sender → first pool hop
    pub const MULTI_HOP: JitterConfig = JitterConfig::new(200, 1000);
    /// Batched mixing transactions
    pub const MIXING: JitterConfig = JitterConfig::new(500, 2000);

    pub const fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms,
            max_delay_ms,
        }
    }

    pub fn contains(&self, delay: Duration) -> bool {
        let millis = delay.as_millis();
        millis >= self.min_delay_ms as u128 && millis <= self.max_delay_ms as u128
    }
}

/// Draw a delay from `config`'s window.
///
/// A window given upside down is read with its bounds swapped.
pub fn compute_jitter<R: Rng + ?Sized>(config: &JitterConfig, rng: &mut R) -> Duration {
    let low = config.min_delay_ms.min(config.max_delay_ms);
    let high = config.min_delay_ms.max(config.max_delay_ms);
    Duration::from_millis(rng.gen_range(low..=high))
}

/// Draw a delay and suspend for it. Returns the delay applied.
pub async fn apply_jitter<R: Rng + ?Sized>(config: &JitterConfig, rng: &mut R) -> Duration {
    let delay = compute_jitter(config, rng);
    tracing::debug!(delay_ms = delay.as_millis() as u64, "applying hop delay");
    tokio::time::sleep(delay).await;
    delay
}

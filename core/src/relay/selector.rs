// Node selection policies
//
// The router tries its selectors in order and uses the first that yields a
// node: weighted random, then round-robin.

use super::node::ProxyNode;
use rand::rngs::StdRng;
use rand::Rng;

pub trait NodeSelector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Index of the chosen node, or `None` if this policy cannot choose
    fn select(&mut self, nodes: &[ProxyNode], rng: &mut StdRng) -> Option<usize>;
}

/// Probability proportional to weight
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSelector;

impl NodeSelector for WeightedSelector {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn select(&mut self, nodes: &[ProxyNode], rng: &mut StdRng) -> Option<usize> {
        if nodes.is_empty() {
            return None;
        }
        let total: f64 = nodes.iter().map(|node| node.weight.max(0.0)).sum();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }

        let mut remaining = rng.gen::<f64>() * total;
        for (index, node) in nodes.iter().enumerate() {
            remaining -= node.weight.max(0.0);
            if remaining <= 0.0 {
                return Some(index);
            }
        }
        Some(0)
    }
}

/// Cycles through nodes in order, ignoring weights
#[derive(Debug, Clone, Default)]
pub struct RoundRobinSelector {
    cursor: usize,
}

impl NodeSelector for RoundRobinSelector {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn select(&mut self, nodes: &[ProxyNode], _rng: &mut StdRng) -> Option<usize> {
        if nodes.is_empty() {
            return None;
        }
        let index = self.cursor % nodes.len();
        self.cursor = self.cursor.wrapping_add(1);
        Some(index)
    }
}

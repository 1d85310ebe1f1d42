// Default relay nodes
//
// Two slots, each overridable through the environment:
// - HIDDEN_WALLET_RELAY_NODE_1
// - HIDDEN_WALLET_RELAY_NODE_2
// An unset or blank variable falls back to the public mainnet-beta endpoint.

use super::node::ProxyNode;

pub const MAINNET_BETA_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

pub const RELAY_NODE_ENV_VARS: &[&str] = &["HIDDEN_WALLET_RELAY_NODE_1", "HIDDEN_WALLET_RELAY_NODE_2"];

/// Resolve the default nodes from the process environment
pub fn default_relay_nodes() -> Vec<ProxyNode> {
    default_relay_nodes_with(|name| std::env::var(name).ok())
}

/// Resolve the default nodes through `lookup`
pub fn default_relay_nodes_with<F>(lookup: F) -> Vec<ProxyNode>
where
    F: Fn(&str) -> Option<String>,
{
    RELAY_NODE_ENV_VARS
        .iter()
        .map(|name| {
            let url = lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| MAINNET_BETA_ENDPOINT.to_string());
            ProxyNode::new(url)
        })
        .collect()
}

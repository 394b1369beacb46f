//! The built-in network table and block-explorer URL resolution.

use std::collections::HashMap;

/// Static configuration for a supported ledger network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub name: &'static str,
    pub chain_id: u64,
    pub default_rpc_url: &'static str,
    pub intent_recorder_address: &'static str,
    pub did_registry_address: Option<&'static str>,
}

const NETWORKS: &[NetworkConfig] = &[
    NetworkConfig {
        name: "zksync-era-sepolia",
        chain_id: 300,
        default_rpc_url: "https://sepolia.era.zksync.dev",
        intent_recorder_address: "0x0000000000000000000000000000000000000001",
        did_registry_address: Some("0x0000000000000000000000000000000000000002"),
    },
    NetworkConfig {
        name: "mainnet",
        chain_id: 1,
        default_rpc_url: "https://eth.llamarpc.com",
        intent_recorder_address: "0x0000000000000000000000000000000000000003",
        did_registry_address: Some("0x0000000000000000000000000000000000000004"),
    },
    NetworkConfig {
        name: "sepolia",
        chain_id: 11155111,
        default_rpc_url: "https://rpc.sepolia.org",
        intent_recorder_address: "0x0000000000000000000000000000000000000005",
        did_registry_address: Some("0x0000000000000000000000000000000000000006"),
    },
];

/// Looks up a network by name, applying the `<NETWORK_NAME>_RPC_URL`
/// environment override to its RPC URL if one is set.
pub fn resolve_network(name: &str) -> Option<(NetworkConfig, String)> {
    let config = NETWORKS.iter().find(|n| n.name == name)?.clone();
    let env_key = format!("{}_RPC_URL", name.to_uppercase().replace('-', "_"));
    let rpc_url = std::env::var(&env_key).unwrap_or_else(|_| config.default_rpc_url.to_string());
    Some((config, rpc_url))
}

/// Resolves a block-explorer transaction URL, trying `network_name` first
/// and falling back to `chain_id`, then to a generic aggregator.
pub fn tx_url(network_name: &str, chain_id: u64, tx_hash: &str) -> String {
    let by_name: HashMap<&str, &str> = [
        ("zksync-era-sepolia", "sepolia.explorer.zksync.io"),
        ("sepolia", "sepolia.etherscan.io"),
    ]
    .into_iter()
    .collect();

    let by_chain_id: HashMap<u64, &str> = [
        (1, "etherscan.io"),
        (11155111, "sepolia.etherscan.io"),
        (300, "sepolia.explorer.zksync.io"),
    ]
    .into_iter()
    .collect();

    let host = by_name
        .get(network_name)
        .or_else(|| by_chain_id.get(&chain_id))
        .copied()
        .unwrap_or("blockscan.com");

    format!("https://{host}/tx/{tx_hash}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_url_prefers_network_name_table() {
        assert_eq!(
            tx_url("zksync-era-sepolia", 999, "0xabc"),
            "https://sepolia.explorer.zksync.io/tx/0xabc"
        );
    }

    #[test]
    fn tx_url_falls_back_to_chain_id() {
        assert_eq!(
            tx_url("some-unlisted-name", 1, "0xabc"),
            "https://etherscan.io/tx/0xabc"
        );
    }

    #[test]
    fn tx_url_falls_back_to_generic_aggregator() {
        assert_eq!(
            tx_url("unknown", 999999, "0xabc"),
            "https://blockscan.com/tx/0xabc"
        );
    }

    #[test]
    fn resolve_network_finds_known_network() {
        let (config, _) = resolve_network("sepolia").unwrap();
        assert_eq!(config.chain_id, 11155111);
    }

    #[test]
    fn resolve_network_returns_none_for_unknown() {
        assert!(resolve_network("does-not-exist").is_none());
    }
}

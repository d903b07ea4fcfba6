// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::str::FromStr;

/// EVM network reachable through the node provider.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name as used in configuration
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Provider endpoint; the API key is appended as the last path segment
    pub rpc_base_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

impl NetworkConfig {
    /// JSON-RPC endpoint for this network with the given provider key.
    pub fn rpc_url(&self, api_key: &str) -> String {
        format!("{}{}", self.rpc_base_url, api_key)
    }
}

/// Ethereum mainnet.
pub const ETH_MAINNET: NetworkConfig = NetworkConfig {
    name: "mainnet",
    chain_id: 1,
    rpc_base_url: "https://mainnet.infura.io/v3/",
    explorer_url: "https://etherscan.io",
};

/// Sepolia testnet.
pub const ETH_SEPOLIA: NetworkConfig = NetworkConfig {
    name: "sepolia",
    chain_id: 11_155_111,
    rpc_base_url: "https://sepolia.infura.io/v3/",
    explorer_url: "https://sepolia.etherscan.io",
};

/// Holesky testnet.
pub const ETH_HOLESKY: NetworkConfig = NetworkConfig {
    name: "holesky",
    chain_id: 17_000,
    rpc_base_url: "https://holesky.infura.io/v3/",
    explorer_url: "https://holesky.etherscan.io",
};

/// Polygon PoS mainnet.
pub const POLYGON_MAINNET: NetworkConfig = NetworkConfig {
    name: "polygon",
    chain_id: 137,
    rpc_base_url: "https://polygon-mainnet.infura.io/v3/",
    explorer_url: "https://polygonscan.com",
};

pub const KNOWN_NETWORKS: [NetworkConfig; 4] = [ETH_MAINNET, ETH_SEPOLIA, ETH_HOLESKY, POLYGON_MAINNET];

/// Look up a known network by name (case-insensitive).
pub fn find_network(name: &str) -> Option<NetworkConfig> {
    let name = name.trim().to_ascii_lowercase();
    KNOWN_NETWORKS.into_iter().find(|n| n.name == name)
}

/// 1 gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// Priority fee (tip) used for EIP-1559 transfers.
pub const EIP1559_PRIORITY_FEE: u128 = 2 * GWEI;

/// Max fee per gas used for EIP-1559 transfers.
pub const EIP1559_MAX_FEE: u128 = 100 * GWEI;

/// Decimals of the funded token contract.
pub const TOKEN_DECIMALS: u8 = 18;

/// How transaction fees are priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeeModel {
    /// Base fee plus priority fee (type 2 transactions)
    #[default]
    Eip1559,
    /// Single flat gas price read from the node
    Legacy,
}

impl FromStr for FeeModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eip1559" | "eip-1559" | "1559" => Ok(FeeModel::Eip1559),
            "legacy" => Ok(FeeModel::Legacy),
            other => Err(format!("expected `eip1559` or `legacy`, got `{other}`")),
        }
    }
}

/// Concrete fee parameters attached to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParams {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

impl FeeParams {
    /// The fixed EIP-1559 fee pair.
    pub const fn eip1559_default() -> Self {
        FeeParams::Eip1559 {
            max_fee_per_gas: EIP1559_MAX_FEE,
            max_priority_fee_per_gas: EIP1559_PRIORITY_FEE,
        }
    }
}

/// Result of a broadcast transfer.
///
/// The node accepted the signed payload; inclusion is not awaited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Network the transfer was sent on
    pub network: String,
    /// Explorer link, when the network is known
    pub explorer_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_network_is_case_insensitive() {
        let net = find_network(" Sepolia ").unwrap();
        assert_eq!(net.chain_id, 11_155_111);
        assert!(find_network("fuji").is_none());
    }

    #[test]
    fn rpc_url_appends_key() {
        assert_eq!(ETH_MAINNET.rpc_url("abc"), "https://mainnet.infura.io/v3/abc");
    }

    #[test]
    fn fee_model_parsing() {
        assert_eq!("EIP1559".parse::<FeeModel>().unwrap(), FeeModel::Eip1559);
        assert_eq!("legacy".parse::<FeeModel>().unwrap(), FeeModel::Legacy);
        assert!("cheap".parse::<FeeModel>().is_err());
        assert_eq!(FeeModel::default(), FeeModel::Eip1559);
    }

    #[test]
    fn eip1559_defaults_are_two_and_one_hundred_gwei() {
        assert_eq!(
            FeeParams::eip1559_default(),
            FeeParams::Eip1559 {
                max_fee_per_gas: 100_000_000_000,
                max_priority_fee_per_gas: 2_000_000_000,
            }
        );
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors raised while allocating tokens on-chain.

use alloy::transports::TransportError;

/// Errors that can occur while funding a wallet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FundingError {
    /// Funding settings are missing or malformed (key, network, contract).
    #[error("Funding configuration error: {0}")]
    Config(String),

    /// The destination address could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The node could not be reached or returned a transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Contract execution reverted (during estimation or submission).
    #[error("Execution reverted: {0}")]
    Reverted(String),

    /// The node refused the transaction (funds, nonce, pricing).
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The signed transaction was sent but no reply came back. It may or
    /// may not be in the mempool, so it must not be sent again.
    #[error("Broadcast outcome unknown: {0}")]
    BroadcastUnknown(String),
}

impl FundingError {
    /// Whether a later attempt could succeed without operator action.
    ///
    /// Only failures that happen before anything is broadcast qualify.
    pub fn is_transient(&self) -> bool {
        matches!(self, FundingError::Network(_))
    }

    /// Short machine-readable label for logs and stored failure reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            FundingError::Config(_) => "config",
            FundingError::InvalidAddress(_) => "invalid_address",
            FundingError::Network(_) => "network",
            FundingError::Reverted(_) => "reverted",
            FundingError::Rejected(_) => "rejected",
            FundingError::BroadcastUnknown(_) => "broadcast_unknown",
        }
    }
}

/// Map a JSON-RPC error response message to a funding error.
pub fn classify_node_message(context: &str, message: &str) -> FundingError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("revert") {
        FundingError::Reverted(format!("{context}: {message}"))
    } else {
        FundingError::Rejected(format!("{context}: {message}"))
    }
}

/// Map a provider error to a funding error.
///
/// Error responses from the node are split into reverts and rejections;
/// everything else is a network failure.
pub fn classify_transport_error(context: &str, err: &TransportError) -> FundingError {
    match err.as_error_resp() {
        Some(payload) => classify_node_message(context, &payload.message),
        None => FundingError::Network(format!("{context}: {err}")),
    }
}

/// Map a failure of `eth_sendRawTransaction` to a funding error.
///
/// A node error reply means the transaction was refused. Anything else
/// (dropped connection, timeout) leaves the outcome unknown.
pub fn classify_broadcast_error(tx_hash: &str, err: &TransportError) -> FundingError {
    match err.as_error_resp() {
        Some(payload) => classify_node_message("broadcast failed", &payload.message),
        None => FundingError::BroadcastUnknown(format!("{tx_hash}: {err}")),
    }
}

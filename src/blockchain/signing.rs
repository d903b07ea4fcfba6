// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Funding key validation and signer creation.
//!
//! The funding wallet key comes from configuration as a `0x`-prefixed hex
//! string. It is checked for shape before any network call is made.

use alloy::{network::EthereumWallet, signers::local::PrivateKeySigner};

use super::error::FundingError;

/// Length of a `0x`-prefixed 32-byte hex key.
pub const PRIVATE_KEY_LEN: usize = 66;

/// Check that a configured private key is present and well formed.
///
/// Returns the hex body (without the `0x` prefix).
pub fn validate_private_key(raw: Option<&str>) -> Result<&str, FundingError> {
    let key = raw
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| FundingError::Config("private key is not set".to_string()))?;

    let body = key
        .strip_prefix("0x")
        .ok_or_else(|| FundingError::Config("private key must start with 0x".to_string()))?;

    if key.len() != PRIVATE_KEY_LEN {
        return Err(FundingError::Config(format!(
            "private key must be {PRIVATE_KEY_LEN} characters including 0x, got {}",
            key.len()
        )));
    }

    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FundingError::Config(
            "private key must be hexadecimal".to_string(),
        ));
    }

    Ok(body)
}

/// Create a signer from a configured private key.
pub fn signer_from_config(raw: Option<&str>) -> Result<PrivateKeySigner, FundingError> {
    let body = validate_private_key(raw)?;

    let key_bytes = alloy::hex::decode(body)
        .map_err(|e| FundingError::Config(format!("invalid private key: {e}")))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| FundingError::Config(format!("invalid private key: {e}")))
}

/// Wrap a signer as the provider's active wallet.
pub fn wallet_from_signer(signer: PrivateKeySigner) -> EthereumWallet {
    EthereumWallet::from(signer)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for wallet funding.
//!
//! This module provides functionality for:
//! - Resolving the node provider endpoint for a configured network
//! - Validating the funding key and creating a local signer
//! - Encoding, estimating, signing and broadcasting ERC-20 transfers

pub mod erc20;
pub mod error;
pub mod funder;
pub mod signing;
pub mod types;

pub use error::FundingError;
pub use funder::{TokenAllocator, WalletFunder};
pub use types::*;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet Signup Server - accounts with on-chain token funding
//!
//! Email/password registration and login with JWT sessions. New accounts get
//! a token balance that can be mirrored to the user's wallet with an ERC-20
//! `transfer` from a funding wallet.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Accounts, password hashing and session tokens
//! - `blockchain` - ERC-20 transfers over JSON-RPC (alloy)
//! - `funding` - Background reconciler for pending on-chain funding
//! - `storage` - Credential store (redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod funding;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;

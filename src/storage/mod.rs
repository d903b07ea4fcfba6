// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Store
//!
//! User records live in a single embedded redb database under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   users.redb
//!     users        # user_id → StoredUser (JSON)
//!     email_index  # normalized email → user_id (unique)
//! ```

pub mod records;
pub mod user_db;

pub use records::{normalize_email, FundingStatus, StoredUser, INITIAL_TOKEN_BALANCE};
pub use user_db::{UserDatabase, UserDbError, UserDbResult};

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User records persisted in the credential store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Token balance credited to every new account.
pub const INITIAL_TOKEN_BALANCE: u64 = 1000;

/// Progress of mirroring a user's balance on-chain.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FundingStatus {
    /// No on-chain transfer was requested for this user
    #[default]
    NotRequested,
    /// Waiting for the funding reconciler
    Pending,
    /// Claimed by the reconciler; a transfer may be in flight. Never retried
    /// automatically.
    Submitting,
    /// Transfer accepted by the node
    Funded { tx_hash: String },
    /// Transfer failed permanently
    Failed { reason: String },
    /// Signed transfer was broadcast but the node never answered. Needs a
    /// manual check against the chain before any resend.
    Unconfirmed { reason: String },
}

/// User record.
///
/// `password_hash` never leaves the server; use
/// [`PublicUser`](crate::models::PublicUser) at the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Unique user identifier (UUID)
    pub id: String,
    /// Normalized email (unique)
    pub email: String,
    /// bcrypt hash of the password
    pub password_hash: String,
    pub full_name: String,
    /// EVM wallet address supplied at registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Balance in whole tokens
    pub token_balance: u64,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(default)]
    pub funding: FundingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl StoredUser {
    /// Build a fresh account with the initial balance.
    pub fn new(
        email: String,
        password_hash: String,
        full_name: String,
        wallet_address: Option<String>,
        funding: FundingStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            full_name,
            wallet_address,
            token_balance: INITIAL_TOKEN_BALANCE,
            is_active: true,
            is_verified: false,
            funding,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_initial_balance_and_flags() {
        let user = StoredUser::new(
            "a@x.com".into(),
            "hash".into(),
            "A".into(),
            None,
            FundingStatus::NotRequested,
        );
        assert_eq!(user.token_balance, 1000);
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert!(user.last_login_at.is_none());
        assert!(Uuid::parse_str(&user.id).is_ok());
    }

    #[test]
    fn funding_status_serializes_with_state_tag() {
        let json = serde_json::to_value(FundingStatus::Funded {
            tx_hash: "0xabc".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "funded");
        assert_eq!(json["tx_hash"], "0xabc");

        let pending = serde_json::to_value(FundingStatus::Pending).unwrap();
        assert_eq!(pending["state"], "pending");
    }

    #[test]
    fn in_flight_states_serialize() {
        let submitting = serde_json::to_value(FundingStatus::Submitting).unwrap();
        assert_eq!(submitting["state"], "submitting");

        let unconfirmed: FundingStatus =
            serde_json::from_str(r#"{"state":"unconfirmed","reason":"0xabc: timeout"}"#).unwrap();
        assert_eq!(
            unconfirmed,
            FundingStatus::Unconfirmed {
                reason: "0xabc: timeout".into()
            }
        );
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}

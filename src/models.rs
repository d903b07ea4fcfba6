// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. All types derive `ToSchema`
//! for OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Auth requests**: register, login, refresh
//! - **Users**: [`PublicUser`], the password-free projection of a stored user
//! - **Sessions**: the login payload wrapping a user and a token pair

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::TokenPair;
use crate::storage::{FundingStatus, StoredUser};

// =============================================================================
// Auth Requests
// =============================================================================

/// Request to create an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
    #[schema(example = "Alice Example")]
    pub full_name: String,
    /// EVM address to mirror the initial balance to.
    #[serde(default)]
    #[schema(example = "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12")]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// =============================================================================
// Users
// =============================================================================

/// User as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub token_balance: u64,
    pub is_active: bool,
    pub is_verified: bool,
    pub funding: FundingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<StoredUser> for PublicUser {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            wallet_address: user.wallet_address,
            token_balance: user.token_balance,
            is_active: user.is_active,
            is_verified: user.is_verified,
            funding: user.funding,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login_at: user.last_login_at,
        }
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginData {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Payload returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "success")]
    pub status: String,
    #[schema(example = "Login successful")]
    pub message: String,
    pub data: LoginData,
}

impl LoginResponse {
    pub fn success(message: &str, user: PublicUser, tokens: TokenPair) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: LoginData {
                user,
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_has_no_password_hash() {
        let stored = StoredUser::new(
            "a@x.com".into(),
            "$2b$10$secret-hash".into(),
            "A".into(),
            None,
            FundingStatus::NotRequested,
        );
        let json = serde_json::to_string(&PublicUser::from(stored)).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"token_balance\":1000"));
    }

    #[test]
    fn register_request_wallet_is_optional() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@x.com","password":"pw","full_name":"A"}"#,
        )
        .unwrap();
        assert!(req.wallet_address.is_none());
    }
}

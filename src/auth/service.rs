// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account operations: register, validate, login, refresh.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::Address;
use chrono::Utc;
use tokio::sync::Notify;

use super::password::{hash_password, verify_password};
use super::tokens::{AuthenticatedUser, TokenIssuer, TokenType};
use super::AuthError;
use crate::models::{LoginResponse, PublicUser, RegisterRequest};
use crate::storage::{normalize_email, FundingStatus, StoredUser, UserDatabase, UserDbError};

/// Account operations over the credential store.
pub struct AuthService {
    users: Arc<UserDatabase>,
    tokens: TokenIssuer,
    /// Present when new wallets are funded on-chain; wakes the reconciler.
    funding_trigger: Option<Arc<Notify>>,
}

impl AuthService {
    pub fn new(users: Arc<UserDatabase>, tokens: TokenIssuer) -> Self {
        Self {
            users,
            tokens,
            funding_trigger: None,
        }
    }

    /// Mark new users with a wallet as pending funding and notify `trigger`.
    pub fn with_funding_trigger(mut self, trigger: Arc<Notify>) -> Self {
        self.funding_trigger = Some(trigger);
        self
    }

    pub fn funding_enabled(&self) -> bool {
        self.funding_trigger.is_some()
    }

    /// Create an account with the initial token balance.
    pub async fn register(&self, request: RegisterRequest) -> Result<StoredUser, AuthError> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        if request.password.is_empty() {
            return Err(AuthError::InvalidInput("Password must not be empty".into()));
        }
        let full_name = request.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AuthError::InvalidInput("Full name must not be empty".into()));
        }
        let wallet_address = request
            .wallet_address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_wallet_address)
            .transpose()?;

        if self.users.email_exists(&email)? {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(&request.password).await?;

        let funding = match (&self.funding_trigger, &wallet_address) {
            (Some(_), Some(_)) => FundingStatus::Pending,
            _ => FundingStatus::NotRequested,
        };
        let user = StoredUser::new(email, password_hash, full_name, wallet_address, funding);

        match self.users.insert(&user) {
            Ok(()) => {}
            Err(UserDbError::AlreadyExists(_)) => return Err(AuthError::EmailAlreadyRegistered),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            user_id = %user.id,
            funding = ?user.funding,
            "User registered"
        );

        if user.funding == FundingStatus::Pending {
            if let Some(trigger) = &self.funding_trigger {
                trigger.notify_one();
            }
        }

        Ok(user)
    }

    /// Check credentials. `None` when the email is unknown or the password
    /// does not match.
    pub async fn validate_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<StoredUser>, AuthError> {
        let Some(user) = self.users.get_by_email(&normalize_email(email))? else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash).await {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Verify credentials, record the login and issue a token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let user = match self.validate_user(email, password).await? {
            Some(user) if user.is_active => user,
            Some(user) => {
                tracing::warn!(user_id = %user.id, "Login attempt on inactive account");
                return Err(AuthError::InvalidCredentials);
            }
            None => return Err(AuthError::InvalidCredentials),
        };

        let now = Utc::now();
        let user = self
            .users
            .update(&user.id, |u| u.last_login_at = Some(now))?;

        let tokens = self.tokens.issue_pair(&user.id, &user.email)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse::success(
            "Login successful",
            user.into(),
            tokens,
        ))
    }

    /// Exchange a refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginResponse, AuthError> {
        let claims = self.tokens.verify(refresh_token, TokenType::Refresh)?;
        let user = self.active_user(&claims.sub)?;
        let tokens = self.tokens.issue_pair(&user.id, &user.email)?;

        Ok(LoginResponse::success(
            "Token refreshed",
            user.into(),
            tokens,
        ))
    }

    /// Verify a bearer access token.
    pub fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.tokens
            .verify(access_token, TokenType::Access)
            .map(AuthenticatedUser::from)
    }

    /// Load the account behind an authenticated request.
    pub fn current_user(&self, auth: &AuthenticatedUser) -> Result<PublicUser, AuthError> {
        self.active_user(&auth.user_id).map(PublicUser::from)
    }

    fn active_user(&self, user_id: &str) -> Result<StoredUser, AuthError> {
        match self.users.get_by_id(user_id)? {
            Some(user) if user.is_active => Ok(user),
            Some(_) => Err(AuthError::InvalidCredentials),
            None => Err(AuthError::UnknownUser),
        }
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(AuthError::InvalidInput(format!("Invalid email address: {email}"))),
    }
}

/// Parse and checksum an EVM address.
fn parse_wallet_address(raw: &str) -> Result<String, AuthError> {
    Address::from_str(raw)
        .map(|addr| addr.to_checksum(None))
        .map_err(|_| AuthError::InvalidInput(format!("Invalid wallet address: {raw}")))
}

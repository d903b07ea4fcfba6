// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Email/password accounts with HS256 session tokens.
//!
//! ## Auth Flow
//!
//! 1. `POST /v1/auth/register` stores the user with a bcrypt hash (cost 10)
//! 2. `POST /v1/auth/login` checks the password and returns an access token
//!    (1 hour) and a refresh token (7 days)
//! 3. Clients send `Authorization: Bearer <access token>`
//! 4. `POST /v1/auth/refresh` trades a refresh token for a new pair
//!
//! ## Security
//!
//! - Login failures never reveal whether the email or the password was wrong
//! - Password hashes never leave the credential store
//! - Clock skew tolerance is 60 seconds

pub mod error;
pub mod extractor;
pub mod password;
pub mod service;
pub mod tokens;

pub use error::AuthError;
pub use extractor::Auth;
pub use service::AuthService;
pub use tokens::{AuthenticatedUser, SessionClaims, TokenIssuer, TokenPair, TokenType};

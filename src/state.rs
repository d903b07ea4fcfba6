// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthService;
use crate::storage::UserDatabase;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDatabase>,
}

impl AppState {
    pub fn new(users: Arc<UserDatabase>, auth: AuthService) -> Self {
        Self {
            auth: Arc::new(auth),
            users,
        }
    }
}

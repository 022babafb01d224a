// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{password::hash_password, AuthError, TokenCodec};
use crate::config::{AppConfig, BootstrapAdmin};
use crate::storage::{IdentityDatabase, NewUser, User};

/// Shared, immutable application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<IdentityDatabase>,
    pub codec: Arc<TokenCodec>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, db: IdentityDatabase) -> Self {
        Self {
            codec: Arc::new(TokenCodec::new(&config.auth)),
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}

/// Create the configured superuser when the user table is empty.
pub fn bootstrap_admin(db: &IdentityDatabase, admin: Option<&BootstrapAdmin>) -> Result<Option<User>, AuthError> {
    let Some(admin) = admin else {
        return Ok(None);
    };
    if db.user_count().map_err(AuthError::internal)? > 0 {
        return Ok(None);
    }

    let password_hash = hash_password(&admin.password)?;
    let user = db
        .create_user(
            NewUser {
                username: admin.username.clone(),
                password_hash,
                is_superuser: true,
            },
            &[],
        )
        .map_err(AuthError::internal)?;

    tracing::info!(target: "audit", user_id = user.id, username = %user.username, "Bootstrap superuser created");
    Ok(Some(user))
}

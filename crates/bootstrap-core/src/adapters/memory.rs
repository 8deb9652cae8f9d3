//! In-memory account registrar.
//!
//! Records just enough to prove a registration happened. Passwords are not retained.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::domain::entities::{AccountInfo, NewAccount};
use crate::domain::errors::AccountError;
use crate::ports::outbound::AccountRegistrar;

const DEVICE_ID_LEN: usize = 10;
const TOKEN_BYTES: usize = 32;

/// What the registrar remembers about a created account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    pub user_id: String,
    pub admin: bool,
    pub display_name: Option<String>,
    pub user_type: Option<String>,
    pub device_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct InMemoryAccountRegistrar {
    server_name: String,
    token_lifetime: Duration,
    accounts: DashMap<String, AccountRecord>,
}

impl InMemoryAccountRegistrar {
    pub fn new(server_name: impl Into<String>, token_lifetime: Duration) -> Self {
        Self {
            server_name: server_name.into(),
            token_lifetime,
            accounts: DashMap::new(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Fully qualified user ID for a localpart.
    pub fn user_id_for(&self, username: &str) -> String {
        format!("@{}:{}", username, self.server_name)
    }

    pub fn get(&self, user_id: &str) -> Option<AccountRecord> {
        self.accounts.get(user_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

fn random_device_id() -> String {
    let mut rng = rand::thread_rng();
    (0..DEVICE_ID_LEN)
        .map(|_| char::from(rng.gen_range(b'A'..=b'Z')))
        .collect()
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

#[async_trait::async_trait]
impl AccountRegistrar for InMemoryAccountRegistrar {
    async fn create_account(&self, account: NewAccount) -> Result<AccountInfo, AccountError> {
        let user_id = self.user_id_for(&account.username);

        let device_id = match self.accounts.entry(user_id.clone()) {
            Entry::Occupied(_) => return Err(AccountError::UserInUse(user_id)),
            Entry::Vacant(slot) => {
                let device_id = random_device_id();
                slot.insert(AccountRecord {
                    user_id: user_id.clone(),
                    admin: account.admin,
                    display_name: account.display_name,
                    user_type: account.user_type,
                    device_id: device_id.clone(),
                    created_at: Utc::now(),
                });
                device_id
            }
        };

        info!(user_id = %user_id, admin = account.admin, "Account created");

        Ok(AccountInfo {
            user_id,
            device_id,
            access_token: random_token(),
            refresh_token: Some(random_token()),
            expires_in: self.token_lifetime.as_secs(),
            home_server: Some(self.server_name.clone()),
        })
    }
}

//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the registration core needs from its host.

use std::time::Instant;

use crate::domain::entities::{AccountInfo, NewAccount};
use crate::domain::errors::AccountError;

/// Monotonic time source for nonce expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The external account-creation collaborator.
///
/// Only called after an attempt has been authorized.
#[async_trait::async_trait]
pub trait AccountRegistrar: Send + Sync {
    /// Create the account and return its credentials.
    ///
    /// # Errors
    /// * `AccountError::UserInUse` - the user ID already exists
    /// * `AccountError::Unavailable` - the backing store failed
    async fn create_account(&self, account: NewAccount) -> Result<AccountInfo, AccountError>;
}

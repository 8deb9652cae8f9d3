//! # Inbound Ports (Driving Ports / API)
//!
//! The API the HTTP gateway drives.

use crate::domain::entities::{AccountInfo, NonceToken, RegistrationAttempt};
use crate::domain::errors::{NonceCapacityExceeded, RegistrationError};
use crate::service::RegistrationSnapshot;

#[async_trait::async_trait]
pub trait AdminRegistrationApi: Send + Sync {
    /// Issue a fresh single-use nonce.
    ///
    /// # Errors
    /// * `NonceCapacityExceeded` - the nonce table is full of live entries
    fn issue_nonce(&self) -> Result<NonceToken, NonceCapacityExceeded>;

    /// Validate, verify and, when authorized, create the account.
    ///
    /// # Errors
    /// * `RegistrationError::Invalid` - malformed request; the nonce was not consumed
    /// * `RegistrationError::Denied` - unknown, expired or reused nonce, or a bad MAC
    /// * `RegistrationError::Account` - authorized but the account could not be created
    async fn register(&self, attempt: RegistrationAttempt)
        -> Result<AccountInfo, RegistrationError>;

    /// Current counters.
    fn snapshot(&self) -> RegistrationSnapshot;

    /// Purge expired nonces; returns how many were removed.
    fn sweep_expired(&self) -> usize;
}

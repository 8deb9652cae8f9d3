//! # Admin Registration Service
//!
//! Application service implementing [`AdminRegistrationApi`]: shape validation, then the
//! verifier, then the account registrar.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::entities::{AccountInfo, NewAccount, NonceToken, RegistrationAttempt};
use crate::domain::errors::{AccountError, NonceCapacityExceeded, RegistrationError};
use crate::domain::nonce::{NonceStats, NonceStore};
use crate::domain::secret::SharedSecret;
use crate::domain::validation::validate_attempt;
use crate::domain::verifier::RegistrationVerifier;
use crate::ports::inbound::AdminRegistrationApi;
use crate::ports::outbound::AccountRegistrar;

/// Outcome counters.
#[derive(Debug, Default)]
pub struct RegistrationMetrics {
    pub nonces_issued: AtomicU64,
    pub authorized: AtomicU64,
    pub denied: AtomicU64,
    pub invalid: AtomicU64,
    pub accounts_created: AtomicU64,
    pub account_failures: AtomicU64,
}

/// Point-in-time view of the registration counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationSnapshot {
    pub nonces_issued: u64,
    pub authorized: u64,
    pub denied: u64,
    pub invalid: u64,
    pub accounts_created: u64,
    pub account_failures: u64,
    pub nonces: NonceStats,
}

pub struct AdminRegistrationService<R: AccountRegistrar> {
    verifier: RegistrationVerifier,
    registrar: Arc<R>,
    metrics: RegistrationMetrics,
}

impl<R: AccountRegistrar> AdminRegistrationService<R> {
    pub fn new(nonces: Arc<NonceStore>, secret: SharedSecret, registrar: Arc<R>) -> Self {
        Self {
            verifier: RegistrationVerifier::new(nonces, secret),
            registrar,
            metrics: RegistrationMetrics::default(),
        }
    }

    pub fn registrar(&self) -> &Arc<R> {
        &self.registrar
    }

    pub fn nonces(&self) -> &Arc<NonceStore> {
        self.verifier.nonces()
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl<R: AccountRegistrar + 'static> AdminRegistrationApi for AdminRegistrationService<R> {
    fn issue_nonce(&self) -> Result<NonceToken, NonceCapacityExceeded> {
        let token = self.verifier.issue_nonce()?;
        Self::bump(&self.metrics.nonces_issued);
        Ok(token)
    }

    async fn register(
        &self,
        attempt: RegistrationAttempt,
    ) -> Result<AccountInfo, RegistrationError> {
        if let Err(err) = validate_attempt(&attempt) {
            Self::bump(&self.metrics.invalid);
            return Err(err.into());
        }

        let proof = match self.verifier.verify(&attempt) {
            Ok(proof) => proof,
            Err(denied) => {
                Self::bump(&self.metrics.denied);
                return Err(denied.into());
            }
        };
        Self::bump(&self.metrics.authorized);

        let account = NewAccount::from_proof(&proof, attempt.display_name);
        match self.registrar.create_account(account).await {
            Ok(info) => {
                Self::bump(&self.metrics.accounts_created);
                info!(
                    user_id = %info.user_id,
                    admin = proof.fields.admin,
                    "Bootstrap registration completed"
                );
                Ok(info)
            }
            Err(err) => {
                Self::bump(&self.metrics.account_failures);
                match &err {
                    AccountError::UserInUse(user_id) => {
                        info!(user_id = %user_id, "Authorized registration for existing user")
                    }
                    AccountError::Unavailable(reason) => {
                        warn!(reason = %reason, "Account creation failed")
                    }
                }
                Err(err.into())
            }
        }
    }

    fn snapshot(&self) -> RegistrationSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        RegistrationSnapshot {
            nonces_issued: load(&self.metrics.nonces_issued),
            authorized: load(&self.metrics.authorized),
            denied: load(&self.metrics.denied),
            invalid: load(&self.metrics.invalid),
            accounts_created: load(&self.metrics.accounts_created),
            account_failures: load(&self.metrics.account_failures),
            nonces: self.verifier.nonces().stats(),
        }
    }

    fn sweep_expired(&self) -> usize {
        self.verifier.nonces().remove_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::memory::InMemoryAccountRegistrar;
    use crate::domain::entities::RegistrationFields;
    use crate::domain::errors::RegistrationDenied;
    use crate::domain::mac::MacCodec;
    use std::time::Duration;

    const SECRET: &str = "test_shared_secret";

    fn service() -> (
        AdminRegistrationService<InMemoryAccountRegistrar>,
        Arc<ManualClock>,
    ) {
        let clock = Arc::new(ManualClock::new());
        let store = NonceStore::with_clock(Duration::from_secs(60), clock.clone()).unwrap();
        let registrar = InMemoryAccountRegistrar::new("localhost", Duration::from_secs(3600));
        let svc = AdminRegistrationService::new(
            Arc::new(store),
            SharedSecret::new(SECRET).unwrap(),
            Arc::new(registrar),
        );
        (svc, clock)
    }

    fn attempt(nonce: &NonceToken, username: &str, password: &str) -> RegistrationAttempt {
        let fields = RegistrationFields::new(nonce.as_str(), username, password, true);
        let codec = MacCodec::new(SharedSecret::new(SECRET).unwrap());
        RegistrationAttempt {
            mac: codec.sign_fields(&fields),
            fields,
            display_name: Some("Alice".into()),
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let (svc, _) = service();
        let nonce = svc.issue_nonce().unwrap();
        let info = svc.register(attempt(&nonce, "alice", "S3cret!")).await.unwrap();

        assert_eq!(info.user_id, "@alice:localhost");
        let record = svc.registrar().get("@alice:localhost").unwrap();
        assert!(record.admin);
        assert_eq!(record.display_name.as_deref(), Some("Alice"));

        let snap = svc.snapshot();
        assert_eq!(snap.nonces_issued, 1);
        assert_eq!(snap.authorized, 1);
        assert_eq!(snap.accounts_created, 1);
        assert_eq!(snap.nonces.consumed, 1);
    }

    #[tokio::test]
    async fn test_invalid_request_leaves_nonce_usable() {
        let (svc, _) = service();
        let nonce = svc.issue_nonce().unwrap();

        let err = svc.register(attempt(&nonce, "Bad Name", "pw")).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Invalid(_)));

        svc.register(attempt(&nonce, "alice", "pw")).await.unwrap();
        assert_eq!(svc.snapshot().invalid, 1);
    }

    #[tokio::test]
    async fn test_replay_denied() {
        let (svc, _) = service();
        let nonce = svc.issue_nonce().unwrap();
        svc.register(attempt(&nonce, "alice", "pw")).await.unwrap();

        let err = svc.register(attempt(&nonce, "mallory", "pw")).await.unwrap_err();
        assert_eq!(err, RegistrationError::Denied(RegistrationDenied));
        assert!(svc.registrar().get("@mallory:localhost").is_none());
        assert_eq!(svc.snapshot().denied, 1);
    }

    #[tokio::test]
    async fn test_user_in_use_after_authorization() {
        let (svc, _) = service();
        let first = svc.issue_nonce().unwrap();
        svc.register(attempt(&first, "alice", "pw")).await.unwrap();

        let second = svc.issue_nonce().unwrap();
        let err = svc.register(attempt(&second, "alice", "pw")).await.unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Account(AccountError::UserInUse("@alice:localhost".into()))
        );
        assert_eq!(svc.snapshot().account_failures, 1);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let (svc, clock) = service();
        svc.issue_nonce().unwrap();
        svc.issue_nonce().unwrap();
        clock.advance(Duration::from_secs(60));
        assert_eq!(svc.sweep_expired(), 2);
        assert!(svc.nonces().is_empty());
    }

    #[test]
    fn test_full_store_refuses_nonce() {
        let clock = Arc::new(ManualClock::new());
        let store = NonceStore::with_clock(Duration::from_secs(60), clock)
            .unwrap()
            .with_capacity(1);
        let svc = AdminRegistrationService::new(
            Arc::new(store),
            SharedSecret::new(SECRET).unwrap(),
            Arc::new(InMemoryAccountRegistrar::new("localhost", Duration::from_secs(3600))),
        );

        svc.issue_nonce().unwrap();
        assert_eq!(svc.issue_nonce(), Err(NonceCapacityExceeded { max: 1 }));

        let snap = svc.snapshot();
        assert_eq!(snap.nonces_issued, 1);
        assert_eq!(snap.nonces.refused, 1);
        assert_eq!(snap.nonces.outstanding, 1);
    }
}

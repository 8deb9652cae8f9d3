//! # Registration Verifier
//!
//! Server-side decision for one attempt:
//!
//! ```text
//! Pending ──consume(nonce)──▶ Err ─▶ Rejected(nonce-invalid)
//!            │
//!            ▼ Ok
//!         verify(mac) ──────▶ false ─▶ Rejected(bad-signature)   nonce stays burned
//!            │
//!            ▼ true
//!         Authorized(AuthorizationProof)
//! ```
//!
//! Both rejection states collapse into [`RegistrationDenied`] at this boundary.

use std::sync::Arc;

use tracing::{debug, warn};

use super::entities::{truncate_for_log, AuthorizationProof, NonceToken, RegistrationAttempt};
use super::errors::{NonceCapacityExceeded, Rejection, RegistrationDenied, SignatureMismatch};
use super::mac::MacCodec;
use super::nonce::NonceStore;
use super::secret::SharedSecret;

#[derive(Debug, Clone)]
pub struct RegistrationVerifier {
    nonces: Arc<NonceStore>,
    codec: MacCodec,
}

impl RegistrationVerifier {
    pub fn new(nonces: Arc<NonceStore>, secret: SharedSecret) -> Self {
        Self {
            nonces,
            codec: MacCodec::new(secret),
        }
    }

    pub fn nonces(&self) -> &Arc<NonceStore> {
        &self.nonces
    }

    /// Issue a nonce from the backing store.
    pub fn issue_nonce(&self) -> Result<NonceToken, NonceCapacityExceeded> {
        self.nonces.issue()
    }

    /// Decide one attempt. The internal reason is logged, never returned.
    pub fn verify(
        &self,
        attempt: &RegistrationAttempt,
    ) -> Result<AuthorizationProof, RegistrationDenied> {
        match self.evaluate(attempt) {
            Ok(proof) => {
                debug!(
                    nonce = %proof.nonce.short(),
                    username = %proof.fields.username,
                    admin = proof.fields.admin,
                    "Registration authorized"
                );
                Ok(proof)
            }
            Err(reason) => {
                warn!(
                    nonce = %truncate_for_log(&attempt.fields.nonce),
                    username = %attempt.fields.username,
                    reason = %reason,
                    "Registration denied"
                );
                Err(RegistrationDenied)
            }
        }
    }

    /// Same decision with the internal reason kept.
    pub(crate) fn evaluate(
        &self,
        attempt: &RegistrationAttempt,
    ) -> Result<AuthorizationProof, Rejection> {
        let fields = &attempt.fields;

        // Burn first: the nonce is spent even if the digest turns out wrong.
        self.nonces.consume(&fields.nonce)?;

        let message = self.codec.build_message(fields);
        if !self.codec.verify(&message, &attempt.mac) {
            return Err(SignatureMismatch.into());
        }

        Ok(AuthorizationProof {
            nonce: NonceToken::new(fields.nonce.clone()),
            digest: attempt.mac.clone(),
            fields: fields.clone(),
        })
    }
}

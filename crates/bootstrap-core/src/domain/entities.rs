//! # Domain Entities
//!
//! Values that flow through one bootstrap registration.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Opaque single-use nonce token as handed to the prover.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NonceToken(String);

impl NonceToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters only, for log lines.
    pub fn short(&self) -> &str {
        truncate_for_log(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NonceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NonceToken({}..)", self.short())
    }
}

impl AsRef<str> for NonceToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Number of characters of a nonce or digest that may appear in logs.
pub(crate) const LOG_PREFIX_LEN: usize = 8;

pub(crate) fn truncate_for_log(value: &str) -> &str {
    match value.char_indices().nth(LOG_PREFIX_LEN) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// A tracked nonce.
///
/// Valid for verification only while `now < expires_at` and `!consumed`.
#[derive(Debug, Clone)]
pub struct Nonce {
    pub token: NonceToken,
    pub issued_at: Instant,
    pub expires_at: Instant,
    pub consumed: bool,
}

impl Nonce {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_usable_at(&self, now: Instant) -> bool {
        !self.consumed && !self.is_expired_at(now)
    }
}

/// The fields covered by the MAC, in canonical order.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationFields {
    pub nonce: String,
    pub username: String,
    pub password: String,
    pub admin: bool,
    pub user_type: Option<String>,
}

impl RegistrationFields {
    pub fn new(
        nonce: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        admin: bool,
    ) -> Self {
        Self {
            nonce: nonce.into(),
            username: username.into(),
            password: password.into(),
            admin,
            user_type: None,
        }
    }

    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }
}

impl fmt::Debug for RegistrationFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationFields")
            .field("nonce", &truncate_for_log(&self.nonce))
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("admin", &self.admin)
            .field("user_type", &self.user_type)
            .finish()
    }
}

/// One registration attempt as received by the verifier.
#[derive(Debug, Clone)]
pub struct RegistrationAttempt {
    pub fields: RegistrationFields,
    /// Hex-encoded HMAC-SHA256 supplied by the prover
    pub mac: String,
    /// Not covered by the MAC
    pub display_name: Option<String>,
}

/// Evidence that an attempt was authorized.
#[derive(Debug, Clone)]
pub struct AuthorizationProof {
    pub nonce: NonceToken,
    pub digest: String,
    pub fields: RegistrationFields,
}

/// Request handed to the account-creation collaborator after authorization.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub admin: bool,
    pub display_name: Option<String>,
    pub user_type: Option<String>,
}

impl NewAccount {
    pub fn from_proof(proof: &AuthorizationProof, display_name: Option<String>) -> Self {
        Self {
            username: proof.fields.username.clone(),
            password: proof.fields.password.clone(),
            admin: proof.fields.admin,
            display_name,
            user_type: proof.fields.user_type.clone(),
        }
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("admin", &self.admin)
            .field("display_name", &self.display_name)
            .field("user_type", &self.user_type)
            .finish_non_exhaustive()
    }
}

/// Credentials returned once the account exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub user_id: String,
    pub device_id: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_server: Option<String>,
}

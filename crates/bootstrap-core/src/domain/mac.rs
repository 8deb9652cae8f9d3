//! # Canonical Message and HMAC
//!
//! Byte layout signed by both sides:
//!
//! ```text
//! nonce \0 username \0 password \0 (admin|notadmin) [\0 user_type]
//! ```
//!
//! No trailing separator. An absent user type is omitted together with its separator.
//! Any drift here silently breaks every signature, so prover and verifier both call
//! [`build_message`].

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::entities::RegistrationFields;
use super::secret::SharedSecret;

type HmacSha256 = Hmac<Sha256>;

pub const FIELD_SEPARATOR: u8 = 0x00;
pub const ADMIN_MARKER: &str = "admin";
pub const NOT_ADMIN_MARKER: &str = "notadmin";

// =============================================================================
// FREE FUNCTIONS
// =============================================================================

/// Build the canonical signing message. Pure.
pub fn build_message(fields: &RegistrationFields) -> Vec<u8> {
    let role = if fields.admin {
        ADMIN_MARKER
    } else {
        NOT_ADMIN_MARKER
    };

    let mut parts: Vec<&[u8]> = vec![
        fields.nonce.as_bytes(),
        fields.username.as_bytes(),
        fields.password.as_bytes(),
        role.as_bytes(),
    ];
    if let Some(user_type) = fields.user_type.as_deref() {
        parts.push(user_type.as_bytes());
    }

    parts.join(&FIELD_SEPARATOR)
}

/// HMAC-SHA256 over `message`, lowercase hex.
pub fn sign(message: &[u8], secret: &SharedSecret) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Recompute the digest and compare it with `provided` in constant time.
///
/// Hex case is significant: only the lowercase form produced by [`sign`] matches.
pub fn verify(message: &[u8], secret: &SharedSecret, provided: &str) -> bool {
    let expected = sign(message, secret);
    constant_time_compare(expected.as_bytes(), provided.as_bytes())
}

/// Length-independent constant-time comparison.
///
/// Both inputs are padded to the same length before `ct_eq` so the comparison time
/// does not depend on where the first differing byte sits.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    let max_len = a.len().max(b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0u8; max_len];
    a_padded[..a.len()].copy_from_slice(a);
    b_padded[..b.len()].copy_from_slice(b);

    let lengths_match = (a.len() as u64).ct_eq(&(b.len() as u64));
    (a_padded.ct_eq(&b_padded) & lengths_match).into()
}

// =============================================================================
// CODEC
// =============================================================================

/// Canonicalization and HMAC bound to one shared secret.
#[derive(Debug, Clone)]
pub struct MacCodec {
    secret: SharedSecret,
}

impl MacCodec {
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    pub fn build_message(&self, fields: &RegistrationFields) -> Vec<u8> {
        build_message(fields)
    }

    pub fn sign(&self, message: &[u8]) -> String {
        sign(message, &self.secret)
    }

    /// Build and sign in one step, as the prover does.
    pub fn sign_fields(&self, fields: &RegistrationFields) -> String {
        self.sign(&build_message(fields))
    }

    pub fn verify(&self, message: &[u8], provided: &str) -> bool {
        verify(message, &self.secret, provided)
    }
}

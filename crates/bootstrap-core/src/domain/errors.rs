//! # Registration Errors
//!
//! Error taxonomy for the bootstrap protocol.
//!
//! `NonceError`, `SignatureMismatch` and `Rejection` are internal: they may be logged
//! but never reach the caller. `RegistrationDenied` is the only authentication
//! failure visible outside the verifier.

use thiserror::Error;

/// Reasons a nonce cannot be consumed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum NonceError {
    /// The token was never issued or has already been evicted
    #[error("nonce not found")]
    NotFound,

    /// The nonce's TTL elapsed before it was presented
    #[error("nonce expired")]
    Expired,

    /// The nonce was already presented by an earlier attempt
    #[error("nonce already used")]
    AlreadyUsed,
}

/// The nonce table is at capacity and holds nothing expired.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("nonce table full ({max} outstanding)")]
pub struct NonceCapacityExceeded {
    pub max: usize,
}

/// The presented digest does not match the recomputed one.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("signature mismatch")]
pub struct SignatureMismatch;

/// Internal reason a registration attempt was rejected.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("nonce invalid: {0}")]
    NonceInvalid(#[from] NonceError),

    #[error("bad signature")]
    BadSignature(#[from] SignatureMismatch),
}

/// The single externally visible authentication failure.
///
/// Deliberately carries no detail: an unknown, expired or reused nonce and a wrong
/// digest all produce this same value.
#[derive(Debug, Clone, Copy, Default, Error, PartialEq, Eq)]
#[error("registration denied")]
pub struct RegistrationDenied;

/// Fatal startup configuration problems.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No shared secret, or an empty one
    #[error("shared secret is not configured")]
    MissingSharedSecret,

    /// A nonce TTL of zero would make every nonce expire on issue
    #[error("nonce TTL must be greater than zero")]
    ZeroTtl,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A request field failed shape validation before the protocol ran.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors from the account-creation collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("user ID already taken: {0}")]
    UserInUse(String),

    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by [`crate::AdminRegistrationApi::register`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Denied(#[from] RegistrationDenied),

    #[error(transparent)]
    Account(#[from] AccountError),
}

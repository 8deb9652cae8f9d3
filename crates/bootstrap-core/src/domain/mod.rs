//! # Domain Layer
//!
//! Pure protocol logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod entities;
pub mod errors;
pub mod mac;
pub mod nonce;
pub mod secret;
pub mod validation;
pub mod verifier;

//! # Bootstrap Core
//!
//! Shared-secret bootstrap registration for privileged accounts.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): nonce bookkeeping, canonical message and HMAC logic,
//!   the registration verifier. No I/O.
//! - **Ports Layer** (`ports/`): the inbound registration API and the outbound
//!   clock / account-creation dependencies.
//! - **Adapters** (`adapters/`): system and manual clocks, in-memory account registrar.
//! - **Service Layer** (`service.rs`): wires the verifier to the account registrar.
//!
//! ```text
//!   operator (prover)                         server (issuer / verifier)
//!   ─────────────────                         ──────────────────────────
//!   GET nonce  ─────────────────────────────▶ NonceStore::issue
//!   MacCodec::sign(nonce\0user\0pass\0admin)
//!   POST register {nonce, ..., mac} ────────▶ RegistrationVerifier::verify
//!                                               ├─ NonceStore::consume  (at most once)
//!                                               └─ MacCodec::verify     (constant time)
//!                                             AccountRegistrar::create_account
//! ```
//!
//! ## Security Notes
//!
//! - The shared secret never leaves the process and is redacted from `Debug` output
//! - Every rejection collapses into a single `RegistrationDenied` outcome
//! - A nonce is burned on the first attempt that presents it, whatever the outcome

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod wire;

// Re-export public API
pub use adapters::clock::{ManualClock, SystemClock};
pub use adapters::memory::{AccountRecord, InMemoryAccountRegistrar};
pub use domain::entities::{
    AccountInfo, AuthorizationProof, NewAccount, Nonce, NonceToken, RegistrationAttempt,
    RegistrationFields,
};
pub use domain::errors::{
    AccountError, ConfigurationError, NonceCapacityExceeded, NonceError, Rejection,
    RegistrationDenied, RegistrationError, SignatureMismatch, ValidationError,
};
pub use domain::mac::{build_message, sign, verify, MacCodec};
pub use domain::nonce::{NonceStats, NonceStore, DEFAULT_MAX_OUTSTANDING, DEFAULT_NONCE_TTL};
pub use domain::secret::SharedSecret;
pub use domain::verifier::RegistrationVerifier;
pub use ports::inbound::AdminRegistrationApi;
pub use ports::outbound::{AccountRegistrar, Clock};
pub use service::{AdminRegistrationService, RegistrationMetrics, RegistrationSnapshot};

//! Bootstrap Admin: client side of the shared-secret registration protocol.
//!
//! ```text
//! client                                   gateway
//!   │  GET  /register/nonce                  │
//!   │ ─────────────────────────────────────▶ │  issue
//!   │ ◀───────────────────────────────────── │  {"nonce"}
//!   │  HMAC-SHA256(secret, canonical msg)    │
//!   │  POST /register {.., "mac"}            │
//!   │ ─────────────────────────────────────▶ │  consume + verify
//!   │ ◀───────────────────────────────────── │  account | denied
//! ```
//!
//! A nonce is used for exactly one submission. Retrying after any failure starts over
//! with a fresh nonce.

pub mod client;

pub use client::{ClientError, RegisterOptions, RegistrationClient, DEFAULT_SERVER_URL};

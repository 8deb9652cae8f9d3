//! # Bootstrap Registration Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/   # Real gateway on an ephemeral port + real client
//! │   ├── registration_flow.rs
//! │   └── replay_and_expiry.rs
//! └── benches/           # criterion benchmarks for the protocol hot path
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bootstrap-tests
//! cargo bench -p bootstrap-tests
//! ```

pub mod integration;

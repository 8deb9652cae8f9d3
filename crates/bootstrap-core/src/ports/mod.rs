//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: the registration API the HTTP layer calls
//! - **Outbound (Driven)**: time source and account creation

pub mod inbound;
pub mod outbound;

//! Concrete implementations of the outbound ports.

pub mod clock;
pub mod memory;

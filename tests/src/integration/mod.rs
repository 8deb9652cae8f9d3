//! End-to-end scenarios against a live gateway.

#[cfg(test)]
pub mod fixture;
mod registration_flow;
mod replay_and_expiry;

//! # Nonce Store
//!
//! Issues, tracks, expires and single-use-consumes registration nonces.
//!
//! ## Design
//!
//! - `DashMap<String, Nonce>` keyed by token; `consume` does its check-and-set while
//!   holding the entry's shard guard, so exactly one caller wins a race on a token
//! - Consumed entries stay as tombstones until their own expiry, so a replay inside
//!   the TTL window is reported as `AlreadyUsed` rather than `NotFound`
//! - Expired entries are purged when touched and by the periodic
//!   [`NonceStore::remove_expired`] task
//! - The table never holds more than its capacity. At the bound, `issue` sweeps once
//!   the earliest recorded expiry has passed and otherwise refuses without scanning

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use tracing::{debug, warn};

use super::entities::{Nonce, NonceToken};
use super::errors::{ConfigurationError, NonceCapacityExceeded, NonceError};
use crate::adapters::clock::SystemClock;
use crate::ports::outbound::Clock;

/// Default nonce lifetime.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(60);

/// Default bound on tracked nonces, tombstones included.
pub const DEFAULT_MAX_OUTSTANDING: usize = 10_000;

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Counters exposed for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NonceStats {
    pub issued: u64,
    pub consumed: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub refused: u64,
    pub outstanding: usize,
}

pub struct NonceStore {
    entries: DashMap<String, Nonce>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    /// Serializes the capacity check with the insert.
    issue_lock: Mutex<()>,
    /// Lower bound on the earliest expiry left after the last sweep.
    next_expiry: Mutex<Option<Instant>>,
    issued: AtomicU64,
    consumed: AtomicU64,
    rejected: AtomicU64,
    evicted: AtomicU64,
    refused: AtomicU64,
}

impl NonceStore {
    /// Store on the system clock.
    pub fn new(ttl: Duration) -> Result<Self, ConfigurationError> {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self, ConfigurationError> {
        if ttl.is_zero() {
            return Err(ConfigurationError::ZeroTtl);
        }
        Ok(Self {
            entries: DashMap::new(),
            ttl,
            max_entries: DEFAULT_MAX_OUTSTANDING,
            clock,
            issue_lock: Mutex::new(()),
            next_expiry: Mutex::new(None),
            issued: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            refused: AtomicU64::new(0),
        })
    }

    /// Override the bound on tracked entries.
    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate and record a fresh nonce.
    ///
    /// Fails when the table is at capacity and nothing in it has expired yet.
    pub fn issue(&self) -> Result<NonceToken, NonceCapacityExceeded> {
        let _guard = self.issue_lock.lock();

        if self.entries.len() >= self.max_entries {
            let now = self.clock.now();
            let sweep_due = self.next_expiry.lock().map_or(true, |at| now >= at);
            if sweep_due {
                self.remove_expired();
            }
            if self.entries.len() >= self.max_entries {
                self.refused.fetch_add(1, Ordering::Relaxed);
                warn!(
                    outstanding = self.entries.len(),
                    max = self.max_entries,
                    "Nonce table full, refusing issuance"
                );
                return Err(NonceCapacityExceeded {
                    max: self.max_entries,
                });
            }
        }

        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = NonceToken::new(hex::encode(bytes));

        let issued_at = self.clock.now();
        let nonce = Nonce {
            token: token.clone(),
            issued_at,
            expires_at: issued_at + self.ttl,
            consumed: false,
        };
        self.entries.insert(token.as_str().to_owned(), nonce);
        self.issued.fetch_add(1, Ordering::Relaxed);

        debug!(nonce = %token.short(), ttl_ms = self.ttl.as_millis() as u64, "Issued nonce");
        Ok(token)
    }

    /// Consume `token` at most once.
    ///
    /// Order of checks: absent, then expired, then already consumed.
    pub fn consume(&self, token: &str) -> Result<(), NonceError> {
        let now = self.clock.now();

        let outcome = match self.entries.get_mut(token) {
            None => Err(NonceError::NotFound),
            Some(mut entry) => {
                if entry.is_expired_at(now) {
                    Err(NonceError::Expired)
                } else if entry.consumed {
                    Err(NonceError::AlreadyUsed)
                } else {
                    entry.consumed = true;
                    Ok(())
                }
            }
        };

        match outcome {
            Ok(()) => {
                self.consumed.fetch_add(1, Ordering::Relaxed);
            }
            Err(NonceError::Expired) => {
                // Guard is dropped; re-check expiry under the removal lock.
                if self
                    .entries
                    .remove_if(token, |_, nonce| nonce.is_expired_at(now))
                    .is_some()
                {
                    self.evicted.fetch_add(1, Ordering::Relaxed);
                }
                self.rejected.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
        outcome
    }

    /// Drop every entry whose expiry has passed. Returns the number removed.
    pub fn remove_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0usize;
        let mut earliest: Option<Instant> = None;
        self.entries.retain(|_, nonce| {
            if nonce.is_expired_at(now) {
                removed += 1;
                return false;
            }
            earliest = Some(earliest.map_or(nonce.expires_at, |at| at.min(nonce.expires_at)));
            true
        });
        *self.next_expiry.lock() = earliest;
        if removed > 0 {
            self.evicted.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Swept expired nonces");
        }
        removed
    }

    /// Tracked entries, including consumed tombstones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> NonceStats {
        NonceStats {
            issued: self.issued.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
            outstanding: self.entries.len(),
        }
    }
}

impl std::fmt::Debug for NonceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceStore")
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .field("outstanding", &self.entries.len())
            .finish()
    }
}

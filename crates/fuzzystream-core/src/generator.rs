//! Process-wide seedable generator shared by the broadcaster and the mixer.
//!
//! A single mutex guards the RNG state, so a draw sees either the state before
//! a reseed or the state after it, never a mixture. Batches are drawn under one
//! lock acquisition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Lowercase hex digits, in value order.
pub const HEX_ALPHABET: &[u8; 16] = b"0123456789abcdef";

/// Thread-safe seedable generator with draw and reseed accounting.
pub struct SharedGenerator {
    rng: Mutex<StdRng>,
    draws: AtomicU64,
    reseeds: AtomicU64,
}

impl SharedGenerator {
    /// Seeded from the operating system.
    pub fn from_os() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministically seeded, for reproducible tests.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            draws: AtomicU64::new(0),
            reseeds: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StdRng> {
        // The RNG never panics mid-update, so a poisoned state is still valid.
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One hex digit, uniform over [`HEX_ALPHABET`].
    pub fn next_hex_digit(&self) -> char {
        let mut rng = self.lock();
        self.draws.fetch_add(1, Ordering::Relaxed);
        hex_digit(&mut rng)
    }

    /// `n` hex digits drawn under a single lock.
    pub fn hex_batch(&self, n: usize) -> String {
        let mut rng = self.lock();
        self.draws.fetch_add(n as u64, Ordering::Relaxed);
        (0..n).map(|_| hex_digit(&mut rng)).collect()
    }

    /// Raw 64-bit output.
    pub fn next_u64(&self) -> u64 {
        let mut rng = self.lock();
        self.draws.fetch_add(1, Ordering::Relaxed);
        rng.next_u64()
    }

    /// Replace the state with one derived from `seed`.
    pub fn reseed(&self, seed: u64) {
        let mut rng = self.lock();
        *rng = StdRng::seed_from_u64(seed);
        self.reseeds.fetch_add(1, Ordering::Relaxed);
    }

    /// Draw the prior 64-bit output, derive a seed from it, and install that
    /// seed, all under one lock.
    pub fn reseed_with(&self, derive: impl FnOnce(u64) -> u64) {
        let mut rng = self.lock();
        let prior = rng.next_u64();
        *rng = StdRng::seed_from_u64(derive(prior));
        self.reseeds.fetch_add(1, Ordering::Relaxed);
    }

    /// Total values drawn by callers (one per digit or `u64`).
    pub fn draw_count(&self) -> u64 {
        self.draws.load(Ordering::Relaxed)
    }

    /// Number of completed reseeds.
    pub fn reseed_count(&self) -> u64 {
        self.reseeds.load(Ordering::Relaxed)
    }

    /// Next `u64` of a copy of the current state. Does not advance the shared
    /// state; two equal fingerprints mean no draw or reseed happened between them.
    pub fn fingerprint(&self) -> u64 {
        let mut copy = self.lock().clone();
        copy.next_u64()
    }
}

impl Default for SharedGenerator {
    fn default() -> Self {
        Self::from_os()
    }
}

fn hex_digit(rng: &mut StdRng) -> char {
    HEX_ALPHABET[rng.random_range(0..HEX_ALPHABET.len())] as char
}

//! Reseed conditioning.
//!
//! **All** seed derivation lives here. The reseed loop hands over a
//! temperature reading (or its absence) and this module turns it, together with
//! both clocks, the generator's prior output, and OS padding, into the next seed.
//!
//! # Material layout
//!
//! ```text
//! offset  bytes  field
//! 0       8      wall-clock seconds   (f64, LE)
//! 8       8      monotonic seconds    (f64, LE)
//! 16      8      prior generator word (u64, LE)
//! 24      8      temperature °C       (f64, LE)   only when a reading exists
//! 24|32   8      OS random padding
//! ```
//!
//! seed = first 8 bytes of SHA-256(material), little-endian.
//!
//! This is a statistical reseed, not a DRBG: the goal is that a remote observer
//! without access to the board's clock and sensors cannot predict the stream.

use log::warn;
use sha2::{Digest, Sha256};

use crate::generator::SharedGenerator;
use crate::source::TemperatureReading;
use crate::sources::helpers::{monotonic_secs, wall_clock_secs};

/// Length of the OS random padding appended to every material blob.
pub const PADDING_LEN: usize = 8;

/// Transient byte blob fed to the digest. Dropped right after use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReseedMaterial {
    bytes: Vec<u8>,
}

impl ReseedMaterial {
    /// Concatenate the fields in the fixed order shown in the module docs.
    pub fn assemble(
        wall_clock: f64,
        monotonic: f64,
        prior: u64,
        temperature: TemperatureReading,
        padding: [u8; PADDING_LEN],
    ) -> Self {
        let mut bytes = Vec::with_capacity(40);
        bytes.extend_from_slice(&wall_clock.to_le_bytes());
        bytes.extend_from_slice(&monotonic.to_le_bytes());
        bytes.extend_from_slice(&prior.to_le_bytes());
        if let Some(celsius) = temperature {
            bytes.extend_from_slice(&celsius.to_le_bytes());
        }
        bytes.extend_from_slice(&padding);
        Self { bytes }
    }

    /// Capture the clocks and padding now.
    pub fn capture(prior: u64, temperature: TemperatureReading) -> Self {
        Self::assemble(
            wall_clock_secs(),
            monotonic_secs(),
            prior,
            temperature,
            os_padding(),
        )
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// SHA-256 the material and fold the first 8 digest bytes into a seed.
pub fn derive_seed(material: &ReseedMaterial) -> u64 {
    let digest: [u8; 32] = Sha256::digest(material.as_bytes()).into();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Reseed `generator` from the clocks, its own prior output, the optional
/// temperature, and OS padding. Never fails.
pub fn stir(generator: &SharedGenerator, temperature: TemperatureReading) {
    generator.reseed_with(|prior| derive_seed(&ReseedMaterial::capture(prior, temperature)));
}

/// Eight bytes from the OS CSPRNG. On failure the padding stays zero; the
/// clocks still move the seed.
fn os_padding() -> [u8; PADDING_LEN] {
    let mut buf = [0u8; PADDING_LEN];
    if let Err(e) = getrandom::fill(&mut buf) {
        warn!("OS random padding unavailable: {e}");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const PAD: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn layout_without_temperature() {
        let m = ReseedMaterial::assemble(1.5, 2.5, 0x0102_0304_0506_0708, None, PAD);
        let b = m.as_bytes();
        assert_eq!(m.len(), 32);
        assert_eq!(&b[0..8], &1.5f64.to_le_bytes());
        assert_eq!(&b[8..16], &2.5f64.to_le_bytes());
        assert_eq!(&b[16..24], &0x0102_0304_0506_0708u64.to_le_bytes());
        assert_eq!(&b[24..32], &PAD);
    }

    #[test]
    fn layout_with_temperature() {
        let m = ReseedMaterial::assemble(1.5, 2.5, 7, Some(55.0), PAD);
        let b = m.as_bytes();
        assert_eq!(m.len(), 40);
        assert_eq!(&b[24..32], &55.0f64.to_le_bytes());
        assert_eq!(&b[32..40], &PAD);
    }

    #[test]
    fn seed_is_digest_prefix() {
        let m = ReseedMaterial::assemble(1.0, 2.0, 3, Some(4.0), PAD);
        let digest = Sha256::digest(m.as_bytes());
        let expected = u64::from_le_bytes(digest[..8].try_into().unwrap());
        assert_eq!(derive_seed(&m), expected);
    }

    #[test]
    fn seed_is_deterministic_for_fixed_material() {
        let a = ReseedMaterial::assemble(10.0, 20.0, 30, None, PAD);
        let b = ReseedMaterial::assemble(10.0, 20.0, 30, None, PAD);
        assert_eq!(derive_seed(&a), derive_seed(&b));
    }

    #[test]
    fn temperature_changes_seed() {
        let without = ReseedMaterial::assemble(10.0, 20.0, 30, None, PAD);
        let with = ReseedMaterial::assemble(10.0, 20.0, 30, Some(48.2), PAD);
        let warmer = ReseedMaterial::assemble(10.0, 20.0, 30, Some(48.3), PAD);
        let seeds: HashSet<u64> = [&without, &with, &warmer].iter().map(|m| derive_seed(m)).collect();
        assert_eq!(seeds.len(), 3);
    }

    #[test]
    fn stir_with_temperature_changes_output() {
        let g = SharedGenerator::from_seed(1);
        let before = g.fingerprint();
        stir(&g, Some(55.0));
        assert_ne!(g.fingerprint(), before);
        assert_eq!(g.reseed_count(), 1);
    }

    #[test]
    fn stir_without_temperature_changes_output() {
        let g = SharedGenerator::from_seed(1);
        let before = g.fingerprint();
        stir(&g, None);
        assert_ne!(g.fingerprint(), before);
    }

    #[test]
    fn repeated_stirs_diverge() {
        // Same seed, same temperature: padding and clocks must still separate runs.
        let a = SharedGenerator::from_seed(2);
        let b = SharedGenerator::from_seed(2);
        stir(&a, Some(40.0));
        stir(&b, Some(40.0));
        assert_ne!(a.hex_batch(32), b.hex_batch(32));
    }

    #[test]
    fn stir_does_not_count_as_a_draw() {
        let g = SharedGenerator::from_seed(3);
        stir(&g, None);
        assert_eq!(g.draw_count(), 0);
    }
}

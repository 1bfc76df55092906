//! # fuzzystream-core
//!
//! **A lightweight randomness beacon for single-board computers.**
//!
//! `fuzzystream-core` holds everything the beacon does apart from the network
//! transport: probing the board's temperature sensor, stirring physical entropy
//! into a shared pseudo-random generator, and fanning hex digits out to every
//! registered client.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fuzzystream_core::{ConnectionRegistry, SharedGenerator, TemperatureSensor, conditioning};
//!
//! # async fn demo() {
//! let sensor = TemperatureSensor::detect(&Default::default());
//! let generator = Arc::new(SharedGenerator::from_os());
//!
//! // Fold a temperature reading (or its absence) into the generator.
//! conditioning::stir(&generator, sensor.read().await);
//!
//! let registry = Arc::new(ConnectionRegistry::new());
//! assert!(registry.is_empty());
//! println!("{}", generator.hex_batch(4));
//! # }
//! ```
//!
//! ## Architecture
//!
//! Sensor → Reseed Loop → Conditioning (SHA-256) → Shared Generator → Broadcaster → Registry
//!
//! The generator is **not** a CSPRNG. Reseeding makes the stream unpredictable
//! to an observer who cannot read the device's sensors or clock; it does not
//! make the output suitable for key material.

pub mod broadcast;
pub mod conditioning;
pub mod config;
pub mod error;
pub mod generator;
pub mod registry;
pub mod reseed;
pub mod source;
pub mod sources;

pub use broadcast::{Broadcaster, TickOutcome};
pub use conditioning::{ReseedMaterial, derive_seed, stir};
pub use config::{BeaconConfig, MAX_RESEED_INTERVAL, MIN_RESEED_INTERVAL, SensorProbe};
pub use error::{ConfigError, SensorError};
pub use generator::{HEX_ALPHABET, SharedGenerator};
pub use registry::{ClientSender, ConnectionId, ConnectionRegistry, Delivery, Registration};
pub use reseed::ReseedLoop;
pub use source::{SourceKind, TemperatureReading, TemperatureSensor};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

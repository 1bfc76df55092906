//! Periodic reseeding from the temperature sensor.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::conditioning::stir;
use crate::config::MIN_RESEED_INTERVAL;
use crate::generator::SharedGenerator;
use crate::source::{TemperatureReading, TemperatureSensor};

/// Reads the sensor and stirs the generator every `interval`.
pub struct ReseedLoop {
    sensor: TemperatureSensor,
    generator: Arc<SharedGenerator>,
    interval: Duration,
}

impl ReseedLoop {
    /// `interval` is raised to [`MIN_RESEED_INTERVAL`] if shorter.
    pub fn new(sensor: TemperatureSensor, generator: Arc<SharedGenerator>, interval: Duration) -> Self {
        Self {
            sensor,
            generator,
            interval: interval.max(MIN_RESEED_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One read-and-stir cycle. Returns the temperature used, if any.
    pub async fn cycle(&self) -> TemperatureReading {
        let temperature = self.sensor.read().await;
        stir(&self.generator, temperature);
        if let Some(celsius) = temperature {
            info!("{celsius:.1}°C");
        }
        temperature
    }

    /// Cycle every `interval` until `cancel` fires. A slow sensor read delays
    /// the following cycle rather than stacking reads.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.cycle() => {}
                    }
                }
            }
        }
        debug!("reseed loop stopped");
    }
}

//! Periodic hex-digit fan-out.
//!
//! Each tick: if nobody is connected, do nothing (no entropy is drawn);
//! otherwise draw `batch_size` digits, join them into one message, and queue
//! that message for every registered connection.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::BeaconConfig;
use crate::generator::SharedGenerator;
use crate::registry::{ConnectionRegistry, Delivery};

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Registry was empty; the generator was not touched.
    Idle,
    /// One message was queued for a snapshot of the registry.
    Sent { payload: String, delivery: Delivery },
}

/// Shortest tick period; shorter periods are raised to this.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

pub struct Broadcaster {
    generator: Arc<SharedGenerator>,
    registry: Arc<ConnectionRegistry>,
    batch_size: usize,
    period: Duration,
}

impl Broadcaster {
    pub fn new(
        generator: Arc<SharedGenerator>,
        registry: Arc<ConnectionRegistry>,
        batch_size: usize,
        period: Duration,
    ) -> Self {
        Self {
            generator,
            registry,
            batch_size: batch_size.max(1),
            period: period.max(MIN_PERIOD),
        }
    }

    pub fn from_config(
        config: &BeaconConfig,
        generator: Arc<SharedGenerator>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self::new(generator, registry, config.batch_size, config.broadcast_period())
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one broadcast cycle.
    pub fn tick(&self) -> TickOutcome {
        if self.registry.is_empty() {
            return TickOutcome::Idle;
        }
        let payload = self.generator.hex_batch(self.batch_size);
        let delivery = self.registry.broadcast(&payload);
        if delivery.failed > 0 {
            debug!(
                "broadcast reached {}/{} clients",
                delivery.recipients - delivery.failed,
                delivery.recipients
            );
        }
        TickOutcome::Sent { payload, delivery }
    }

    /// Tick every `period` until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
        debug!("broadcaster stopped");
    }
}

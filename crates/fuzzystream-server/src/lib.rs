//! WebSocket transport for the fuzzystream beacon.
//!
//! Serves a single endpoint at `/`. Every connected client receives the same
//! text frame of `batch_size` lowercase hex digits once per broadcast tick.
//! Client frames are read and discarded. Compression is never negotiated.

mod connection;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fuzzystream_core::{
    BeaconConfig, Broadcaster, ConnectionRegistry, ReseedLoop, SensorProbe, SharedGenerator,
    SourceKind, TemperatureSensor, stir,
};

pub use error::ServerError;

/// Shared handler state.
struct AppState {
    registry: Arc<ConnectionRegistry>,
    cancel: CancellationToken,
}

/// Build the axum router.
fn build_router(registry: Arc<ConnectionRegistry>, cancel: CancellationToken) -> Router {
    let state = Arc::new(AppState { registry, cancel });
    Router::new()
        .route("/", get(connection::handle_upgrade))
        .with_state(state)
}

/// A running beacon: listener, broadcaster, and (optionally) reseed loop.
pub struct BeaconServer {
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    generator: Arc<SharedGenerator>,
    sensor_kind: SourceKind,
    cancel: CancellationToken,
    serve: JoinHandle<std::io::Result<()>>,
    loops: Vec<JoinHandle<()>>,
}

impl BeaconServer {
    /// Detect the host's sensor (unless `temperature` is off) and start.
    pub async fn start(config: BeaconConfig) -> Result<Self, ServerError> {
        let sensor = if config.temperature {
            detect_sensor(config.sensor_probe()).await
        } else {
            TemperatureSensor::NoSensor
        };
        Self::start_with_sensor(config, sensor).await
    }

    /// Start with an explicit sensor strategy.
    ///
    /// Stirs the generator once, binds the listener (a bind failure is fatal),
    /// then spawns the server, the broadcaster, and the reseed loop if enabled.
    pub async fn start_with_sensor(
        config: BeaconConfig,
        sensor: TemperatureSensor,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let sensor = if config.temperature {
            sensor
        } else {
            TemperatureSensor::NoSensor
        };
        let sensor_kind = sensor.kind();

        let generator = Arc::new(SharedGenerator::from_os());
        stir(&generator, sensor.read().await);

        let addr = config.listen_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;

        let registry = Arc::new(ConnectionRegistry::new());
        let cancel = CancellationToken::new();

        let app = build_router(Arc::clone(&registry), cancel.clone());
        let shutdown = cancel.clone();
        let serve = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        });
        info!("streaming on ws://{local_addr}");

        let mut loops = Vec::with_capacity(2);
        let broadcaster =
            Broadcaster::from_config(&config, Arc::clone(&generator), Arc::clone(&registry));
        loops.push(tokio::spawn(broadcaster.run(cancel.clone())));

        if config.reseed {
            let reseeder = ReseedLoop::new(sensor, Arc::clone(&generator), config.reseed_interval()?);
            loops.push(tokio::spawn(reseeder.run(cancel.clone())));
        }

        Ok(Self {
            local_addr,
            registry,
            generator,
            sensor_kind,
            cancel,
            serve,
            loops,
        })
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn generator(&self) -> &Arc<SharedGenerator> {
        &self.generator
    }

    pub fn sensor_kind(&self) -> SourceKind {
        self.sensor_kind
    }

    /// Token that stops every task when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel all tasks and wait for them.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Run until the shutdown token is cancelled (or the listener fails).
    ///
    /// A panic in any task is re-raised here.
    pub async fn wait(self) -> Result<(), ServerError> {
        let served = join(self.serve).await;
        // The listener may have failed on its own; stop the loops either way.
        self.cancel.cancel();
        for task in self.loops {
            join(task).await;
        }
        served.map_err(ServerError::Serve)
    }
}

/// Detection touches the filesystem, so it runs on the blocking pool.
async fn detect_sensor(probe: SensorProbe) -> TemperatureSensor {
    match tokio::task::spawn_blocking(move || TemperatureSensor::detect(&probe)).await {
        Ok(sensor) => sensor,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            warn!("sensor detection did not complete: {e}");
            TemperatureSensor::NoSensor
        }
    }
}

async fn join<T>(task: JoinHandle<T>) -> T {
    match task.await {
        Ok(value) => value,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => unreachable!("beacon tasks are never aborted: {e}"),
    }
}

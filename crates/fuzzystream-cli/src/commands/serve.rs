use std::path::PathBuf;

use clap::Args;
use log::{debug, info};

use fuzzystream_core::{BeaconConfig, ConfigError};
use fuzzystream_server::{BeaconServer, ServerError};

use super::SensorArgs;

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// JSON config file; flags and environment variables override its values
    #[arg(long, env = "FUZZYSTREAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "FUZZYSTREAM_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "FUZZYSTREAM_PORT")]
    pub port: Option<u16>,

    /// Milliseconds per digit
    #[arg(long, env = "FUZZYSTREAM_TICK_INTERVAL_MS")]
    pub tick_interval_ms: Option<u64>,

    /// Digits per message (1 = one digit per tick)
    #[arg(long, env = "FUZZYSTREAM_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Seconds between temperature reseeds
    #[arg(long, env = "FUZZYSTREAM_RESEED_INTERVAL_S")]
    pub reseed_interval_s: Option<f64>,

    /// Disable the periodic reseed loop (seed once at startup)
    #[arg(long, env = "FUZZYSTREAM_NO_RESEED")]
    pub no_reseed: bool,

    /// Reseed from clocks and OS padding only, ignoring the thermal sensor
    #[arg(long, env = "FUZZYSTREAM_NO_TEMPERATURE")]
    pub no_temperature: bool,

    #[command(flatten)]
    pub sensor: SensorArgs,
}

impl ServeArgs {
    /// Defaults, then the config file, then explicit flags.
    pub fn into_config(self) -> Result<BeaconConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => BeaconConfig::from_json_file(path)?,
            None => BeaconConfig::default(),
        };
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ms) = self.tick_interval_ms {
            config.tick_interval_ms = ms;
        }
        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        if let Some(secs) = self.reseed_interval_s {
            config.reseed_interval_s = secs;
        }
        if self.no_reseed {
            config.reseed = false;
        }
        if self.no_temperature {
            config.temperature = false;
        }
        self.sensor.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

pub fn run(args: ServeArgs) -> Result<(), ServerError> {
    let config = args.into_config()?;
    if let Ok(json) = serde_json::to_string(&config) {
        debug!("effective config: {json}");
    }

    let rt = tokio::runtime::Runtime::new().map_err(ServerError::Serve)?;
    rt.block_on(async move {
        let server = BeaconServer::start(config).await?;
        let token = server.shutdown_token();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("shutting down");
            token.cancel();
        });
        server.wait().await
    })
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

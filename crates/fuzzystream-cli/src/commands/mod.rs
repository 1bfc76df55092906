pub mod probe;
pub mod serve;

use std::path::PathBuf;

use clap::Args;
use fuzzystream_core::BeaconConfig;

/// Sensor options shared by `serve` and `probe`.
#[derive(Args, Debug, Default)]
pub struct SensorArgs {
    /// Thermal zone file holding millidegrees Celsius
    #[arg(long, env = "FUZZYSTREAM_THERMAL_PATH")]
    pub thermal_path: Option<PathBuf>,

    /// External measurement tool probed on PATH when no thermal zone exists
    #[arg(long, env = "FUZZYSTREAM_SENSOR_TOOL")]
    pub sensor_tool: Option<String>,

    /// Upper bound on a single sensor read, in milliseconds
    #[arg(long, env = "FUZZYSTREAM_SENSOR_TIMEOUT_MS")]
    pub sensor_timeout_ms: Option<u64>,
}

impl SensorArgs {
    /// Override `config` with every option given on the command line.
    pub fn apply(self, config: &mut BeaconConfig) {
        if let Some(path) = self.thermal_path {
            config.thermal_path = path;
        }
        if let Some(tool) = self.sensor_tool {
            config.sensor_tool = tool;
        }
        if let Some(ms) = self.sensor_timeout_ms {
            config.sensor_timeout_ms = ms;
        }
    }
}

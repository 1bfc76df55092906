use std::time::Instant;

use clap::Args;

use fuzzystream_core::{BeaconConfig, SourceKind, TemperatureSensor};
use fuzzystream_server::ServerError;

use super::SensorArgs;

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub sensor: SensorArgs,
}

pub fn run(args: ProbeArgs) -> Result<(), ServerError> {
    let mut config = BeaconConfig::default();
    args.sensor.apply(&mut config);
    config.validate()?;

    let sensor = TemperatureSensor::detect(&config.sensor_probe());
    println!("Sensor: {}", sensor.kind());
    if sensor.kind() == SourceKind::NoSensor {
        println!("  Reseeding will use clocks and OS padding only.");
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new().map_err(ServerError::Serve)?;
    let t0 = Instant::now();
    let reading = rt.block_on(sensor.try_read());
    let elapsed = t0.elapsed();

    match reading {
        Ok(celsius) => println!("  Temperature: {celsius:.1}°C"),
        Err(e) => println!("  Read failed: {e}"),
    }
    println!("  Time:        {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

//! Integration tests for fuzzystream-core.
//!
//! These exercise the whole in-process pipeline:
//! sensor → reseed loop → shared generator → broadcaster → registry.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use fuzzystream_core::{
    BeaconConfig, Broadcaster, ConnectionRegistry, HEX_ALPHABET, ReseedLoop, SensorProbe,
    SharedGenerator, SourceKind, TemperatureSensor, TickOutcome, stir,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn is_hex_batch(msg: &str, len: usize) -> bool {
    msg.len() == len && msg.bytes().all(|b| HEX_ALPHABET.contains(&b))
}

#[tokio::test]
async fn detected_thermal_zone_feeds_the_generator() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "52125").unwrap();

    let probe = SensorProbe {
        thermal_path: file.path().to_path_buf(),
        ..Default::default()
    };
    let sensor = TemperatureSensor::detect(&probe);
    assert_eq!(sensor.kind(), SourceKind::Filesystem);

    let generator = Arc::new(SharedGenerator::from_seed(0));
    let before = generator.fingerprint();
    let reading = sensor.read().await;
    assert_eq!(reading, Some(52.125));
    stir(&generator, reading);
    assert_ne!(generator.fingerprint(), before);
}

#[tokio::test]
async fn loops_run_side_by_side() {
    let config = BeaconConfig {
        tick_interval_ms: 2,
        batch_size: 4,
        reseed_interval_s: 0.02,
        ..Default::default()
    };
    config.validate().unwrap();

    let generator = Arc::new(SharedGenerator::from_os());
    let registry = Arc::new(ConnectionRegistry::new());
    let cancel = CancellationToken::new();

    let broadcaster = Broadcaster::from_config(&config, Arc::clone(&generator), Arc::clone(&registry));
    let reseeder = ReseedLoop::new(
        TemperatureSensor::NoSensor,
        Arc::clone(&generator),
        config.reseed_interval().unwrap(),
    );
    let b = tokio::spawn(broadcaster.run(cancel.clone()));
    let r = tokio::spawn(reseeder.run(cancel.clone()));

    let (tx, mut rx) = mpsc::channel(256);
    let reg = registry.register(tx);

    let mut seen = std::collections::HashSet::new();
    for _ in 0..20 {
        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no message within 2s")
            .expect("queue closed");
        assert!(is_hex_batch(&msg, 4), "bad message {msg:?}");
        seen.insert(msg.to_string());
    }
    assert!(seen.len() >= 2, "stream shows no variety");

    drop(reg);
    assert!(registry.is_empty());

    cancel.cancel();
    b.await.unwrap();
    r.await.unwrap();
    assert!(generator.reseed_count() >= 1);
}

#[test]
fn idle_registry_consumes_no_entropy() {
    let generator = Arc::new(SharedGenerator::from_seed(3));
    let registry = Arc::new(ConnectionRegistry::new());
    let broadcaster = Broadcaster::new(
        Arc::clone(&generator),
        Arc::clone(&registry),
        4,
        Duration::from_millis(80),
    );

    let before = generator.fingerprint();
    assert_eq!(broadcaster.tick(), TickOutcome::Idle);
    assert_eq!(generator.fingerprint(), before);
}

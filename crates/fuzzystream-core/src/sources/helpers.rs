//! Shared helpers used by the sensor implementations and the mixer.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::SensorError;

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Wall-clock time in seconds since the Unix epoch.
pub fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Monotonic time in seconds relative to a process-local epoch.
pub fn monotonic_secs() -> f64 {
    use std::sync::OnceLock;
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_secs_f64()
}

// ---------------------------------------------------------------------------
// Shared command utilities
// ---------------------------------------------------------------------------

/// Check if a command exists: an executable file at `name` when it contains
/// a path separator, otherwise an executable file in some `PATH` directory.
pub fn command_exists(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(Path::new(name));
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(name))))
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run a subprocess and return its stdout, bounded by `timeout`.
///
/// The child is killed if the deadline passes. A non-zero exit status is an
/// error, as is any failure to spawn.
pub async fn run_command(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<String, SensorError> {
    let child = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| SensorError::Timeout(timeout))??;

    if !output.status.success() {
        return Err(SensorError::ToolFailed {
            status: output.status,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

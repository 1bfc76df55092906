//! ExternalToolSensor: CPU temperature via a measurement utility.
//!
//! On a Raspberry Pi the firmware reports the SoC temperature through
//! `vcgencmd measure_temp`, which prints `temp=42.9'C`. The tool is invoked
//! once per read with a hard timeout so a wedged firmware mailbox cannot stall
//! the reseed loop.

use std::time::Duration;

use crate::error::SensorError;

use super::helpers::run_command;

/// Arguments passed to `vcgencmd`.
pub const MEASURE_TEMP_ARGS: &[&str] = &["measure_temp"];

/// Invokes an external program and parses `key=<value>'<unit>` from its output.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalToolSensor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalToolSensor {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// `vcgencmd measure_temp` (or a substitute program taking the same args).
    pub fn measure_temp(program: impl Into<String>, timeout: Duration) -> Self {
        Self::new(
            program,
            MEASURE_TEMP_ARGS.iter().map(|a| a.to_string()).collect(),
            timeout,
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn read(&self) -> Result<f64, SensorError> {
        let stdout = run_command(&self.program, &self.args, self.timeout).await?;
        parse_tool_output(&stdout)
    }
}

/// `"temp=42.9'C\n"` -> `42.9`
///
/// Takes the text between the first `=` and the next `'`.
pub fn parse_tool_output(out: &str) -> Result<f64, SensorError> {
    let parse_err = || SensorError::Parse {
        raw: out.trim().to_string(),
    };
    let (_, rest) = out.split_once('=').ok_or_else(parse_err)?;
    let value = rest.split('\'').next().unwrap_or(rest);
    value.trim().parse::<f64>().map_err(|_| parse_err())
}

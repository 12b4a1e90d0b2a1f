#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Process telemetry sources feeding the race.
//!
//! [`PsSampler`] shells out to `ps` once per poll and parses its columnar
//! output with [`parse_ps_output`]. Malformed rows are skipped one by one so
//! a single odd line never costs the whole batch.

use std::{
    io,
    process::{Command, ExitStatus},
    string::FromUtf8Error,
};

use htop_gear_core::{ProcessId, ProcessSample};
use thiserror::Error;

/// Arguments handed to `ps`; the column order is relied upon by the parser.
pub const PS_ARGS: [&str; 2] = ["-axo", "pid,pcpu,pmem,state,comm"];

const MIN_FIELDS: usize = 5;

/// Failure to obtain a batch of samples.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The sampling program could not be started.
    #[error("failed to run `{program}`")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The sampling program exited unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    ExitStatus {
        /// Program that failed.
        program: String,
        /// Exit status reported by the operating system.
        status: ExitStatus,
        /// Trimmed standard error output.
        stderr: String,
    },
    /// The sampling program produced output that is not UTF-8.
    #[error("`{program}` produced non UTF-8 output")]
    NonUtf8 {
        /// Program whose output was rejected.
        program: String,
        /// Decoding failure.
        #[source]
        source: FromUtf8Error,
    },
}

/// Source of process samples polled once per tick.
pub trait SampleProvider {
    /// Returns the current batch of samples.
    fn poll(&mut self) -> Result<Vec<ProcessSample>, SampleError>;
}

/// Sample provider backed by the `ps` utility.
#[derive(Clone, Debug)]
pub struct PsSampler {
    program: String,
}

impl PsSampler {
    /// Creates a sampler invoking `ps` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("ps")
    }

    /// Creates a sampler invoking the given executable with `ps` arguments.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleProvider for PsSampler {
    fn poll(&mut self) -> Result<Vec<ProcessSample>, SampleError> {
        let output = Command::new(&self.program)
            .args(PS_ARGS)
            .output()
            .map_err(|source| SampleError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SampleError::ExitStatus {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|source| SampleError::NonUtf8 {
            program: self.program.clone(),
            source,
        })?;
        let samples = parse_ps_output(&stdout);
        tracing::trace!(count = samples.len(), "sampled processes");
        Ok(samples)
    }
}

/// Parses `ps -axo pid,pcpu,pmem,state,comm` output.
///
/// The first line is treated as the header. Rows with fewer than five
/// fields or a non-numeric pid are skipped, unparsable CPU or memory
/// readings become `0`, and command names containing whitespace are
/// rejoined with single spaces.
#[must_use]
pub fn parse_ps_output(output: &str) -> Vec<ProcessSample> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let sample = parse_row(line);
            if sample.is_none() && !line.trim().is_empty() {
                tracing::trace!(row = line, "skipping malformed ps row");
            }
            sample
        })
        .collect()
}

fn parse_row(line: &str) -> Option<ProcessSample> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }
    let pid = fields[0].parse::<u32>().ok()?;
    let cpu = parse_percent(fields[1]);
    let mem = parse_percent(fields[2]);
    Some(ProcessSample::new(
        ProcessId::new(pid),
        cpu,
        mem,
        fields[3],
        fields[4..].join(" "),
    ))
}

fn parse_percent(field: &str) -> f32 {
    field
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

//! Configuration and trace loading.
//!
//! This module reads the JSON inputs of a run. It performs:
//! 1. **Config loading:** Parses a [`Config`] and validates it once.
//! 2. **Trace loading:** Parses a JSON array of [`TraceEntry`] records.

use std::fs;
use std::path::Path;

use super::traffic::TraceEntry;
use crate::common::SimError;
use crate::config::Config;

fn read(path: &Path) -> Result<String, SimError> {
    fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses and validates a JSON configuration.
///
/// # Errors
///
/// Returns [`SimError::Json`] for malformed input and [`SimError::Config`]
/// for a configuration that fails validation.
pub fn parse_config(text: &str) -> Result<Config, SimError> {
    let config: Config = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Reads and validates a JSON configuration file.
///
/// # Errors
///
/// Returns [`SimError::Io`] if the file cannot be read, otherwise as [`parse_config`].
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, SimError> {
    parse_config(&read(path.as_ref())?)
}

/// Parses a JSON trace.
///
/// # Errors
///
/// Returns [`SimError::Json`] for malformed input.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEntry>, SimError> {
    Ok(serde_json::from_str(text)?)
}

/// Reads a JSON trace file.
///
/// # Errors
///
/// Returns [`SimError::Io`] if the file cannot be read, otherwise as [`parse_trace`].
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceEntry>, SimError> {
    let path = path.as_ref();
    let trace = parse_trace(&read(path)?)?;
    tracing::info!(path = %path.display(), entries = trace.len(), "trace loaded");
    Ok(trace)
}

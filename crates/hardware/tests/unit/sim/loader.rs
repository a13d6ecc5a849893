//! # Loader Tests
//!
//! JSON configuration and trace files.

use std::io::Write;

use cohort_core::common::{ConfigError, SimError};
use cohort_core::config::EngineMode;
use cohort_core::sim::loader::{load_config, load_trace, parse_config, parse_trace};
use cohort_core::sim::{TraceCmd, TraceEntry};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn config_file_round_trips_units() {
    let file = file_with(
        r#"{
            "engine": {
                "latency": "20ns",
                "bandwidth": "1GB/s",
                "queue_base_addr": 2415919104,
                "mode": "PassThrough",
                "max_bandwidth_delay": "1us"
            },
            "requester": { "response_slots": 2, "consume_latency": "5ns" }
        }"#,
    );
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.engine.latency, 20_000);
    assert_eq!(config.engine.bandwidth, 1_000_000_000);
    assert_eq!(config.engine.queue_base_addr, Some(0x9000_0000));
    assert_eq!(config.engine.mode, EngineMode::PassThrough);
    assert_eq!(config.engine.max_bandwidth_delay, Some(1_000_000));
    assert_eq!(config.requester.response_slots, Some(2));
    assert_eq!(config.requester.consume_latency, 5_000);
}

#[test]
fn config_is_validated_on_load() {
    let err = parse_config(r#"{ "engine": {} }"#).unwrap_err();
    assert!(matches!(err, SimError::Config(ConfigError::MissingQueueBase)));
}

#[test]
fn malformed_json_is_reported() {
    assert!(matches!(parse_config("{"), Err(SimError::Json(_))));
    assert!(matches!(parse_trace("[{ \"cmd\": \"Read\" }]"), Err(SimError::Json(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match load_trace(&path) {
        Err(SimError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn trace_accepts_hex_addresses_and_aliases() {
    let file = file_with(
        r#"[
            { "cmd": "R", "addr": "0x9000_0040", "size": 64 },
            { "at": "10ns", "cmd": "write", "addr": 2415919104, "data": [1, 2, 3, 4] },
            { "cmd": "Read", "addr": "4096" }
        ]"#,
    );
    let trace = load_trace(file.path()).unwrap();
    assert_eq!(
        trace,
        vec![
            TraceEntry::read(0, 0x9000_0040, 64),
            TraceEntry::write(10_000, 0x9000_0000, vec![1, 2, 3, 4]),
            TraceEntry::read(0, 4096, 8),
        ]
    );
    assert_eq!(trace[1].cmd, TraceCmd::Write);
}

#[test]
fn unknown_trace_fields_are_rejected() {
    let err = parse_trace(r#"[{ "cmd": "Read", "addr": 0, "sizee": 8 }]"#).unwrap_err();
    assert!(matches!(err, SimError::Json(_)));
}

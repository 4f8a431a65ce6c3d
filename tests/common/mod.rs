// Common helpers for integration tests

#![allow(dead_code)]

use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;

use queuesplice::data::Track;
use queuesplice::queue::InMemoryQueue;

pub use serial_test::serial;

pub const DEVICE: &str = "memory";

// The queue used by most scenarios: A (3:00), B (3:20), C (2:30), D (3:30)
pub fn abcd_tracks() -> Vec<Track> {
    vec![
        Track::new("A", "A", 180_000),
        Track::new("B", "B", 200_000),
        Track::new("C", "C", 150_000),
        Track::new("D", "D", 210_000),
    ]
}

pub fn catalog() -> Vec<Track> {
    vec![
        Track::new("X", "Xanadu", 90_000).with_artists(&["Olivia Newton-John"]),
        Track::new("Y", "Yellow", 60_000).with_artists(&["Coldplay"]),
        Track::new("Z", "Zombie", 120_000).with_artists(&["The Cranberries"]),
    ]
}

pub fn song(id: &str) -> Track {
    catalog()
        .into_iter()
        .find(|t| t.key() == id)
        .unwrap_or_else(|| panic!("no catalog song {}", id))
}

pub fn abcd_queue() -> InMemoryQueue {
    InMemoryQueue::new(abcd_tracks()).with_catalog(catalog())
}

// Helper function to write a simulated queue file for the binary
pub fn write_simulated_queue() -> NamedTempFile {
    let track = |t: &Track| {
        json!({
            "id": t.id,
            "name": t.name,
            "duration_ms": t.duration_ms,
            "artists": t.artists,
            "uri": t.uri,
        })
    };
    let queue = json!({
        "devices": [{ "id": DEVICE, "name": "Simulator", "type": "Computer" }],
        "queue": abcd_tracks().iter().map(track).collect::<Vec<_>>(),
        "catalog": catalog().iter().map(track).collect::<Vec<_>>(),
    });

    let mut file = NamedTempFile::new().expect("Failed to create queue file");
    write!(file, "{}", queue).expect("Failed to write queue file");
    file
}

// Helper function to write a config file
pub fn write_config(config: &serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create config file");
    write!(file, "{}", config).expect("Failed to write config file");
    file
}

// Helper function to run the binary with the given arguments and stdin
pub fn run_queuesplice(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_queuesplice"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start queuesplice");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");

    child.wait_with_output().expect("Failed to wait for queuesplice")
}

pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

//! Tests for the markers subsystem.

use super::*;
use std::sync::{Arc, Barrier};
use tempfile::TempDir;

#[test]
fn test_marker_key_prefers_run_id() {
    assert_eq!(marker_key(Some("run-42"), Some(7)), Some("run-42".to_string()));
    assert_eq!(marker_key(None, Some(7)), Some("pid-7".to_string()));
    assert_eq!(marker_key(Some("  "), Some(7)), Some("pid-7".to_string()));
    assert_eq!(marker_key(None, None), None);
}

#[test]
fn test_marker_key_sanitizes_path_characters() {
    assert_eq!(
        marker_key(Some("../etc/passwd"), None),
        Some("_etc_passwd".to_string())
    );
    assert_eq!(
        marker_key(Some("2026-01-01T00:00:00Z"), None),
        Some("2026-01-01T00_00_00Z".to_string())
    );
}

#[test]
fn test_create_marker_once() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir.path().join(".markers"), "run-1");

    let first = create_marker(&path, &MarkerMetadata::new(Some("run-1"), Some(10))).unwrap();
    let second = create_marker(&path, &MarkerMetadata::new(Some("run-1"), Some(10))).unwrap();

    assert_eq!(first, MarkerOutcome::Created);
    assert_eq!(second, MarkerOutcome::AlreadyExists);

    let meta = read_marker(&path).unwrap();
    assert_eq!(meta.run_id.as_deref(), Some("run-1"));
    assert_eq!(meta.monitored_pid, Some(10));
    assert_eq!(meta.pid, std::process::id());
    assert!(meta.owner.contains('@'));
}

#[test]
fn test_concurrent_create_has_single_winner() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(temp_dir.path(), "race");
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                create_marker(&path, &MarkerMetadata::new(Some("race"), None)).unwrap()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|outcome| *outcome == MarkerOutcome::Created)
        .count();
    assert_eq!(winners, 1);
}

#[test]
fn test_read_marker_missing() {
    let temp_dir = TempDir::new().unwrap();
    assert!(read_marker(&temp_dir.path().join("absent.done")).is_none());
}

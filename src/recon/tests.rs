//! Tests for the status verifier.

use super::*;
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::incidents::read_batch;
use crate::test_support::{FakeProbe, TestWorkspace};
use std::sync::{Arc, Barrier};

fn write_status(ws: &TestWorkspace, json: &str) {
    let path = &ws.ctx.recon_status_path;
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, json).unwrap();
}

fn write_log(ws: &TestWorkspace) {
    let log = ws.root().join("recon").join("run.log");
    std::fs::create_dir_all(log.parent().unwrap()).unwrap();
    std::fs::write(log, "scanning...\n").unwrap();
}

fn verifier(ws: &TestWorkspace, probe: FakeProbe) -> StatusVerifier<FakeProbe> {
    StatusVerifier::with_probe(&ws.ctx, &ws.config, probe)
}

const RUNNING: &str = r#"{"running":true,"pid":4242,"logPath":"recon/run.log","startedAt":"2026-01-01T00:00:00Z","runId":"run-1","launcher":"nightly"}"#;

#[test]
fn test_missing_status_file() {
    let ws = TestWorkspace::new();
    let refresh = verifier(&ws, FakeProbe::new()).refresh().unwrap();

    assert!(!refresh.status.running);
    assert_eq!(refresh.status.reason, Some(StatusReason::StatusFileMissing));
    assert!(refresh.completion.is_none());
    assert!(ws.ctx.recon_status_path.exists());
}

#[test]
fn test_live_process_is_running() {
    let ws = TestWorkspace::new();
    write_status(&ws, RUNNING);
    write_log(&ws);
    let probe = FakeProbe::new().with_process(4242, "python3 recon.py --target lab");

    let refresh = verifier(&ws, probe).refresh().unwrap();

    assert!(refresh.status.running);
    assert_eq!(refresh.status.reason, None);
    assert!(refresh.completion.is_none());
    // Unknown launcher fields survive the rewrite.
    let on_disk = read_status(&ws.ctx.recon_status_path).unwrap();
    assert_eq!(on_disk.extra["launcher"], "nightly");
}

#[test]
fn test_failure_reasons_in_order() {
    let cases = [
        (r#"{"running":true,"runId":"a"}"#, FakeProbe::new(), StatusReason::PidMissing),
        (RUNNING, FakeProbe::new(), StatusReason::PidNotRunning),
        (
            RUNNING,
            FakeProbe::new().with_process(4242, "/usr/bin/postgres"),
            StatusReason::PidMismatch,
        ),
        (
            RUNNING,
            FakeProbe::new().with_process(4242, "python3 recon.py"),
            StatusReason::LogMissing,
        ),
    ];

    for (status, probe, expected) in cases {
        let ws = TestWorkspace::new();
        write_status(&ws, status);
        let refresh = verifier(&ws, probe).refresh().unwrap();
        assert!(!refresh.status.running);
        assert_eq!(refresh.status.reason, Some(expected));
    }
}

#[test]
fn test_finish_emits_one_incident_and_is_idempotent() {
    let ws = TestWorkspace::new();
    write_status(&ws, RUNNING);
    write_log(&ws);
    let probe = FakeProbe::new().with_process(4242, "python3 recon.py");
    let verifier = verifier(&ws, probe.clone());

    assert!(verifier.refresh().unwrap().status.running);

    probe.kill(4242);
    let finished = verifier.refresh().unwrap();
    assert!(!finished.status.running);
    assert_eq!(finished.status.reason, Some(StatusReason::PidNotRunning));
    assert!(finished.status.finished_at.is_some());

    let incident = finished.completion.expect("first pass after exit emits");
    assert_eq!(incident.id, "recon-complete-run-1");
    assert_eq!(incident.source, COMPLETION_SOURCE);
    assert_eq!(incident.summary, "Recon run run-1 finished");
    assert_eq!(incident.evidence, vec![serde_json::json!("recon/run.log")]);

    let finished_at = finished.status.finished_at.clone();
    for _ in 0..3 {
        let again = verifier.refresh().unwrap();
        assert!(again.completion.is_none());
        assert_eq!(again.status.finished_at, finished_at);
    }

    let batch = read_batch(&ws.ctx.incidents_path(), 0);
    assert_eq!(batch.records.len(), 1);
    assert!(ws.ctx.markers_dir.join("run-1.done").exists());
}

#[test]
fn test_uninspectable_host_leaves_status_alone() {
    let ws = TestWorkspace::new();
    write_status(&ws, RUNNING);
    write_log(&ws);

    let err = verifier(&ws, FakeProbe::unavailable()).refresh().unwrap_err();

    assert!(matches!(err, crate::error::WardenError::VerifierError(_)));
    assert_eq!(err.exit_code(), crate::exit_codes::USER_ERROR);
    assert_eq!(std::fs::read_to_string(&ws.ctx.recon_status_path).unwrap(), RUNNING);
    assert!(!ws.ctx.markers_dir.join("run-1.done").exists());
    assert!(read_batch(&ws.ctx.incidents_path(), 0).records.is_empty());
}

#[test]
fn test_launcher_reported_exit_is_carried_through() {
    let ws = TestWorkspace::new();
    write_status(
        &ws,
        r#"{"running":false,"pid":77,"finishedAt":"2026-01-02T03:04:05Z","exitCode":2}"#,
    );

    let refresh = verifier(&ws, FakeProbe::new()).refresh().unwrap();

    assert_eq!(
        refresh.status.finished_at.as_deref(),
        Some("2026-01-02T03:04:05Z")
    );
    let incident = refresh.completion.unwrap();
    assert_eq!(incident.id, "recon-complete-pid-77");
    assert_eq!(incident.summary, "Recon run pid 77 finished (exit code 2)");
    assert_eq!(incident.meta.unwrap()["exitCode"], 2);
}

#[test]
fn test_never_running_job_emits_nothing() {
    let ws = TestWorkspace::new();
    write_status(&ws, r#"{"running":false,"pid":5}"#);

    let refresh = verifier(&ws, FakeProbe::new()).refresh().unwrap();

    assert!(refresh.completion.is_none());
    assert!(!ws.ctx.incidents_path().exists());
}

#[test]
fn test_concurrent_refreshes_emit_once() {
    let ws = TestWorkspace::new();
    write_status(&ws, RUNNING);
    write_log(&ws);

    let verifier = Arc::new(verifier(&ws, FakeProbe::new()));
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                verifier.refresh().unwrap().completion.is_some()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|emitted| *emitted)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(read_batch(&ws.ctx.incidents_path(), 0).records.len(), 1);
}

#[test]
fn test_independent_verifiers_share_marker_state() {
    let ws = TestWorkspace::new();
    write_status(&ws, RUNNING);
    let first = StatusVerifier::with_probe(&ws.ctx, &ws.config, FakeProbe::new());
    assert!(first.refresh().unwrap().completion.is_some());

    // A second process sees the finished status and the marker.
    let ctx = WorkspaceContext::new(ws.root(), &Config::default());
    let second = StatusVerifier::with_probe(&ctx, &Config::default(), FakeProbe::new());
    assert!(second.refresh().unwrap().completion.is_none());
}

#[test]
fn test_sanitize_replaces_first_claim_and_drops_rest() {
    let status = ReconStatus {
        running: false,
        pid: Some(4242),
        run_id: Some("run-1".to_string()),
        reason: Some(StatusReason::PidNotRunning),
        ..ReconStatus::default()
    };
    let text = "Summary for today\nThe recon scan is still running.\nNotes: none\nRecon is active on the lab subnet\n";

    let sanitized = sanitize_claims(text, &status);

    assert_eq!(
        sanitized,
        "Summary for today\nRecon status (verified): not running (pid 4242, run run-1, pid-not-running)\nNotes: none\n"
    );
}

#[test]
fn test_sanitize_without_claims_is_unchanged() {
    let text = "Nothing to report.\nAll quiet.";
    assert_eq!(sanitize_claims(text, &ReconStatus::missing()), text);
}

#[test]
fn test_describe_running() {
    let status = ReconStatus {
        running: true,
        pid: Some(1),
        started_at: Some("2026-01-01T00:00:00Z".to_string()),
        ..ReconStatus::default()
    };
    assert_eq!(
        status.describe(),
        "Recon status (verified): running (pid 1, started 2026-01-01T00:00:00Z)"
    );
}

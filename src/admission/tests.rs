//! Tests for admission control.

use super::*;
use crate::config::{BudgetLimits, BudgetsConfig, EnforcementMode};
use crate::ledger::{LedgerStore, RunLedgerRecord};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

fn limits(configure: impl FnOnce(&mut BudgetLimits)) -> BudgetLimits {
    let mut limits = BudgetLimits::default();
    configure(&mut limits);
    limits
}

fn run(id: &str, agent: &str, job_type: &str, status: &str, minutes_ago: i64) -> RunLedgerRecord {
    let ts = now() - Duration::minutes(minutes_ago);
    RunLedgerRecord {
        id: id.to_string(),
        timestamp: ts,
        task_id: format!("incident:{}", id),
        agent_id: agent.to_string(),
        status: status.to_string(),
        command: "agent".to_string(),
        started_at: Some(ts),
        job_type: job_type.to_string(),
        meta: json!({}),
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

fn controller(temp_dir: &TempDir, budgets: BudgetsConfig) -> (AdmissionController, LedgerStore) {
    let store = LedgerStore::new(temp_dir.path());
    (AdmissionController::new(budgets, store.clone()), store)
}

fn request() -> AdmissionRequest {
    AdmissionRequest::new("ops", "recon-status").with_scope_id("inc-1")
}

#[test]
fn test_unbounded_allows_and_audits() {
    let temp_dir = TempDir::new().unwrap();
    let (controller, store) = controller(&temp_dir, BudgetsConfig::default());

    let outcome = controller.evaluate_at(&request(), now()).unwrap();

    assert_eq!(outcome.decision, AdmissionDecision::Allow);
    assert_eq!(outcome.scope, "none");
    let entries = store.budget_entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].scope_id.as_deref(), Some("inc-1"));
    assert!(entries[0].budget_snapshot.is_empty());
}

#[test]
fn test_zero_run_limit_denies_in_hard_mode() {
    let temp_dir = TempDir::new().unwrap();
    let budgets = BudgetsConfig {
        global: Some(limits(|l| l.run_limit = Some(0))),
        ..BudgetsConfig::default()
    };
    let (controller, store) = controller(&temp_dir, budgets);

    let outcome = controller.evaluate_at(&request(), now()).unwrap();

    assert_eq!(outcome.decision, AdmissionDecision::Deny);
    assert!(outcome.decision.blocks_dispatch());
    assert_eq!(outcome.scope, "global");
    assert!(outcome.reason_text().contains("runLimit"));

    let entry = &store.budget_entries().unwrap()[0];
    assert_eq!(entry.decision, AdmissionDecision::Deny);
    assert_eq!(entry.budget_snapshot[0].scope, "global");
}

#[test]
fn test_runs_in_window_are_counted() {
    let temp_dir = TempDir::new().unwrap();
    let budgets = BudgetsConfig {
        global: Some(limits(|l| {
            l.window = "1h".to_string();
            l.run_limit = Some(2);
        })),
        ..BudgetsConfig::default()
    };
    let (controller, store) = controller(&temp_dir, budgets);
    store.record_run(&run("r-old", "ops", "task", "done", 120)).unwrap();
    store.record_run(&run("r-1", "ops", "task", "done", 10)).unwrap();

    let outcome = controller.evaluate_at(&request(), now()).unwrap();
    assert_eq!(outcome.decision, AdmissionDecision::Warn);

    store.record_run(&run("r-2", "ops", "task", "done", 5)).unwrap();
    let outcome = controller.evaluate_at(&request(), now()).unwrap();
    assert_eq!(outcome.decision, AdmissionDecision::Deny);
}

#[test]
fn test_concurrency_violation_defers() {
    let temp_dir = TempDir::new().unwrap();
    let mut budgets = BudgetsConfig::default();
    budgets.by_agent.insert(
        "ops".to_string(),
        limits(|l| l.concurrency_limit = Some(1)),
    );
    budgets.enforcement.defer_minutes = 15;
    let (controller, store) = controller(&temp_dir, budgets);
    store.record_run(&run("r-1", "ops", "task", "running", 300)).unwrap();
    // A finished run does not count towards concurrency.
    store.record_run(&run("r-2", "ops", "task", "running", 30)).unwrap();
    store.record_run(&run("r-2", "ops", "task", "done", 20)).unwrap();

    let outcome = controller.evaluate_at(&request(), now()).unwrap();

    assert_eq!(outcome.decision, AdmissionDecision::Defer);
    assert_eq!(outcome.scope, "agent:ops");
    assert_eq!(outcome.retry_after, Some(now() + Duration::minutes(15)));
}

#[test]
fn test_soft_mode_downgrades_to_warn() {
    let temp_dir = TempDir::new().unwrap();
    let mut budgets = BudgetsConfig {
        global: Some(limits(|l| l.run_limit = Some(0))),
        ..BudgetsConfig::default()
    };
    budgets.enforcement.mode = EnforcementMode::Soft;
    let (controller, _) = controller(&temp_dir, budgets);

    let outcome = controller.evaluate_at(&request(), now()).unwrap();
    assert_eq!(outcome.decision, AdmissionDecision::Warn);
    assert!(!outcome.decision.blocks_dispatch());
}

#[test]
fn test_off_mode_allows_but_still_audits() {
    let temp_dir = TempDir::new().unwrap();
    let mut budgets = BudgetsConfig {
        global: Some(limits(|l| l.run_limit = Some(0))),
        ..BudgetsConfig::default()
    };
    budgets.enforcement.mode = EnforcementMode::Off;
    let (controller, store) = controller(&temp_dir, budgets);

    let outcome = controller.evaluate_at(&request(), now()).unwrap();

    assert_eq!(outcome.decision, AdmissionDecision::Allow);
    let entry = &store.budget_entries().unwrap()[0];
    assert_eq!(entry.budget_snapshot.len(), 1);
}

#[test]
fn test_tier_precedence_global_first() {
    let temp_dir = TempDir::new().unwrap();
    let mut budgets = BudgetsConfig {
        global: Some(limits(|l| l.concurrency_limit = Some(0))),
        ..BudgetsConfig::default()
    };
    budgets.by_job_type.insert(
        "recon-status".to_string(),
        limits(|l| l.run_limit = Some(0)),
    );
    let (controller, _) = controller(&temp_dir, budgets);

    // Global's concurrency violation decides before job type's run limit.
    let outcome = controller.evaluate_at(&request(), now()).unwrap();
    assert_eq!(outcome.scope, "global");
    assert_eq!(outcome.decision, AdmissionDecision::Defer);
}

#[test]
fn test_unrelated_tiers_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let mut budgets = BudgetsConfig::default();
    budgets
        .by_agent
        .insert("other".to_string(), limits(|l| l.run_limit = Some(0)));
    budgets
        .by_job_type
        .insert("task".to_string(), limits(|l| l.run_limit = Some(0)));
    let (controller, _) = controller(&temp_dir, budgets);

    let outcome = controller.evaluate_at(&request(), now()).unwrap();
    assert_eq!(outcome.decision, AdmissionDecision::Allow);
}

#[test]
fn test_query_limit_counts_prior_evaluations() {
    let temp_dir = TempDir::new().unwrap();
    let budgets = BudgetsConfig {
        global: Some(limits(|l| l.query_limit = Some(2))),
        ..BudgetsConfig::default()
    };
    let (controller, _) = controller(&temp_dir, budgets);

    let decisions: Vec<_> = (0..3)
        .map(|_| controller.evaluate_at(&request(), now()).unwrap().decision)
        .collect();
    assert_eq!(
        decisions,
        vec![
            AdmissionDecision::Allow,
            AdmissionDecision::Warn,
            AdmissionDecision::Deny
        ]
    );
}

#[test]
fn test_tokens_and_estimates() {
    let temp_dir = TempDir::new().unwrap();
    let budgets = BudgetsConfig {
        global: Some(limits(|l| {
            l.token_limit = Some(1000);
            l.max_runtime_seconds = Some(60);
        })),
        ..BudgetsConfig::default()
    };
    let (controller, store) = controller(&temp_dir, budgets);
    let mut spent = run("r-1", "ops", "task", "done", 10);
    spent.meta = json!({"tokens": 500});
    store.record_run(&spent).unwrap();

    let small = request().with_estimate(Estimate {
        tokens: Some(100),
        ..Estimate::default()
    });
    assert_eq!(
        controller.evaluate_at(&small, now()).unwrap().decision,
        AdmissionDecision::Allow
    );

    let large = request().with_estimate(Estimate {
        tokens: Some(600),
        ..Estimate::default()
    });
    assert_eq!(
        controller.evaluate_at(&large, now()).unwrap().decision,
        AdmissionDecision::Deny
    );

    let slow = request().with_estimate(Estimate {
        runtime_seconds: Some(120),
        ..Estimate::default()
    });
    let outcome = controller.evaluate_at(&slow, now()).unwrap();
    assert_eq!(outcome.decision, AdmissionDecision::Deny);
    assert!(outcome.reason_text().contains("maxRuntimeSeconds"));
}

#[test]
fn test_custom_thresholds() {
    let temp_dir = TempDir::new().unwrap();
    let mut budgets = BudgetsConfig {
        global: Some(limits(|l| l.run_limit = Some(10))),
        ..BudgetsConfig::default()
    };
    budgets.enforcement.warn_threshold_pct = 5;
    budgets.enforcement.hard_stop_threshold_pct = 200;
    let (controller, _) = controller(&temp_dir, budgets);

    // 1 run out of 10 is past 5% but far from 200%.
    let outcome = controller.evaluate_at(&request(), now()).unwrap();
    assert_eq!(outcome.decision, AdmissionDecision::Warn);
}

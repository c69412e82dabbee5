//! Tests for config functionality.

use crate::config::types::MirrorKind;
use crate::config::{Config, EnforcementMode, TrustTier};
use crate::incidents::Severity;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert!(config.orchestrator.enabled);
    assert!(config.orchestrator.routing.is_empty());
    assert_eq!(config.orchestrator.requester_session_key, "agent:main:main");
    assert_eq!(config.orchestrator.spawn_retry.max_attempts, 1);
    assert_eq!(config.budgets.enforcement.mode, EnforcementMode::Hard);
    assert_eq!(config.budgets.enforcement.warn_threshold_pct, 80);
    assert_eq!(config.budgets.enforcement.hard_stop_threshold_pct, 100);
    assert!(config.budgets.global.is_none());
    assert!(config.budgets.by_agent.is_empty());
    assert!(config.budgets.by_job_type.is_empty());
    assert!(!config.mission_control.kill_switch);
    assert_eq!(config.mission_control.ledger_dir, "mission-control");
    assert_eq!(config.mission_control.recon.status_path, "recon/status.json");
}

#[test]
fn test_parse_empty_yaml() {
    let config = Config::from_yaml("").unwrap();
    assert!(config.orchestrator.enabled);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
budgets:
  global:
    window: 1h
    runLimit: 10
    concurrencyLimit: 2
  byAgent:
    ops:
      runLimit: 3
  byJobType:
    recon-status:
      window: 7d
      tokenLimit: 50000
  enforcement:
    mode: soft
    deferMinutes: 5
    warnThresholdPct: 50
    hardStopThresholdPct: 120
missionControl:
  killSwitch: true
  ledgerDir: /var/lib/mc
  trust:
    defaultTier: untrusted
    sources:
      recon-status: trusted
  alerts:
    enabled: true
    minSeverity: medium
  incidents:
    autoCreateTasks: true
    minSeverity: high
  qa:
    requireReviewFor: [untrusted]
  recon:
    enabled: true
    processMarker: nmap
  mirror:
    enabled: true
    kind: webhook
    url: http://localhost:9000/hook
  rollup:
    enabled: true
    days: 7
orchestrator:
  enabled: false
  defaultAgentId: main
  routing:
    - id: recon
      sources: [recon-status]
      agentId: ops
      taskTemplate: "Review: {{summary}}"
      jobType: recon
  spawnRetry:
    maxAttempts: 3
    backoffMs: 250
gateway:
  url: http://gw:18789
  token: secret
"#;
    let config = Config::from_yaml(yaml).unwrap();

    let global = config.budgets.global.as_ref().unwrap();
    assert_eq!(global.window, "1h");
    assert_eq!(global.run_limit, Some(10));
    assert_eq!(global.concurrency_limit, Some(2));
    assert_eq!(config.budgets.by_agent["ops"].run_limit, Some(3));
    assert_eq!(config.budgets.by_agent["ops"].window, "24h");
    assert_eq!(
        config.budgets.by_job_type["recon-status"].token_limit,
        Some(50000)
    );
    assert_eq!(config.budgets.enforcement.mode, EnforcementMode::Soft);
    assert_eq!(config.budgets.enforcement.defer_minutes, 5);

    let mc = &config.mission_control;
    assert!(mc.kill_switch);
    assert_eq!(mc.ledger_dir, "/var/lib/mc");
    assert_eq!(mc.trust.tier_for("recon-status"), TrustTier::Trusted);
    assert_eq!(mc.trust.tier_for("web"), TrustTier::Untrusted);
    assert_eq!(mc.alerts.min_severity, Severity::Medium);
    assert!(mc.incidents.auto_create_tasks);
    assert_eq!(mc.qa.require_review_for, vec![TrustTier::Untrusted]);
    assert_eq!(mc.recon.process_marker, "nmap");
    assert_eq!(mc.recon.status_path, "recon/status.json");
    assert_eq!(mc.mirror.kind, MirrorKind::Webhook);
    assert_eq!(mc.rollup.days, 7);

    assert!(!config.orchestrator.enabled);
    assert_eq!(config.orchestrator.default_agent_id.as_deref(), Some("main"));
    let rule = &config.orchestrator.routing[0];
    assert_eq!(rule.id.as_deref(), Some("recon"));
    assert_eq!(rule.agent_id.as_deref(), Some("ops"));
    assert_eq!(rule.task_template.as_deref(), Some("Review: {{summary}}"));
    assert_eq!(config.orchestrator.spawn_retry.max_attempts, 3);
    assert_eq!(config.gateway.token.as_deref(), Some("secret"));
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
channels:
  telegram:
    enabled: true
orchestrator:
  futureSetting: 1
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert!(config.orchestrator.enabled);
}

#[test]
fn test_invalid_window_fails() {
    let yaml = r#"
budgets:
  global:
    window: fortnight
    runLimit: 1
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("budgets.global.window"));
}

#[test]
fn test_warn_above_hard_stop_fails() {
    let yaml = r#"
budgets:
  enforcement:
    warnThresholdPct: 90
    hardStopThresholdPct: 80
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("warnThresholdPct"));
}

#[test]
fn test_zero_retry_attempts_fails() {
    let yaml = r#"
orchestrator:
  spawnRetry:
    maxAttempts: 0
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("maxAttempts"));
}

#[test]
fn test_mirror_without_target_fails() {
    let yaml = r#"
missionControl:
  mirror:
    enabled: true
    kind: file
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("mirror"));
}

#[test]
fn test_empty_routing_agent_fails() {
    let yaml = r#"
orchestrator:
  routing:
    - sources: [web]
      agentId: "  "
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("routing[0]"));
}

#[test]
fn test_load_or_default_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_or_default(temp_dir.path().join("warden.yaml")).unwrap();
    assert!(config.orchestrator.enabled);
}

#[test]
fn test_load_reports_path_on_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("warden.yaml");
    std::fs::write(&path, "budgets: [not, a, map]\n").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.exit_code(), crate::exit_codes::CONFIG_ERROR);
}

#[test]
fn test_ledger_dir_resolution() {
    let mut config = Config::default();
    let root = Path::new("/ws");
    assert_eq!(config.ledger_dir(root), Path::new("/ws/mission-control"));

    config.mission_control.ledger_dir = "/abs/ledger".to_string();
    assert_eq!(config.ledger_dir(root), Path::new("/abs/ledger"));
}

#[test]
fn test_yaml_roundtrip_keeps_camel_case() {
    let config = Config::default();
    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("missionControl"));
    assert!(yaml.contains("requesterSessionKey"));
    Config::from_yaml(&yaml).unwrap();
}

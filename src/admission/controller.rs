//! Budget evaluation against the run and budget ledgers.

use super::types::{
    AdmissionDecision, AdmissionOutcome, AdmissionRequest, BudgetUsage, TierSnapshot,
};
use super::window::window_or_default;
use crate::config::{BudgetLimits, BudgetsConfig, EnforcementMode};
use crate::error::Result;
use crate::ledger::{BudgetLedgerRecord, LedgerStore, RUN_STATUS_RUNNING, RunLedgerRecord};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Scope recorded when no tier decided.
const NO_SCOPE: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Runs,
    Concurrency,
    Tokens,
    Queries,
    Runtime,
    OutputChars,
}

impl Metric {
    fn as_str(&self) -> &'static str {
        match self {
            Metric::Runs => "runLimit",
            Metric::Concurrency => "concurrencyLimit",
            Metric::Tokens => "tokenLimit",
            Metric::Queries => "queryLimit",
            Metric::Runtime => "maxRuntimeSeconds",
            Metric::OutputChars => "maxOutputChars",
        }
    }
}

/// Which ledger entries count against a tier.
enum TierFilter<'a> {
    Global,
    JobType(&'a str),
    Agent(&'a str),
}

impl TierFilter<'_> {
    fn matches(&self, agent_id: &str, job_type: &str) -> bool {
        match self {
            TierFilter::Global => true,
            TierFilter::JobType(expected) => job_type == *expected,
            TierFilter::Agent(expected) => agent_id == *expected,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Check {
    metric: Metric,
    projected: u64,
    limit: u64,
}

/// Evaluates budget tiers for one dispatch and audits every decision.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    budgets: BudgetsConfig,
    store: LedgerStore,
}

impl AdmissionController {
    pub fn new(budgets: BudgetsConfig, store: LedgerStore) -> Self {
        Self { budgets, store }
    }

    pub fn evaluate(&self, request: &AdmissionRequest) -> Result<AdmissionOutcome> {
        self.evaluate_at(request, Utc::now())
    }

    /// Evaluate `request` as of `now` and append the decision to the budget
    /// ledger.
    ///
    /// Tiers are checked global, then job type, then agent. The first tier
    /// with a violation decides; otherwise the first warning yields `warn`.
    pub fn evaluate_at(
        &self,
        request: &AdmissionRequest,
        now: DateTime<Utc>,
    ) -> Result<AdmissionOutcome> {
        let mut tiers: Vec<(String, &BudgetLimits, TierFilter<'_>)> = Vec::new();
        if let Some(global) = &self.budgets.global {
            tiers.push(("global".to_string(), global, TierFilter::Global));
        }
        if let Some(limits) = self.budgets.by_job_type.get(&request.job_type) {
            tiers.push((
                format!("jobType:{}", request.job_type),
                limits,
                TierFilter::JobType(&request.job_type),
            ));
        }
        if let Some(limits) = self.budgets.by_agent.get(&request.agent_id) {
            tiers.push((
                format!("agent:{}", request.agent_id),
                limits,
                TierFilter::Agent(&request.agent_id),
            ));
        }

        let (runs, queries) = if tiers.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (self.store.runs()?, self.store.budget_entries()?)
        };

        let enforcement = &self.budgets.enforcement;
        let mut snapshot = Vec::with_capacity(tiers.len());
        let mut violation: Option<(String, Vec<Check>)> = None;
        let mut warning: Option<(String, Check)> = None;

        for (scope, limits, filter) in &tiers {
            let window = window_or_default(&limits.window);
            let usage = tier_usage(&runs, &queries, filter, now - window);
            snapshot.push(TierSnapshot {
                scope: scope.clone(),
                window: limits.window.clone(),
                limits: (*limits).clone(),
                usage,
            });

            let checks = checks_for(limits, &usage, request);
            let violated: Vec<Check> = checks
                .iter()
                .filter(|c| exceeds(c, enforcement.hard_stop_threshold_pct))
                .copied()
                .collect();

            if !violated.is_empty() {
                if violation.is_none() {
                    violation = Some((scope.clone(), violated));
                }
            } else if warning.is_none()
                && let Some(check) = checks
                    .into_iter()
                    .find(|c| exceeds(c, enforcement.warn_threshold_pct))
            {
                warning = Some((scope.clone(), check));
            }
        }

        let outcome = match (enforcement.mode, violation, warning) {
            (EnforcementMode::Off, _, _) => AdmissionOutcome {
                decision: AdmissionDecision::Allow,
                reason: None,
                scope: NO_SCOPE.to_string(),
                retry_after: None,
            },
            (mode, Some((scope, violated)), _) => {
                let concurrency_only = violated.iter().all(|c| c.metric == Metric::Concurrency);
                let decision = match mode {
                    EnforcementMode::Soft => AdmissionDecision::Warn,
                    _ if concurrency_only => AdmissionDecision::Defer,
                    _ => AdmissionDecision::Deny,
                };
                let retry_after = (decision == AdmissionDecision::Defer)
                    .then(|| now + Duration::minutes(enforcement.defer_minutes as i64));
                AdmissionOutcome {
                    decision,
                    reason: Some(describe(&scope, &violated[0], "exceeds")),
                    scope,
                    retry_after,
                }
            }
            (_, None, Some((scope, check))) => AdmissionOutcome {
                decision: AdmissionDecision::Warn,
                reason: Some(describe(&scope, &check, "nearing")),
                scope,
                retry_after: None,
            },
            (_, None, None) => AdmissionOutcome {
                decision: AdmissionDecision::Allow,
                reason: None,
                scope: NO_SCOPE.to_string(),
                retry_after: None,
            },
        };

        self.store.record_budget(&BudgetLedgerRecord {
            timestamp: now,
            scope: outcome.scope.clone(),
            decision: outcome.decision,
            reason: outcome.reason.clone(),
            budget_snapshot: snapshot,
            scope_id: request.scope_id.clone(),
            agent_id: request.agent_id.clone(),
            job_type: request.job_type.clone(),
        })?;

        if outcome.decision != AdmissionDecision::Allow {
            tracing::info!(
                agent_id = %request.agent_id,
                job_type = %request.job_type,
                decision = %outcome.decision,
                scope = %outcome.scope,
                reason = outcome.reason.as_deref(),
                "admission decision"
            );
        }
        Ok(outcome)
    }
}

fn tier_usage(
    runs: &[RunLedgerRecord],
    queries: &[BudgetLedgerRecord],
    filter: &TierFilter<'_>,
    since: DateTime<Utc>,
) -> BudgetUsage {
    // Newest entry per run id, plus when the run first appeared.
    let mut newest: HashMap<&str, (&RunLedgerRecord, DateTime<Utc>)> = HashMap::new();
    for run in runs
        .iter()
        .filter(|r| filter.matches(&r.agent_id, &r.job_type))
    {
        let first_seen = run.started_at.unwrap_or(run.timestamp);
        newest
            .entry(run.id.as_str())
            .and_modify(|(latest, first)| {
                *latest = run;
                *first = (*first).min(first_seen);
            })
            .or_insert((run, first_seen));
    }

    let mut usage = BudgetUsage::default();
    for (latest, started) in newest.values() {
        if *started >= since {
            usage.runs += 1;
        }
        if latest.status == RUN_STATUS_RUNNING {
            usage.concurrent += 1;
        }
        if latest.timestamp >= since {
            usage.tokens += latest.tokens();
        }
    }
    usage.queries = queries
        .iter()
        .filter(|q| q.timestamp >= since && filter.matches(&q.agent_id, &q.job_type))
        .count() as u64;
    usage
}

fn checks_for(limits: &BudgetLimits, usage: &BudgetUsage, request: &AdmissionRequest) -> Vec<Check> {
    let estimate = &request.estimate;
    let mut checks = Vec::new();
    let mut push = |metric, projected, limit: Option<u64>| {
        if let Some(limit) = limit {
            checks.push(Check {
                metric,
                projected,
                limit,
            });
        }
    };

    push(Metric::Runs, usage.runs + 1, limits.run_limit);
    push(Metric::Concurrency, usage.concurrent + 1, limits.concurrency_limit);
    push(
        Metric::Tokens,
        usage.tokens + estimate.tokens.unwrap_or(0),
        limits.token_limit,
    );
    push(Metric::Queries, usage.queries + 1, limits.query_limit);
    if let Some(runtime) = estimate.runtime_seconds {
        push(Metric::Runtime, runtime, limits.max_runtime_seconds);
    }
    if let Some(chars) = estimate.output_chars {
        push(Metric::OutputChars, chars, limits.max_output_chars);
    }
    checks
}

/// `projected > limit * pct / 100`, without rounding.
fn exceeds(check: &Check, pct: u32) -> bool {
    u128::from(check.projected) * 100 > u128::from(check.limit) * u128::from(pct)
}

fn describe(scope: &str, check: &Check, verb: &str) -> String {
    format!(
        "{} {} {} limit ({}/{})",
        scope,
        check.metric.as_str(),
        verb,
        check.projected,
        check.limit
    )
}

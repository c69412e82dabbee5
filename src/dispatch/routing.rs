//! Incident routing rules.

use crate::incidents::{IncidentRecord, Severity};
use serde::{Deserialize, Serialize};

/// One entry of `orchestrator.routing`. Rules are tried in declared order;
/// the first whose predicates all hold wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Incident sources this rule accepts. Empty accepts any source.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Severities this rule accepts. Empty accepts any severity.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub severities: Vec<Severity>,

    /// Case-insensitive substring the summary must contain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_contains: Option<String>,

    /// Target agent. Falls back to `orchestrator.defaultAgentId`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Task text with `{{placeholder}}` substitution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_template: Option<String>,

    /// Budget job type. Falls back to the incident source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
}

/// A single condition of a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RulePredicate<'a> {
    Source(&'a [String]),
    Severity(&'a [Severity]),
    SummaryContains(&'a str),
}

impl RulePredicate<'_> {
    pub fn holds(&self, incident: &IncidentRecord) -> bool {
        match self {
            RulePredicate::Source(sources) => sources.iter().any(|s| *s == incident.source),
            RulePredicate::Severity(severities) => severities.contains(&incident.severity),
            RulePredicate::SummaryContains(needle) => incident
                .summary
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

impl RoutingRule {
    /// The conditions this rule actually constrains. Unset fields are
    /// wildcards and produce no predicate.
    pub fn predicates(&self) -> Vec<RulePredicate<'_>> {
        let mut predicates = Vec::new();
        if !self.sources.is_empty() {
            predicates.push(RulePredicate::Source(&self.sources));
        }
        if !self.severities.is_empty() {
            predicates.push(RulePredicate::Severity(&self.severities));
        }
        if let Some(needle) = self.summary_contains.as_deref()
            && !needle.is_empty()
        {
            predicates.push(RulePredicate::SummaryContains(needle));
        }
        predicates
    }

    /// Agent id named by this rule, if non-blank.
    pub fn agent(&self) -> Option<&str> {
        self.agent_id.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Whether `rule` accepts `incident`.
pub fn matches(rule: &RoutingRule, incident: &IncidentRecord) -> bool {
    rule.predicates().iter().all(|p| p.holds(incident))
}

/// First rule in `rules` accepting `incident`.
pub fn route<'a>(rules: &'a [RoutingRule], incident: &IncidentRecord) -> Option<&'a RoutingRule> {
    rules.iter().find(|rule| matches(rule, incident))
}

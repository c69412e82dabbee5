//! The incident record shape.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Incident severity. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    /// Map a producer's severity label onto the three known levels.
    ///
    /// Producers are not consistent (`critical`, `info`, `warning`), and an
    /// unfamiliar label must not cost us the whole incident.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" | "error" => Severity::High,
            "low" | "info" | "debug" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => Severity::parse_lenient(&s),
            _ => Severity::Medium,
        })
    }
}

/// An immutable record describing something noteworthy that happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub id: String,

    /// Timestamp as written by the producer (RFC3339 expected).
    #[serde(default, alias = "timestamp", skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,

    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

fn default_source() -> String {
    "unknown".to_string()
}

impl IncidentRecord {
    /// Create an incident stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        severity: Severity,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            ts: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            source: source.into(),
            severity,
            summary: summary.into(),
            evidence: Vec::new(),
            meta: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<Value>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Parsed timestamp, when the producer wrote a valid RFC3339 value.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.ts
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Evidence rendered as one comma-separated string.
    pub fn evidence_text(&self) -> String {
        self.evidence
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Meta rendered as compact JSON (empty when absent).
    pub fn meta_text(&self) -> String {
        self.meta.as_ref().map(Value::to_string).unwrap_or_default()
    }
}

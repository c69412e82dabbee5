//! `{{placeholder}}` substitution for task text.
//!
//! - `{{name}}` is replaced by the value of `name`
//! - whitespace inside the braces is ignored (`{{ name }}`)
//! - unknown placeholders and unterminated `{{` are left as written

use crate::incidents::IncidentRecord;
use crate::ledger::TaskRecord;
use std::collections::HashMap;

/// Render `template`, substituting every known `{{name}}`.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            result.push_str(&rest[open..]);
            return result;
        };

        let name = after_open[..close].trim();
        match variables.get(name) {
            Some(value) if !name.is_empty() => result.push_str(value),
            _ => result.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after_open[close + 2..];
    }

    result.push_str(rest);
    result
}

/// Helper to create a variables map from a list of key-value pairs.
pub fn vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Placeholders available to incident routing templates.
pub fn incident_vars(incident: &IncidentRecord) -> HashMap<String, String> {
    vars([
        ("id", incident.id.clone()),
        ("ts", incident.ts.clone().unwrap_or_default()),
        ("source", incident.source.clone()),
        ("severity", incident.severity.to_string()),
        ("summary", incident.summary.clone()),
        ("evidence", incident.evidence_text()),
        ("meta", incident.meta_text()),
    ])
}

/// Default task text for an incident without a rule template.
pub fn default_incident_text(incident: &IncidentRecord) -> String {
    format!(
        "Incident {} ({}): {}",
        incident.id, incident.severity, incident.summary
    )
}

/// Task text for a ledger task.
pub fn task_text(task: &TaskRecord) -> String {
    let mut text = format!("Task {} ({}): {}", task.id, task.priority, task.title);
    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        text.push_str("\n\n");
        text.push_str(description);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incidents::Severity;
    use serde_json::json;

    #[test]
    fn test_simple_substitution() {
        let vars = vars([("name", "Alice"), ("task", "coding")]);
        assert_eq!(
            render_template("Hello {{name}}, your task is {{ task }}.", &vars),
            "Hello Alice, your task is coding."
        );
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        let vars = vars([("summary", "ports open")]);
        assert_eq!(
            render_template("{{summary}} / {{owner}} / {{}}", &vars),
            "ports open / {{owner}} / {{}}"
        );
    }

    #[test]
    fn test_unterminated_and_single_braces() {
        let vars = vars([("a", "1")]);
        assert_eq!(render_template("{a} {{a}} {{a", &vars), "{a} 1 {{a");
        assert_eq!(render_template("no placeholders", &vars), "no placeholders");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let vars = vars([("a", "{{b}}"), ("b", "x")]);
        assert_eq!(render_template("{{a}}", &vars), "{{b}}");
    }

    #[test]
    fn test_incident_vars() {
        let incident = IncidentRecord::new("inc-9", "recon-status", Severity::High, "Recon done")
            .with_evidence(vec![json!("/tmp/scan.log")])
            .with_meta(json!({"runId": "r1"}));

        let rendered = render_template(
            "[{{severity}}] {{source}}/{{id}}: {{summary}} ({{evidence}}) {{meta}}",
            &incident_vars(&incident),
        );
        assert_eq!(
            rendered,
            "[high] recon-status/inc-9: Recon done (/tmp/scan.log) {\"runId\":\"r1\"}"
        );
        assert_eq!(default_incident_text(&incident), "Incident inc-9 (high): Recon done");
    }
}

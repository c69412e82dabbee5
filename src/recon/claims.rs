//! Replacing unverified liveness claims in agent-authored text.

use super::status::ReconStatus;
use regex::Regex;
use std::sync::LazyLock;

/// A line mentioning the monitored job together with a liveness word.
static CLAIM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(recon|scan)\w*\b.*\b(running|in progress|underway|active|still going|finished|completed|done)\b|\b(running|in progress|underway|active|still going|finished|completed|done)\b.*\b(recon|scan)\w*\b",
    )
    .expect("claim regex is valid")
});

/// Replace liveness claims about the monitored job with the verified status.
///
/// The first claim line becomes `status.describe()`; later claim lines are
/// dropped. Text without a claim comes back unchanged.
pub fn sanitize_claims(text: &str, status: &ReconStatus) -> String {
    if !text.lines().any(|line| CLAIM_RE.is_match(line)) {
        return text.to_string();
    }

    let verified = status.describe();
    let mut replaced = false;
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines() {
        if CLAIM_RE.is_match(line) {
            if !replaced {
                out.push(&verified);
                replaced = true;
            }
            continue;
        }
        out.push(line);
    }

    let mut result = out.join("\n");
    if text.ends_with('\n') {
        result.push('\n');
    }
    result
}

//! Pre-LLM override rules.
//!
//! Some memos are known to be safe no matter what the model thinks. A
//! matching rule decides the label directly and the completion call is
//! skipped entirely.

use tracing::debug;

use crate::pipeline::types::{ClassifiedRecord, Label};

/// A literal memo substring that forces a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRule {
    /// Substring searched for in the memo (case-sensitive).
    pub needle: String,
    /// Label assigned on match.
    pub label: Label,
    /// Why this rule exists.
    pub reason: String,
}

/// Ordered set of override rules; the first match wins. `Default` holds no
/// rules.
#[derive(Debug, Clone, Default)]
pub struct OverrideRules {
    rules: Vec<OverrideRule>,
}

impl OverrideRules {
    /// The built-in rules.
    pub fn default_rules() -> Self {
        Self {
            rules: vec![OverrideRule {
                needle: "New user card fee".into(),
                label: Label::Safe,
                reason: "card issuance fee memo is always derivable".into(),
            }],
        }
    }

    /// Return the first rule whose needle occurs in the record's memo.
    pub fn evaluate(&self, record: &ClassifiedRecord) -> Option<&OverrideRule> {
        let rule = self
            .rules
            .iter()
            .find(|rule| record.memo.contains(rule.needle.as_str()))?;
        debug!(
            memo = %record.memo,
            label = %rule.label,
            reason = %rule.reason,
            "Override rule matched, skipping completion call"
        );
        Some(rule)
    }
}

//! Shared types for the dataset pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Transaction export ──────────────────────────────────────────────

/// One row of the transaction export.
///
/// The description has its whitespace collapsed and the memo is trimmed,
/// so equal transactions compare equal regardless of export padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: String,
    pub description: String,
    /// Signed amount in cents; debits are negative.
    pub amount_cents: i64,
    pub memo: String,
}

impl TransactionRecord {
    pub fn amount_dollars(&self) -> f64 {
        self.amount_cents as f64 / 100.0
    }

    pub fn is_debit(&self) -> bool {
        self.amount_cents < 0
    }

    /// The cache key for this transaction.
    pub fn to_classified(&self) -> ClassifiedRecord {
        ClassifiedRecord {
            description: self.description.clone(),
            memo: self.memo.clone(),
            amount_dollars: self.amount_dollars(),
        }
    }
}

// ── Classified record ───────────────────────────────────────────────

/// A transaction stored in the safe or unsafe cache.
///
/// Identity is the whole (description, memo, amount) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedRecord {
    pub description: String,
    pub memo: String,
    pub amount_dollars: f64,
}

// ── Label ───────────────────────────────────────────────────────────

/// Whether a memo can be learned from its description alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// The description carries everything the memo says.
    Safe,
    /// The memo needs context the description does not have.
    Unsafe,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Safe => "Safe",
            Label::Unsafe => "Unsafe",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ── Training example ────────────────────────────────────────────────

/// One line of the fine-tuning JSONL file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub prompt: String,
    pub completion: String,
}

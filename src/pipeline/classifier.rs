//! Memo classifier — decides whether a memo is safe to train on.
//!
//! Flow for one record:
//! 1. Override rules (no LLM) → may decide directly
//! 2. Single-token completion: "Does the memo need extra context?"
//!
//! Eligibility and cache checks happen before this, in the runner.

use std::sync::Arc;

use tracing::debug;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, LlmProvider};
use crate::pipeline::emoji::starts_with_emoji;
use crate::pipeline::rules::OverrideRules;
use crate::pipeline::types::{ClassifiedRecord, Label, TransactionRecord};

/// The model answers with exactly one token.
const CLASSIFY_MAX_TOKENS: u32 = 1;

/// Greedy decoding so the same pair always gets the same answer.
const CLASSIFY_TEMPERATURE: f32 = 0.0;

const CLASSIFY_TOP_P: f32 = 1.0;

/// The answer token meaning "needs extra context".
const NEEDS_CONTEXT_ANSWER: &str = "Yes";

/// Outcome of classifying one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub label: Label,
    /// Decided by an override rule rather than the model.
    pub overridden: bool,
}

/// Labels eligible records using override rules, then the LLM.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    rules: OverrideRules,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>, rules: OverrideRules) -> Self {
        Self { llm, rules }
    }

    /// A record is eligible when its memo starts with an emoji and it is a debit.
    pub fn is_eligible(record: &TransactionRecord) -> bool {
        record.is_debit() && starts_with_emoji(&record.memo)
    }

    /// Classify one record.
    pub async fn classify(&self, record: &ClassifiedRecord) -> Result<Classification, LlmError> {
        if let Some(rule) = self.rules.evaluate(record) {
            return Ok(Classification {
                label: rule.label,
                overridden: true,
            });
        }

        let request = CompletionRequest::new(build_prompt(&record.description, &record.memo))
            .with_max_tokens(CLASSIFY_MAX_TOKENS)
            .with_temperature(CLASSIFY_TEMPERATURE)
            .with_top_p(CLASSIFY_TOP_P);

        let response = self.llm.complete(request).await?;
        let label = parse_answer(&response.text);
        debug!(
            memo = %record.memo,
            answer = %response.text.trim(),
            finish_reason = response.finish_reason.as_deref().unwrap_or("-"),
            label = %label,
            "Model classified memo"
        );

        Ok(Classification {
            label,
            overridden: false,
        })
    }
}

/// The fixed classification prompt.
pub fn build_prompt(description: &str, memo: &str) -> String {
    format!(
        "I'm mapping bank account transaction descriptions to human readable memos. \
         Tell me if the memo includes information that is not included in the transaction \
         description and needs extra context.\n\
         \n\
         Transaction Description: {description}\n\
         Human-Readable Memo: {memo}\n\
         Needs Extra Context (Yes/No):"
    )
}

/// Only an exact "Yes" marks the memo unsafe.
pub fn parse_answer(text: &str) -> Label {
    if text.trim() == NEEDS_CONTEXT_ANSWER {
        Label::Unsafe
    } else {
        Label::Safe
    }
}

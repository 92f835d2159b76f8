//! Prompt/completion formatting for the fine-tuning file.

use crate::pipeline::types::{ClassifiedRecord, TrainingExample};

/// Marks the end of every prompt; the model learns to continue after it.
pub const PROMPT_SUFFIX: &str = "Human-Readable Memo:";

/// Build the training example for one record.
///
/// Stored debits are negative, so the amount is negated to read as spend.
/// The completion starts with a space, as the fine-tuning format expects.
pub fn to_training_example(record: &ClassifiedRecord) -> TrainingExample {
    TrainingExample {
        prompt: format!(
            "Amount: ${:.2}\nTransaction Description: {}\n{PROMPT_SUFFIX}",
            -record.amount_dollars, record.description
        ),
        completion: format!(" {}", record.memo),
    }
}

/// Serialize examples as JSONL: one object per line, no trailing newline.
pub fn to_jsonl(examples: &[TrainingExample]) -> Result<String, serde_json::Error> {
    let lines = examples
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

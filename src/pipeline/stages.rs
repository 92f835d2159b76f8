//! File-to-file pipeline stages.
//!
//! Every stage reads the previous stage's output from the data directory
//! and writes its own, so stages can be rerun independently:
//!
//! | stage      | reads                        | writes                          |
//! |------------|------------------------------|---------------------------------|
//! | `classify` | txs.tsv, safe/unsafe.json    | safe.json, unsafe.json          |
//! | `emojifix` | safe.json                    | safe-emojifix.json              |
//! | `sample`   | safe-emojifix.json           | safe-deduped.json               |
//! | `format`   | safe-deduped.json            | finetuning.jsonl                |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::config::{DataPaths, PipelineConfig};
use crate::error::{ConfigError, Error, PipelineError, Result, StoreError};
use crate::llm::LlmProvider;
use crate::pipeline::classifier::Classifier;
use crate::pipeline::emoji::normalize_records;
use crate::pipeline::formatter::{to_jsonl, to_training_example};
use crate::pipeline::loader::load_transactions;
use crate::pipeline::rules::OverrideRules;
use crate::pipeline::runner::{ClassifySummary, classify_all};
use crate::pipeline::sampler::sample_by_memo;
use crate::store::ClassificationCache;
use crate::store::json_file::{read_records, write_records};

/// A runnable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    EmojiFix,
    Sample,
    Format,
    /// Every stage in order.
    All,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classify => "classify",
            Stage::EmojiFix => "emojifix",
            Stage::Sample => "sample",
            Stage::Format => "format",
            Stage::All => "all",
        }
    }

    /// Whether the stage calls the completion API.
    pub fn needs_llm(&self) -> bool {
        matches!(self, Stage::Classify | Stage::All)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classify" => Ok(Stage::Classify),
            "emojifix" | "emoji-fix" => Ok(Stage::EmojiFix),
            "sample" => Ok(Stage::Sample),
            "format" => Ok(Stage::Format),
            "all" => Ok(Stage::All),
            other => Err(format!(
                "unknown stage {other:?} (expected classify, emojifix, sample, format or all)"
            )),
        }
    }
}

/// Run `stage` (or all stages) against the configured data directory.
pub async fn run_stage(
    stage: Stage,
    config: &PipelineConfig,
    llm: Option<Arc<dyn LlmProvider>>,
) -> Result<()> {
    info!(stage = %stage, dir = %config.paths.dir().display(), "Running stage");

    match stage {
        Stage::Classify => {
            classify_stage(config, require_llm(llm)?).await?;
        }
        Stage::EmojiFix => {
            emojifix_stage(&config.paths).await?;
        }
        Stage::Sample => {
            sample_stage(config).await?;
        }
        Stage::Format => {
            format_stage(&config.paths).await?;
        }
        Stage::All => {
            classify_stage(config, require_llm(llm)?).await?;
            emojifix_stage(&config.paths).await?;
            sample_stage(config).await?;
            format_stage(&config.paths).await?;
        }
    }
    Ok(())
}

fn require_llm(llm: Option<Arc<dyn LlmProvider>>) -> Result<Arc<dyn LlmProvider>> {
    llm.ok_or_else(|| Error::Config(ConfigError::MissingEnvVar("OPENAI_API_KEY".into())))
}

/// Classify the export into the safe/unsafe caches.
pub async fn classify_stage(
    config: &PipelineConfig,
    llm: Arc<dyn LlmProvider>,
) -> Result<ClassifySummary> {
    let cache = ClassificationCache::open(&config.paths).await?;
    let records = load_transactions(&config.paths.transactions()).await?;
    let classifier = Arc::new(Classifier::new(llm, OverrideRules::default_rules()));

    let output = classify_all(classifier, cache, records, config.max_in_flight).await?;
    Ok(output.summary)
}

/// Normalize emoji spacing in the safe cache. Returns the record count.
pub async fn emojifix_stage(paths: &DataPaths) -> Result<usize> {
    let records = read_records(&paths.safe_cache()).await?;
    let fixed = normalize_records(records)?;
    write_records(&paths.emoji_fix(), &fixed).await?;
    info!(count = fixed.len(), path = %paths.emoji_fix().display(), "Wrote normalized memos");
    Ok(fixed.len())
}

/// Cap records per memo. Returns the number kept.
pub async fn sample_stage(config: &PipelineConfig) -> Result<usize> {
    let paths = &config.paths;
    let records = read_records(&paths.emoji_fix()).await?;
    info!("Total count: {}", records.len());

    let mut rng = match config.sample_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let kept = sample_by_memo(records, config.sample_cap, &mut rng);

    info!("New count: {}", kept.len());
    write_records(&paths.deduped(), &kept).await?;
    Ok(kept.len())
}

/// Write the fine-tuning JSONL. Returns the number of examples.
pub async fn format_stage(paths: &DataPaths) -> Result<usize> {
    let records = read_records(&paths.deduped()).await?;
    let examples: Vec<_> = records.iter().map(to_training_example).collect();
    let jsonl = to_jsonl(&examples).map_err(PipelineError::Serialize)?;

    let path = paths.finetuning();
    tokio::fs::write(&path, jsonl)
        .await
        .map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;
    info!(count = examples.len(), path = %path.display(), "Wrote fine-tuning examples");
    Ok(examples.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::ClassifiedRecord;

    fn record(memo: &str, description: &str, amount: f64) -> ClassifiedRecord {
        ClassifiedRecord {
            description: description.into(),
            memo: memo.into(),
            amount_dollars: amount,
        }
    }

    #[test]
    fn stage_names_parse() {
        assert_eq!("classify".parse::<Stage>().unwrap(), Stage::Classify);
        assert_eq!(" EmojiFix ".parse::<Stage>().unwrap(), Stage::EmojiFix);
        assert_eq!("emoji-fix".parse::<Stage>().unwrap(), Stage::EmojiFix);
        assert_eq!("sample".parse::<Stage>().unwrap(), Stage::Sample);
        assert_eq!("format".parse::<Stage>().unwrap(), Stage::Format);
        assert_eq!("all".parse::<Stage>().unwrap(), Stage::All);
        assert!("train".parse::<Stage>().is_err());
    }

    #[test]
    fn only_classifying_stages_need_llm() {
        assert!(Stage::Classify.needs_llm());
        assert!(Stage::All.needs_llm());
        assert!(!Stage::EmojiFix.needs_llm());
        assert!(!Stage::Sample.needs_llm());
        assert!(!Stage::Format.needs_llm());
    }

    #[tokio::test]
    async fn classify_without_provider_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            paths: DataPaths::new(dir.path()),
            ..Default::default()
        };
        let err = run_stage(Stage::Classify, &config, None).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingEnvVar(_))));
    }

    #[tokio::test]
    async fn emojifix_fails_on_bad_memo() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        write_records(&paths.safe_cache(), &[record("Coffee", "CAFE", -3.5)])
            .await
            .unwrap();

        let err = emojifix_stage(&paths).await.unwrap_err();
        assert!(matches!(err, Error::Pipeline(PipelineError::EmojiMismatch { .. })));
        assert!(!paths.emoji_fix().exists());
    }

    #[tokio::test]
    async fn sample_stage_respects_cap_and_seed() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            paths: DataPaths::new(dir.path()),
            sample_cap: 2,
            sample_seed: Some(11),
            ..Default::default()
        };
        let records: Vec<_> = (0..5)
            .map(|i| record("☕️ Coffee", &format!("CAFE {i}"), -3.5))
            .chain(std::iter::once(record("🛒 Groceries", "ACME", -42.5)))
            .collect();
        write_records(&config.paths.emoji_fix(), &records).await.unwrap();

        assert_eq!(sample_stage(&config).await.unwrap(), 3);
        let first = read_records(&config.paths.deduped()).await.unwrap();

        sample_stage(&config).await.unwrap();
        let second = read_records(&config.paths.deduped()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn format_stage_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        write_records(
            &paths.deduped(),
            &[record("🛒 Groceries", "ACME STORE 123", -42.5)],
        )
        .await
        .unwrap();

        assert_eq!(format_stage(&paths).await.unwrap(), 1);
        let content = std::fs::read_to_string(paths.finetuning()).unwrap();
        assert_eq!(
            content,
            r#"{"prompt":"Amount: $42.50\nTransaction Description: ACME STORE 123\nHuman-Readable Memo:","completion":" 🛒 Groceries"}"#
        );
    }
}

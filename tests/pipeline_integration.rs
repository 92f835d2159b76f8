//! End-to-end pipeline tests against a temporary data directory.
//!
//! The completion API is replaced by a stub provider, so every stage runs
//! for real except the network call.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use memo_tune::config::{DataPaths, PipelineConfig};
use memo_tune::error::{Error, LlmError, PipelineError};
use memo_tune::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use memo_tune::pipeline::stages::{Stage, classify_stage, run_stage};
use memo_tune::pipeline::types::{ClassifiedRecord, TrainingExample};
use memo_tune::store::json_file::read_records;

/// Stub provider: answers "Yes" for memos containing `unsafe_marker`,
/// fails for memos containing `fail_marker`, "No" otherwise.
struct StubLlm {
    calls: AtomicUsize,
    unsafe_marker: &'static str,
    fail_marker: Option<&'static str>,
}

impl StubLlm {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            unsafe_marker: "🎁",
            fail_marker: None,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = self.fail_marker {
            if request.prompt.contains(marker) {
                return Err(LlmError::Api {
                    provider: "stub".into(),
                    status: 429,
                    body: r#"{"error":{"message":"quota exceeded"}}"#.into(),
                });
            }
        }
        let text = if request.prompt.contains(self.unsafe_marker) {
            " Yes"
        } else {
            " No"
        };
        Ok(CompletionResponse {
            text: text.into(),
            finish_reason: Some("length".into()),
        })
    }
}

fn row(id: &str, description: &str, amount: &str, memo: &str) -> String {
    format!("{id}\t-\t{description}\t{amount}\t-\t-\t-\t{memo}\t-\n")
}

fn config_for(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        paths: DataPaths::new(dir),
        sample_seed: Some(5),
        ..Default::default()
    }
}

fn write_tsv(paths: &DataPaths, rows: &[String]) {
    std::fs::write(paths.transactions(), rows.concat()).unwrap();
}

#[tokio::test]
async fn coffee_row_lands_in_safe_cache_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    write_tsv(&config.paths, &[row("1", "COFFEE SHOP", "-350", "☕️Coffee run")]);

    let llm = StubLlm::new();
    let summary = classify_stage(&config, llm.clone()).await.unwrap();

    assert_eq!(summary.safe, 1);
    assert_eq!(llm.calls(), 1);
    let safe = read_records(&config.paths.safe_cache()).await.unwrap();
    assert_eq!(
        safe,
        vec![ClassifiedRecord {
            description: "COFFEE SHOP".into(),
            memo: "☕️Coffee run".into(),
            amount_dollars: -3.5,
        }]
    );
    let unsafe_records = read_records(&config.paths.unsafe_cache()).await.unwrap();
    assert!(unsafe_records.is_empty());
}

#[tokio::test]
async fn rerun_over_cached_input_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    write_tsv(
        &config.paths,
        &[
            row("1", "COFFEE SHOP", "-350", "☕️ Coffee run"),
            row("2", "GIFT SHOP", "-5000", "🎁 Present for Sam"),
            row("3", "CARD SERVICES", "-500", "💳 New user card fee"),
            row("4", "PAYROLL", "250000", "💰 Salary"),
            row("5", "GROCER", "-4250", "Groceries"),
        ],
    );

    let first = StubLlm::new();
    let summary = classify_stage(&config, first.clone()).await.unwrap();
    assert_eq!(first.calls(), 2);
    assert_eq!(summary.safe, 2);
    assert_eq!(summary.unsafe_count, 1);
    assert_eq!(summary.overridden, 1);
    assert_eq!(summary.ineligible, 2);

    let second = StubLlm::new();
    let summary = classify_stage(&config, second.clone()).await.unwrap();
    assert_eq!(second.calls(), 0);
    assert_eq!(summary.cached, 3);
    assert_eq!(summary.classified(), 0);
}

#[tokio::test]
async fn api_failure_keeps_already_flushed_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.max_in_flight = 1;
    write_tsv(
        &config.paths,
        &[
            row("1", "COFFEE SHOP", "-350", "☕️ Coffee run"),
            row("2", "TAXI CO", "-2200", "🚕 Ride home"),
            row("3", "PIZZERIA", "-1800", "🍕 Pizza night"),
        ],
    );

    let llm = Arc::new(StubLlm {
        calls: AtomicUsize::new(0),
        unsafe_marker: "🎁",
        fail_marker: Some("🚕"),
    });
    let err = classify_stage(&config, llm.clone()).await.unwrap_err();

    assert!(err.response_body().unwrap().contains("quota exceeded"));
    assert!(matches!(err, Error::Pipeline(PipelineError::Llm(LlmError::Api { status: 429, .. }))));
    // Record 3 was never started.
    assert_eq!(llm.calls(), 2);
    let safe = read_records(&config.paths.safe_cache()).await.unwrap();
    assert_eq!(safe.len(), 1);
    assert_eq!(safe[0].memo, "☕️ Coffee run");
}

#[tokio::test]
async fn malformed_row_aborts_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let mut rows = vec![row("1", "COFFEE SHOP", "-350", "☕️ Coffee run")];
    rows.push("2\tmissing\tcolumns\n".to_string());
    write_tsv(&config.paths, &rows);

    let llm = StubLlm::new();
    let err = classify_stage(&config, llm.clone()).await.unwrap_err();
    assert!(matches!(err, Error::Load(_)));
    assert_eq!(llm.calls(), 0);
    assert!(!config.paths.safe_cache().exists());
}

#[tokio::test]
async fn full_run_produces_capped_finetuning_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    let mut rows: Vec<String> = (0..15)
        .map(|i| row(&format!("c{i}"), &format!("COFFEE SHOP #{i}"), "-350", "☕️Coffee run"))
        .collect();
    rows.push(row("g1", "ACME   STORE 123", "-4250", "🛒  Groceries"));
    rows.push(row("u1", "GIFT SHOP", "-5000", "🎁 Present for Sam"));
    write_tsv(&config.paths, &rows);

    let llm: Arc<dyn LlmProvider> = StubLlm::new();
    run_stage(Stage::All, &config, Some(llm)).await.unwrap();

    let fixed = read_records(&config.paths.emoji_fix()).await.unwrap();
    assert_eq!(fixed.len(), 16);
    assert!(fixed.iter().all(|r| r.memo == "☕️ Coffee run" || r.memo == "🛒 Groceries"));

    let deduped = read_records(&config.paths.deduped()).await.unwrap();
    assert_eq!(deduped.len(), 11);

    let content = std::fs::read_to_string(config.paths.finetuning()).unwrap();
    assert!(!content.ends_with('\n'));
    let examples: Vec<TrainingExample> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(examples.len(), 11);
    assert!(examples.contains(&TrainingExample {
        prompt: "Amount: $42.50\nTransaction Description: ACME STORE 123\nHuman-Readable Memo:".into(),
        completion: " 🛒 Groceries".into(),
    }));
    assert_eq!(
        examples
            .iter()
            .filter(|e| e.completion == " ☕️ Coffee run")
            .count(),
        10
    );
}

#[tokio::test]
async fn format_stage_runs_without_provider() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    std::fs::write(
        config.paths.deduped(),
        r#"[{"description":"ACME STORE 123","memo":"🛒 Groceries","amountDollars":-42.5}]"#,
    )
    .unwrap();

    run_stage(Stage::Format, &config, None).await.unwrap();
    let content = std::fs::read_to_string(config.paths.finetuning()).unwrap();
    let example: TrainingExample = serde_json::from_str(&content).unwrap();
    assert_eq!(example.completion, " 🛒 Groceries");
    assert!(example.prompt.starts_with("Amount: $42.50\n"));
}

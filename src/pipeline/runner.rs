//! Classification runner — fixed-size worker pool over the parsed records.
//!
//! Each worker pulls the next record from a shared queue and runs
//! eligibility → cache check → classify → persist. The pool size is the
//! in-flight bound on completion calls. After the first error no worker
//! takes a new record, but in-flight records finish so cache files are
//! never left half-written.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::PipelineError;
use crate::pipeline::classifier::Classifier;
use crate::pipeline::types::{Label, TransactionRecord};
use crate::store::ClassificationCache;

/// Counts from one classification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifySummary {
    /// Rows in the export.
    pub total: usize,
    pub safe: usize,
    pub unsafe_count: usize,
    /// Of the safe/unsafe decisions, how many came from override rules.
    pub overridden: usize,
    /// Skipped: no leading emoji or not a debit.
    pub ineligible: usize,
    /// Skipped: already in one of the caches.
    pub cached: usize,
}

impl ClassifySummary {
    fn merge(&mut self, other: &ClassifySummary) {
        self.safe += other.safe;
        self.unsafe_count += other.unsafe_count;
        self.overridden += other.overridden;
        self.ineligible += other.ineligible;
        self.cached += other.cached;
    }

    /// Records that were sent through classification this run.
    pub fn classified(&self) -> usize {
        self.safe + self.unsafe_count
    }
}

impl fmt::Display for ClassifySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows: {} safe, {} unsafe ({} by override), {} ineligible, {} cached",
            self.total, self.safe, self.unsafe_count, self.overridden, self.ineligible, self.cached
        )
    }
}

/// Cache state and counts returned from a completed run.
pub struct ClassifyOutput {
    pub cache: ClassificationCache,
    pub summary: ClassifySummary,
}

/// What happened to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ineligible,
    Cached,
    Classified { label: Label, overridden: bool },
}

/// Shared state handed to every worker.
struct RunState {
    classifier: Arc<Classifier>,
    cache: Mutex<ClassificationCache>,
    queue: Mutex<VecDeque<TransactionRecord>>,
    taken: AtomicUsize,
    stop: AtomicBool,
    total: usize,
}

/// Classify every record with at most `max_in_flight` records in progress.
pub async fn classify_all(
    classifier: Arc<Classifier>,
    cache: ClassificationCache,
    records: Vec<TransactionRecord>,
    max_in_flight: usize,
) -> Result<ClassifyOutput, PipelineError> {
    let total = records.len();
    let workers = max_in_flight.max(1).min(total.max(1));
    info!(total, workers, "Starting classification");

    let state = Arc::new(RunState {
        classifier,
        cache: Mutex::new(cache),
        queue: Mutex::new(records.into()),
        taken: AtomicUsize::new(0),
        stop: AtomicBool::new(false),
        total,
    });

    let mut pool = JoinSet::new();
    for _ in 0..workers {
        let state = Arc::clone(&state);
        pool.spawn(async move { run_worker(state).await });
    }

    let mut summary = ClassifySummary {
        total,
        ..Default::default()
    };
    let mut first_error: Option<PipelineError> = None;

    while let Some(joined) = pool.join_next().await {
        let result = joined.map_err(|e| PipelineError::Worker(e.to_string()));
        match result.and_then(|r| r) {
            Ok(partial) => summary.merge(&partial),
            Err(e) => {
                state.stop.store(true, Ordering::SeqCst);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        error!(error = %e, "Classification aborted");
        return Err(e);
    }

    let state = Arc::try_unwrap(state)
        .map_err(|_| PipelineError::Worker("run state still shared after join".into()))?;
    info!(%summary, "Done!");

    Ok(ClassifyOutput {
        cache: state.cache.into_inner(),
        summary,
    })
}

async fn run_worker(state: Arc<RunState>) -> Result<ClassifySummary, PipelineError> {
    let mut summary = ClassifySummary::default();

    loop {
        if state.stop.load(Ordering::SeqCst) {
            break;
        }
        let Some(record) = state.queue.lock().await.pop_front() else {
            break;
        };
        let position = state.taken.fetch_add(1, Ordering::SeqCst) + 1;

        match process_record(&state, record, position).await {
            Ok(Outcome::Ineligible) => summary.ineligible += 1,
            Ok(Outcome::Cached) => summary.cached += 1,
            Ok(Outcome::Classified { label, overridden }) => {
                match label {
                    Label::Safe => summary.safe += 1,
                    Label::Unsafe => summary.unsafe_count += 1,
                }
                if overridden {
                    summary.overridden += 1;
                }
            }
            Err(e) => {
                state.stop.store(true, Ordering::SeqCst);
                return Err(e);
            }
        }
    }

    Ok(summary)
}

async fn process_record(
    state: &RunState,
    record: TransactionRecord,
    position: usize,
) -> Result<Outcome, PipelineError> {
    if !Classifier::is_eligible(&record) {
        debug!(id = %record.id, memo = %record.memo, "Skipping ineligible record");
        return Ok(Outcome::Ineligible);
    }

    let candidate = record.to_classified();
    if state.cache.lock().await.contains(&candidate) {
        debug!(id = %record.id, memo = %record.memo, "Skipping cached record");
        return Ok(Outcome::Cached);
    }

    let classification = state.classifier.classify(&candidate).await?;
    info!("{}", progress_line(position, state.total, classification.label, &candidate.memo));

    state
        .cache
        .lock()
        .await
        .record(candidate, classification.label)
        .await?;

    Ok(Outcome::Classified {
        label: classification.label,
        overridden: classification.overridden,
    })
}

/// `(n/total)   Safe: memo`, label right-aligned to the width of "Unsafe".
fn progress_line(position: usize, total: usize, label: Label, memo: &str) -> String {
    format!("({position}/{total}) {label:>6}: {memo}")
}

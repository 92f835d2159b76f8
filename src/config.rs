//! Configuration types.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::pipeline::stages::Stage;

/// Default maximum number of classification calls in flight.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 30;

/// Default maximum number of records kept per distinct memo.
pub const DEFAULT_SAMPLE_CAP: usize = 10;

/// Well-known file names under the data directory.
pub mod files {
    pub const TRANSACTIONS: &str = "txs.tsv";
    pub const SAFE: &str = "safe.json";
    pub const UNSAFE: &str = "unsafe.json";
    pub const EMOJI_FIX: &str = "safe-emojifix.json";
    pub const DEDUPED: &str = "safe-deduped.json";
    pub const FINETUNING: &str = "finetuning.jsonl";
}

/// Locations of every file the pipeline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    dir: PathBuf,
}

impl DataPaths {
    /// Resolve all pipeline files under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Tab-separated transaction export.
    pub fn transactions(&self) -> PathBuf {
        self.dir.join(files::TRANSACTIONS)
    }

    /// Cache of records that are safe to train on.
    pub fn safe_cache(&self) -> PathBuf {
        self.dir.join(files::SAFE)
    }

    /// Cache of records whose memo needs context beyond the description.
    pub fn unsafe_cache(&self) -> PathBuf {
        self.dir.join(files::UNSAFE)
    }

    /// Safe records after emoji spacing normalization.
    pub fn emoji_fix(&self) -> PathBuf {
        self.dir.join(files::EMOJI_FIX)
    }

    /// Normalized records after per-memo sampling.
    pub fn deduped(&self) -> PathBuf {
        self.dir.join(files::DEDUPED)
    }

    /// Final prompt/completion JSONL.
    pub fn finetuning(&self) -> PathBuf {
        self.dir.join(files::FINETUNING)
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new("data")
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where the pipeline files live.
    pub paths: DataPaths,
    /// Stage to run.
    pub stage: Stage,
    /// Maximum classification calls in flight at once.
    pub max_in_flight: usize,
    /// Maximum records kept per distinct memo when sampling.
    pub sample_cap: usize,
    /// Fixed sampling seed; entropy-seeded when unset.
    pub sample_seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: DataPaths::default(),
            stage: Stage::Format,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            sample_cap: DEFAULT_SAMPLE_CAP,
            sample_seed: None,
        }
    }
}

impl PipelineConfig {
    /// Build the configuration from `MEMO_TUNE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let paths = lookup("MEMO_TUNE_DATA_DIR")
            .map(DataPaths::new)
            .unwrap_or(defaults.paths);

        let stage = parse_var(&lookup, "MEMO_TUNE_STAGE")?.unwrap_or(defaults.stage);

        let max_in_flight =
            parse_var(&lookup, "MEMO_TUNE_MAX_IN_FLIGHT")?.unwrap_or(defaults.max_in_flight);
        if max_in_flight == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MEMO_TUNE_MAX_IN_FLIGHT".into(),
                message: "must be at least 1".into(),
            });
        }

        let sample_cap =
            parse_var(&lookup, "MEMO_TUNE_SAMPLE_CAP")?.unwrap_or(defaults.sample_cap);
        let sample_seed = parse_var(&lookup, "MEMO_TUNE_SEED")?;

        Ok(Self {
            paths,
            stage,
            max_in_flight,
            sample_cap,
            sample_seed,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_paths_live_under_data() {
        let paths = DataPaths::default();
        assert_eq!(paths.transactions(), PathBuf::from("data/txs.tsv"));
        assert_eq!(paths.safe_cache(), PathBuf::from("data/safe.json"));
        assert_eq!(paths.unsafe_cache(), PathBuf::from("data/unsafe.json"));
        assert_eq!(paths.emoji_fix(), PathBuf::from("data/safe-emojifix.json"));
        assert_eq!(paths.deduped(), PathBuf::from("data/safe-deduped.json"));
        assert_eq!(paths.finetuning(), PathBuf::from("data/finetuning.jsonl"));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.stage, Stage::Format);
        assert_eq!(config.max_in_flight, 30);
        assert_eq!(config.sample_cap, 10);
        assert_eq!(config.sample_seed, None);
        assert_eq!(config.paths, DataPaths::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("MEMO_TUNE_DATA_DIR", "/tmp/memos"),
            ("MEMO_TUNE_STAGE", "classify"),
            ("MEMO_TUNE_MAX_IN_FLIGHT", "4"),
            ("MEMO_TUNE_SAMPLE_CAP", " 3 "),
            ("MEMO_TUNE_SEED", "42"),
        ]))
        .unwrap();
        assert_eq!(config.paths.dir(), Path::new("/tmp/memos"));
        assert_eq!(config.stage, Stage::Classify);
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.sample_cap, 3);
        assert_eq!(config.sample_seed, Some(42));
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[("MEMO_TUNE_SAMPLE_CAP", "ten")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MEMO_TUNE_SAMPLE_CAP"));
    }

    #[test]
    fn zero_in_flight_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[("MEMO_TUNE_MAX_IN_FLIGHT", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let err =
            PipelineConfig::from_lookup(lookup(&[("MEMO_TUNE_STAGE", "train")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MEMO_TUNE_STAGE"));
    }
}

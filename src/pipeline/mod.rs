//! Dataset preparation pipeline.
//!
//! Transactions flow through:
//! 1. `loader` — TSV export → `TransactionRecord`s
//! 2. `runner` + `classifier` — eligible records labelled safe/unsafe,
//!    override `rules` first, LLM second, cached in the safe/unsafe stores
//! 3. `emoji` — one space after each safe memo's leading emoji
//! 4. `sampler` — at most N records per distinct memo
//! 5. `formatter` — prompt/completion JSONL
//!
//! `stages` wires these to the files in the data directory.

pub mod classifier;
pub mod emoji;
pub mod formatter;
pub mod loader;
pub mod rules;
pub mod runner;
pub mod sampler;
pub mod stages;
pub mod types;

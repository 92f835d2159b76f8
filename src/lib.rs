//! memo-tune — transaction memo fine-tuning dataset builder.

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod store;

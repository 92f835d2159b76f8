use std::process::ExitCode;

use memo_tune::config::PipelineConfig;
use memo_tune::error::Error;
use memo_tune::llm::{LlmConfig, create_provider};
use memo_tune::pipeline::stages::run_stage;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before the subscriber so RUST_LOG from the file applies
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable environment file"),
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.response_body() {
                Some(body) => eprintln!("{body}"),
                None => eprintln!("Error: {e}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Error> {
    let config = PipelineConfig::from_env()?;

    // Only classification talks to the API, so the key is optional otherwise
    let llm = if config.stage.needs_llm() {
        Some(create_provider(&LlmConfig::from_env()?)?)
    } else {
        None
    };

    run_stage(config.stage, &config, llm).await
}

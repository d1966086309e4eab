use crate::application::PromptRelayUseCase;
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::llm_clients::OpenAICompatibleClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Loads configuration, builds the relay, and serves until shutdown.
pub async fn run() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = AppConfig::load()?;
    info!(
        "Using {:?} model {} at {} (timeout {}s)",
        config.llm.provider, config.llm.model, config.llm.base_url, config.llm.timeout_secs
    );

    let llm_client = Arc::new(OpenAICompatibleClient::new());
    let relay_use_case = Arc::new(PromptRelayUseCase::new(llm_client));

    crate::interfaces::http::start_server(&config, relay_use_case)?.await?;

    info!("Server stopped");
    Ok(())
}

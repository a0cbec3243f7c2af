use anyhow::Context;
use tracing_subscriber::EnvFilter;

use study_forge::config::AppConfig;
use study_forge::routes;
use study_forge::services::pipeline::Pipeline;
use study_forge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded (env: {})", std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into()));

    config.validate().context("Invalid configuration")?;

    let pipeline = Pipeline::from_config(&config.llm, &config.pipeline)
        .context("Failed to initialize LLM backends")?;
    tracing::info!(
        "LLM backends ready (provider: {}, notes: {}, quiz: {}, merge: {}, chunk size: {})",
        config.llm.provider,
        config.llm.notes_model,
        config.llm.quiz_model,
        config.llm.merge_model(),
        pipeline.chunk_size()
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, pipeline);

    let session_config = &state.config.session;
    state
        .sessions
        .spawn_sweeper(session_config.ttl(), session_config.sweep_interval());
    tracing::info!(
        "Session sweeper started (ttl: {}s, every {}s)",
        session_config.ttl_secs,
        session_config.sweep_interval_secs
    );

    let app = routes::router(state);

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

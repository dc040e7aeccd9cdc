mod config;
mod ws;

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use dialogue_core::prompt_loader::load_persona_set;
use dialogue_core::{
    ChatModel, DialogueSettings, Generator, OpenAiChat, Orchestrator, PersonaSet, Transcript,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Streams an endless two-persona dialogue to browser viewers")]
struct Cli {
    /// Subject announced to viewers (overrides DIALOGUE_TOPIC)
    #[arg(long)]
    topic: Option<String>,
    /// Address to listen on (overrides BIND_ADDRESS)
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let personas = match &config.prompts_dir {
        Some(dir) => load_persona_set(dir).context("Failed to load persona prompts")?,
        None => PersonaSet::default(),
    };

    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChat::with_base_url(
        config.openai_api_key,
        &config.openai_base_url,
    ));
    let transcript = Transcript::new(personas.initial_summary.clone()).shared();
    let generator = Generator::new(model, &config.chat_model, personas, transcript);

    let mut settings = DialogueSettings::default().with_completion_timeout(config.speech_timeout);
    if let Some(topic) = args.topic.as_deref().or(config.topic.as_deref()) {
        settings = settings.with_topic(topic);
    }
    let orchestrator = Arc::new(Orchestrator::new(generator, settings));
    tracing::info!("Topic: {}", orchestrator.topic());
    let app = ws::router(ws::AppState { orchestrator }, &config.web_dir);

    let addr = args.bind.unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Dialogue server listening on http://{}", addr);
    tracing::info!("Waiting for first browser connection to start the conversation");

    axum::serve(listener, app).await?;

    Ok(())
}

use anyhow::{Context, Result, bail};
use std::io::{self, Write};
use tracing::{info, warn};

use crate::accumulator::{Reply, ResponseAccumulator};
use crate::config::Config;
use crate::credentials::{default_chain, resolve};
use crate::error::ClientInitError;
use crate::llm::{CompletionEndpoint, MistralClient};
use crate::prompts::{CLIENT_UNAVAILABLE, SYSTEM_MESSAGE, request_failed};
use crate::session::ChatSession;
use crate::ui;
use crate::ui::conversation::ConversationManager;

/// Resolve the API key and build the HTTP client
pub fn connect(config: &Config) -> Result<MistralClient, ClientInitError> {
    let credential = resolve(&default_chain(config))?;
    info!(source = %credential.source, "api key resolved");
    MistralClient::new(config, credential.api_key)
}

/// Accumulator for the configured model, disabled when no client can be built
pub fn build_accumulator(config: &Config) -> ResponseAccumulator<MistralClient> {
    match connect(config) {
        Ok(client) => ResponseAccumulator::new(client, config.default_model.clone()),
        Err(e) => {
            warn!(error = %e, "completion client unavailable");
            ResponseAccumulator::disabled(config.default_model.clone())
        }
    }
}

/// Interactive chat in the terminal
pub async fn chat(config: &Config) -> Result<()> {
    let accumulator = build_accumulator(config);
    let session = ChatSession::new(SYSTEM_MESSAGE);
    info!(session = %session.id(), model = accumulator.model(), "starting chat");

    let mut manager =
        ConversationManager::new(session, accumulator).with_timestamps(config.ui.show_timestamps);
    ui::run(&mut manager).await
}

/// Single question, reply printed to stdout
pub async fn ask(config: &Config, prompt: &str) -> Result<()> {
    let accumulator = build_accumulator(config);
    let mut stdout = io::stdout();
    let reply = ask_with(&accumulator, prompt, &mut stdout).await?;
    if let Some(error) = reply.error() {
        eprintln!("{}", request_failed(&error.to_string()));
    }
    Ok(())
}

/// Run one turn and write the reply text to `out`
pub async fn ask_with<E, W>(
    accumulator: &ResponseAccumulator<E>,
    prompt: &str,
    out: &mut W,
) -> Result<Reply>
where
    E: CompletionEndpoint,
    W: Write,
{
    if prompt.trim().is_empty() {
        bail!("Prompt cannot be empty");
    }
    if !accumulator.is_available() {
        bail!(CLIENT_UNAVAILABLE);
    }

    let mut session = ChatSession::new(SYSTEM_MESSAGE);
    session.initialize();
    let reply = session.submit(prompt, accumulator).await;

    if let Some(text) = reply.text() {
        writeln!(out, "{}", text).context("Failed to write reply")?;
    }
    Ok(reply)
}

/// Store the API key in the config file
pub fn set_key(config: &mut Config, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        bail!("API key cannot be empty");
    }

    config.set_api_key(key.to_string());
    config.save()?;
    println!("🔑 API key saved to {}", config.config_path().display());
    Ok(())
}

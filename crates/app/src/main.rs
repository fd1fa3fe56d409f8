#![deny(unsafe_code)]

mod cli;
mod error;
mod render;
mod settings;

use std::io::{Stdout, stdout};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use guardchat_chat::ChatSession;
use guardchat_llm::{
    LlmProvider, ModelCatalogSource, SessionId, create_provider, fetch_models_for_provider,
};
use snafu::{ResultExt, ensure};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::{
    AppResult, ConfigNotFoundSnafu, CreateProviderSnafu, FetchModelsSnafu, ModelNotFoundSnafu,
    ReadInputSnafu, RenderSnafu,
};
use crate::render::TerminalRenderer;
use crate::settings::Settings;

/// Application entry point.
///
/// 1. Logging to stderr so stdout stays the chat surface
/// 2. Settings: defaults, settings file, environment, then CLI flags
/// 3. Model file check and engine client
/// 4. Either the `models` listing or the interactive chat loop
#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "guardchat exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> AppResult<()> {
    let config_path = match &cli.config {
        Some(path) => {
            ensure!(
                path.exists(),
                ConfigNotFoundSnafu {
                    stage: "resolve-config-path",
                    path: path.clone(),
                }
            );
            path.clone()
        }
        None => Settings::default_config_path(),
    };
    let settings = Settings::load(&config_path).with_cli_overrides(&cli);

    if !settings.think_mode {
        tracing::info!("Think mode has been disabled via the '--nothink' command-line argument.");
    }
    tracing::info!(model_path = ?settings.model_path, "Using model");

    ensure!(
        settings.model_path.exists(),
        ModelNotFoundSnafu {
            stage: "check-model-file",
            path: settings.model_path.clone(),
        }
    );

    let provider = create_provider(settings.to_provider_config(), vec![settings.model()])
        .context(CreateProviderSnafu {
            stage: "create-provider",
        })?;
    tracing::info!(
        provider = provider.name(),
        endpoint = %settings.engine.endpoint,
        "engine client ready"
    );

    match cli.command {
        Some(Command::Models) => list_models(provider.as_ref()).await,
        None => chat_loop(provider, &settings).await,
    }
}

async fn list_models(provider: &dyn LlmProvider) -> AppResult<()> {
    let catalog = fetch_models_for_provider(provider)
        .await
        .context(FetchModelsSnafu {
            stage: "list-models",
        })?;

    if catalog.source == ModelCatalogSource::StaticFallback {
        tracing::warn!(
            warning = catalog.warning.as_deref().unwrap_or_default(),
            "engine did not answer; showing the configured model"
        );
    }
    for model in &catalog.models {
        match &model.description {
            Some(description) => println!("{}\t{}", model.id, description),
            None => println!("{}", model.id),
        }
    }
    Ok(())
}

async fn chat_loop(provider: Arc<dyn LlmProvider>, settings: &Settings) -> AppResult<()> {
    let mut session = ChatSession::new(
        provider,
        settings.session_config(),
        SessionId::new(u64::from(std::process::id())),
    );
    let mut renderer = TerminalRenderer::new(stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    renderer
        .banner(&session.config().model_id, session.config().think_mode)
        .context(RenderSnafu { stage: "banner" })?;

    loop {
        renderer.prompt().context(RenderSnafu { stage: "prompt" })?;

        let line = tokio::select! {
            line = lines.next_line() => line.context(ReadInputSnafu { stage: "read-line" })?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                session.clear();
                renderer
                    .notice("conversation cleared")
                    .context(RenderSnafu { stage: "clear" })?;
            }
            message => run_turn(&mut session, &mut renderer, message).await?,
        }
    }

    Ok(())
}

async fn run_turn(
    session: &mut ChatSession,
    renderer: &mut TerminalRenderer<Stdout>,
    message: &str,
) -> AppResult<()> {
    renderer
        .begin_answer()
        .context(RenderSnafu { stage: "begin-answer" })?;

    match session.submit(message) {
        Ok(mut turn) => {
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            loop {
                let interrupted = tokio::select! {
                    snapshot = turn.next_snapshot() => match snapshot {
                        Some(Ok(transcript)) => {
                            renderer
                                .render(transcript)
                                .context(RenderSnafu { stage: "render-snapshot" })?;
                            false
                        }
                        // The turn is already finalized as failed; the next pull ends it.
                        Some(Err(error)) => {
                            tracing::warn!(error = %error, "turn failed");
                            false
                        }
                        None => break,
                    },
                    _ = &mut ctrl_c => true,
                };

                if interrupted {
                    turn.abort();
                    break;
                }
            }
        }
        Err(error) => {
            tracing::error!(error = %error, "could not start the turn");
        }
    }

    renderer
        .end_answer(session.transcript().last())
        .context(RenderSnafu { stage: "end-answer" })
}

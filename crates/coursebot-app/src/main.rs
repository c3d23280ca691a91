//! Coursebot application binary - composition root.
//!
//! Ties the workspace crates into a single executable:
//! 1. Parse CLI args and initialize tracing
//! 2. Load configuration from TOML
//! 3. Load and clean the course catalog (empty catalog is fatal)
//! 4. Build the model services (ONNX backends, or mocks for smoke runs)
//! 5. Run a single interactive conversation over stdin/stdout
//!
//! The terminal loop is the "session shell" of the design: it owns the
//! `ConversationState` lifecycle and serializes turns, one user message
//! processed to completion before the next is read.

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use coursebot_catalog::CourseCatalog;
use coursebot_chat::{write_log_csv, ConversationState, DialogueEngine};
use coursebot_core::config::CoursebotConfig;
use coursebot_core::error::CoursebotError;
use coursebot_model::{
    DynEmbeddingService, DynZeroShotClassifier, IntentScorer, MockClassifier, MockEmbedding,
    OnnxEmbeddingService, OnnxNliClassifier,
};

use cli::CliArgs;

/// Build the embedding and classifier backends.
///
/// Falls back to the deterministic mocks when `--mock-models` is passed or
/// no model directories are configured.
fn build_models(
    args: &CliArgs,
    config: &CoursebotConfig,
) -> Result<(Arc<dyn DynEmbeddingService>, Arc<dyn DynZeroShotClassifier>), CoursebotError> {
    let embedding_dir = args
        .embedding_dir
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| config.model.embedding_dir.clone());
    let classifier_dir = args
        .classifier_dir
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| config.model.classifier_dir.clone());

    if args.mock_models || embedding_dir.is_empty() || classifier_dir.is_empty() {
        tracing::warn!("Using mock model backends (deterministic, not semantic)");
        return Ok((
            Arc::new(MockEmbedding::new()),
            Arc::new(MockClassifier::new()),
        ));
    }

    let embedder = OnnxEmbeddingService::from_directory(Path::new(&embedding_dir))?;
    let classifier = OnnxNliClassifier::from_directory(
        Path::new(&classifier_dir),
        &config.model.hypothesis_template,
    )?;
    Ok((Arc::new(embedder), Arc::new(classifier)))
}

/// Run the interactive conversation loop until EOF or `/quit`.
async fn run_session(engine: &DialogueEngine) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = ConversationState::new();

    println!("bot: {}", engine.greeting());
    println!("     (/export [path] writes the interaction log, /quit ends the session)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = line.trim_end();

        if input == "/quit" {
            break;
        }

        if let Some(rest) = input.strip_prefix("/export") {
            let path = rest.trim();
            let path = if path.is_empty() { "logs.csv" } else { path };
            let result = std::fs::File::create(path)
                .map_err(|e| e.to_string())
                .and_then(|file| write_log_csv(&state.log, file).map_err(|e| e.to_string()));
            match result {
                Ok(()) => println!("bot: Wrote {} log entries to {}", state.log.len(), path),
                Err(e) => tracing::error!(error = %e, path, "Log export failed"),
            }
            continue;
        }

        // One turn, processed to completion before the next read. A model
        // failure aborts the turn but not the session; state is untouched.
        match engine.handle_turn(&mut state, input).await {
            Ok(replies) => {
                for reply in replies {
                    println!("bot: {}", reply);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Turn failed");
                println!("bot: Sorry, something went wrong on my side. Please try that again.");
            }
        }
    }

    tracing::info!(session = %state.id, turns = state.log.len(), "Session ended");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing: --log-level beats RUST_LOG beats "info".
    let filter = match args.log_level.as_deref() {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting coursebot v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = CoursebotConfig::load_or_default(&config_file);
    if let Some(path) = args.resolve_catalog_path() {
        config.catalog.path = path;
    }

    if !config.chat.enabled {
        tracing::warn!("Chat is disabled in config; exiting");
        return Ok(());
    }

    // Catalog. A catalog with no courses means the classifier would have
    // no candidate labels; refuse to start.
    let catalog = Arc::new(CourseCatalog::load(Path::new(&config.catalog.path))?);
    if catalog.is_empty() {
        tracing::error!(path = %config.catalog.path, "Catalog is empty");
        return Err(CoursebotError::EmptyCatalog.into());
    }

    // Models.
    let (embedder, classifier) = build_models(&args, &config)?;
    let intent = IntentScorer::new(embedder, config.model.intent_threshold).await?;

    let engine = DialogueEngine::new(catalog, classifier, intent);
    run_session(&engine).await
}

//! Professor - an LLM-driven tutor
//!
//! Plans a course on any topic, then teaches it lesson by lesson: lecture,
//! quiz, assignment, grading, and a decision to repeat or advance.

mod api;
mod artifacts;
mod cli;
mod collaborators;
mod config;
mod db;
mod error;
mod llm;
mod runtime;
mod scoring;
mod state_machine;
mod tools;

use api::{create_router, AppState};
use clap::{Parser, Subcommand};
use collaborators::{Collaborators, LlmCollaborators};
use config::TeachingConfig;
use db::Database;
use llm::{LlmConfig, ModelRegistry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "professor", version, about = "An LLM-driven tutor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "PROFESSOR_PORT", default_value_t = 8000)]
        port: u16,
        /// SQLite database file
        #[arg(long, env = "PROFESSOR_DB_PATH")]
        db: Option<PathBuf>,
    },
    /// Take a course in the terminal
    Learn {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        background: Option<String>,
        #[arg(long, default_value = cli::DEFAULT_SESSION_ID)]
        session_id: String,
        #[arg(long, env = "PROFESSOR_DB_PATH")]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    let interactive = matches!(args.command, Command::Learn { .. });
    init_logging(interactive);

    let config = TeachingConfig::from_env()?;
    let llm_registry = Arc::new(ModelRegistry::new(&LlmConfig::from_env()));
    let collaborators = build_collaborators(&config, &llm_registry)?;

    match args.command {
        Command::Serve { port, db } => {
            let db = open_database(db)?;
            serve(db, collaborators, config, llm_registry, port).await
        }
        Command::Learn {
            topic,
            background,
            session_id,
            db,
        } => {
            let db = open_database(db)?;
            let options = cli::LearnOptions {
                topic,
                background,
                session_id,
            };
            cli::learn(db, collaborators, config, options).await?;
            Ok(())
        }
    }
}

fn init_logging(interactive: bool) {
    let registry = tracing_subscriber::registry();
    if interactive {
        // The terminal belongs to the learner; keep logs quiet and off stdout
        registry
            .with(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| "professor=warn".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "professor=info,tower_http=info".into()),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    }
}

fn open_database(path: Option<PathBuf>) -> Result<Database, Box<dyn std::error::Error>> {
    let path = path.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".professor").join("professor.db")
    });

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %path.display(), "Opening database");
    Ok(Database::open(&path)?)
}

fn build_collaborators(
    config: &TeachingConfig,
    llm_registry: &ModelRegistry,
) -> Result<Arc<dyn Collaborators>, String> {
    let llm = llm_registry.get(&config.model_id).ok_or_else(|| {
        if llm_registry.has_models() {
            format!(
                "Model {} is not available; choose one of {:?}",
                config.model_id,
                llm_registry.available_models()
            )
        } else {
            "No LLM API key configured. Set ANTHROPIC_API_KEY.".to_string()
        }
    })?;

    tracing::info!(
        model = %config.model_id,
        search = config.search.enabled(),
        policy = ?config.decision_policy,
        "Collaborators initialized"
    );
    Ok(Arc::new(LlmCollaborators::new(llm, &config.search)))
}

async fn serve(
    db: Database,
    collaborators: Arc<dyn Collaborators>,
    config: TeachingConfig,
    llm_registry: Arc<ModelRegistry>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    // Steps that were running when the last process stopped cannot report back
    let recovered = runtime::recover_interrupted(&db)?;
    if !recovered.is_empty() {
        tracing::info!(count = recovered.len(), "Halted interrupted sessions");
    }

    let state = AppState::new(db, collaborators, config, llm_registry);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Professor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

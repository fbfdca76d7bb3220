mod repl;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use speech_qa_core::models::ModelRegistry;
use speech_qa_core::{setup, Config, IndexOrigin, OllamaProvider, Session, SetupError, SetupOptions};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "speech-qa")]
#[command(about = "Q&A system for Dr. B.R. Ambedkar's speech", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, help = "Force rebuild the vector store from scratch")]
    rebuild: bool,

    #[arg(short, long, help = "Ask a single question (non-interactive mode)")]
    question: Option<String>,

    #[arg(long, help = "Path to speech text file (default: data/speech.txt)")]
    speech_file: Option<PathBuf>,

    #[arg(short, long, default_value = "config.yaml", help = "Config file; defaults are used if it is missing")]
    config: PathBuf,

    #[arg(long, help = "Directory holding the vector store (default: ./chroma_db)")]
    index_dir: Option<PathBuf>,

    #[arg(long, help = "Chat model used to answer (default: mistral)")]
    model: Option<String>,

    #[arg(long, help = "Embedding model id (e.g. 'all-minilm', 'nomic-embed-text')")]
    embedding_model: Option<String>,

    #[arg(long, help = "Ollama base URL (default: http://localhost:11434)")]
    ollama_url: Option<String>,

    #[arg(short, long, help = "Show debug logs")]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    print_rule();
    println!("{}", "Initializing RAG System".bold());
    print_rule();
    print_config(&config);

    let provider = Arc::new(OllamaProvider::new(&config.llm.base_url));
    let options = SetupOptions {
        speech_file: config.speech_file.clone(),
        rebuild: cli.rebuild,
    };

    let session = match setup(&config, provider, &options).await {
        Ok(session) => session,
        Err(SetupError::SpeechNotFound(path)) => {
            println!("{} File not found: {}", "Error:".red().bold(), path.display());
            println!("Make sure '{}' exists!", path.display());
            return ExitCode::FAILURE;
        }
        Err(e) => return fail(&anyhow::Error::from(e)),
    };
    print_ready(&session);

    let outcome = match &cli.question {
        Some(question) => repl::ask(&session.chain, question, &mut io::stdout()).await.map(|_| ()),
        None => repl::run_interactive(&session.chain, io::stdin().lock(), &mut io::stdout())
            .await
            .map_err(anyhow::Error::from),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn init_tracing(verbose: bool) {
    // Keep LanceDB and HTTP internals quiet unless RUST_LOG asks for them
    let default = if verbose {
        "speech_qa_core=debug"
    } else {
        "speech_qa_core=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Loads the config file, then applies command line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_or_default(&cli.config)
        .map_err(|e| anyhow!("{} ({})", e, cli.config.display()))?;

    if let Some(path) = &cli.speech_file {
        config.speech_file = path.clone();
    }
    if let Some(dir) = &cli.index_dir {
        config.storage.path = dir.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(url) = &cli.ollama_url {
        config.llm.base_url = url.clone();
    }
    if let Some(id) = &cli.embedding_model {
        let registry = ModelRegistry::new();
        config.rag.embedding_model = registry.get_embedding(id).cloned().with_context(|| {
            let known: Vec<&str> = registry.embedding_models().map(|m| m.id.as_str()).collect();
            format!("Unknown embedding model '{}' (known: {})", id, known.join(", "))
        })?;
    }

    config.validate()?;
    Ok(config)
}

fn fail(error: &anyhow::Error) -> ExitCode {
    println!("{} {}", "Unexpected error:".red().bold(), error);
    ExitCode::FAILURE
}

fn print_rule() {
    println!("{}", "=".repeat(60));
}

fn print_config(config: &Config) {
    println!("  Chat Model:      {}", config.llm.model.cyan());
    println!("  Embedding Model: {}", config.rag.embedding_model.id.cyan());
    println!("  Chunk Size:      {} (overlap {})", config.rag.chunk_size, config.rag.chunk_overlap);
    println!("  Top K:           {}", config.rag.top_k);
    println!("  Vector Store:    {}", config.storage.path.display());
    println!();
}

fn print_ready(session: &Session) {
    match session.origin {
        IndexOrigin::Loaded { records } => {
            println!("{} Loaded existing vector store ({} embeddings)", "✓".green().bold(), records);
        }
        IndexOrigin::Built { chunks, records } => {
            println!(
                "{} Built vector store from {} chunks ({} embeddings)",
                "✓".green().bold(),
                chunks,
                records
            );
        }
    }

    println!();
    print_rule();
    println!("{}", "System Ready! You can now ask questions.".bold().green());
    print_rule();
}

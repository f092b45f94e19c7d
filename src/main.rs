use anyhow::{Context, Result};
use coursebot::chat::{Assistant, ChatResponse, SAMPLE_QUESTIONS};
use coursebot::chunking::TextSplitter;
use coursebot::cli::{Cli, Commands, ConfigAction};
use coursebot::config::{expand_path, Config};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Ask { questions, json } => {
            cmd_ask(cli.config, questions, json)?;
        }
        Commands::Chunks { limit, json } => {
            cmd_chunks(cli.config, limit, json)?;
        }
        Commands::Status => {
            cmd_status(cli.config)?;
        }
        Commands::Serve { bind, static_dir } => {
            cmd_serve(cli.config, bind, static_dir)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "coursebot=debug" } else { "coursebot=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    Ok(rt.block_on(future))
}

fn cmd_ask(config_path: Option<PathBuf>, questions: Vec<String>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let assistant = Assistant::from_config(&config).context("Failed to set up assistant")?;

    let questions = if questions.is_empty() {
        println!("No question given, running sample questions\n");
        SAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect()
    } else {
        questions
    };

    let responses = block_on(assistant.ask_many(&questions))?;

    if json {
        let wire: Vec<_> = responses.iter().map(ChatResponse::to_wire).collect();
        let out =
            serde_json::to_string_pretty(&wire).context("Failed to serialize responses")?;
        println!("{}", out);
        return Ok(());
    }

    for (question, response) in questions.iter().zip(&responses) {
        println!("❓ {}", question);
        println!("🤖 {}", response.answer());
        println!("📊 Sources: {}", response.sources());
        if let Some(error) = response.error() {
            println!("⚠ Error: {}", error);
        }
        println!();
    }

    Ok(())
}

fn cmd_chunks(config_path: Option<PathBuf>, limit: usize, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let path = expand_path(&config.corpus.path)?;
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read corpus: {:?}", path))?;

    let splitter = TextSplitter::new(config.chunking.clone())?;
    let chunks = splitter.create_documents(&text, &path.display().to_string());

    if json {
        let shown: Vec<_> = chunks.iter().take(limit).collect();
        let out = serde_json::to_string_pretty(&shown).context("Failed to serialize chunks")?;
        println!("{}", out);
        return Ok(());
    }

    println!(
        "{} chunks from {} ({} chars, size {}, overlap {})",
        chunks.len(),
        path.display(),
        text.chars().count(),
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    for (i, chunk) in chunks.iter().take(limit).enumerate() {
        println!(
            "\n[{}] chars {}..{} ({} chars)",
            i + 1,
            chunk.source_offset,
            chunk.end_offset(),
            chunk.char_len()
        );
        println!("  {}", chunk.preview(120));
    }
    if chunks.len() > limit {
        println!("\n... {} more", chunks.len() - limit);
    }

    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let assistant = Assistant::from_config(&config).context("Failed to set up assistant")?;

    let warm = block_on(assistant.warm_up())?;
    let status = assistant.status();
    let stats = assistant.knowledge_base().stats();

    println!("Coursebot Status");
    println!("================");
    println!("\nModel: {}", status.model_identifier);
    println!("Chains ready: {}", status.chains_ready);
    println!("Timestamp: {}", status.timestamp);

    println!("\nKnowledge base: {}", assistant.knowledge_base().corpus());
    match warm {
        Ok(()) => {
            println!("  Chunks: {}", stats.chunk_count);
            println!("  Embeddings: {}", stats.embeddings_model);
            if let Some(digest) = &stats.corpus_digest {
                println!("  Corpus digest: {}", &digest[..16.min(digest.len())]);
            }
        }
        Err(e) => println!("  ⚠ Not ready: {}", e),
    }

    Ok(())
}

fn cmd_serve(
    config_path: Option<PathBuf>,
    bind: Option<String>,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let static_dir = match static_dir.or_else(|| config.server.static_dir.clone()) {
        Some(dir) => Some(expand_path(&dir)?),
        None => None,
    };
    let assistant = Arc::new(
        Assistant::from_config(&config).context("Failed to set up assistant")?,
    );

    block_on(async move {
        if let Err(e) = assistant.warm_up().await {
            tracing::warn!("Knowledge base not ready, will retry on first question: {}", e);
        }
        println!("🚀 Chat API running on http://{}", bind);
        coursebot::server::serve(assistant, &bind, static_dir).await
    })??;

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let out = toml::to_string_pretty(&config)?;
            println!("{}", out);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    Config::load_or_default(&path)
        .with_context(|| format!("Invalid configuration ({})", path.display()))
}

mod cli;
mod display;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use cite_core::bootstrap::{create_provider, read_status, resolve_config_path};
use cite_core::{App, Config};
use cite_llm::Message;
use cite_llm::any::AnyProvider;
use cite_rag::RagError;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{Cli, Command};
use crate::display::{render_answer, render_history, render_status};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)?;
    init_subscriber(config.logging.file.as_deref());
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    if let Command::Status = cli.command {
        print!("{}", render_status(&read_status(&config)?));
        return Ok(());
    }

    let provider = create_provider(&config)?;
    tracing::info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        embedding_model = %config.llm.embedding_model,
        "provider ready"
    );
    let app = App::build(config, provider)?;

    match cli.command {
        Command::Ingest { paths } => ingest(&app, &paths).await,
        Command::Ask {
            question,
            top_k,
            show_chunks,
        } => {
            let answer = app.engine.ask(&question, top_k).await.map_err(explain)?;
            print!("{}", render_answer(&answer, show_chunks));
            Ok(())
        }
        Command::Chat { top_k, show_chunks } => chat(&app, top_k, show_chunks).await,
        Command::Status => {
            print!("{}", render_status(&app.status()));
            Ok(())
        }
    }
}

async fn ingest(app: &App<AnyProvider>, paths: &[PathBuf]) -> anyhow::Result<()> {
    let loaders = app.loaders();
    let report = app
        .pipeline
        .load_and_ingest(paths, &loaders)
        .await
        .context("ingestion failed; the previous index is unchanged")?;
    println!(
        "Indexed {} passages from {} documents (generation {}).",
        report.passages, report.documents, report.generation
    );
    Ok(())
}

async fn chat(app: &App<AnyProvider>, top_k: Option<usize>, show_chunks: bool) -> anyhow::Result<()> {
    if app.handle.snapshot().is_none() {
        anyhow::bail!("no index available; run `cite ingest <paths>...` first");
    }
    println!("Ask about your documents. Type `history` to review, `exit` or `quit` to leave.");

    let mut turns: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }
        if query == "history" {
            print!("{}", render_history(&turns));
            continue;
        }

        turns.push(Message::user(query));
        let result = tokio::select! {
            result = app.engine.ask(query, top_k) => result,
            _ = tokio::signal::ctrl_c() => {
                println!("\n(cancelled)");
                turns.pop();
                continue;
            }
        };
        match result {
            Ok(answer) => {
                print!("{}", render_answer(&answer, show_chunks));
                turns.push(Message::assistant(answer.text));
            }
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                eprintln!("error: {:#}", explain(e));
                turns.pop();
            }
        }
    }

    tracing::debug!(turns = turns.len(), "chat session ended");
    Ok(())
}

fn explain(e: RagError) -> anyhow::Error {
    let hint = match &e {
        RagError::NotIngested | RagError::CorpusIndexMismatch { .. } => {
            Some("run `cite ingest <paths>...` to rebuild the index")
        }
        RagError::ServiceUnavailable(_) => Some("the embedding service did not respond"),
        RagError::GenerationUnavailable(_) => Some("the generation service did not respond"),
        _ => None,
    };
    match hint {
        Some(hint) => anyhow::Error::new(e).context(hint),
        None => anyhow::Error::new(e),
    }
}

fn init_subscriber(log_file: Option<&Path>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(path) = log_file {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .init();
                return;
            }
            Err(e) => eprintln!("cannot open log file {}: {e}", path.display()),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

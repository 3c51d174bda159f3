//! Scope Estimate - Turn a scope document into a project estimate and refine it.
//!
//! Uploads a scope document (PDF) to an estimation service, renders the
//! returned estimate in the terminal, applies free-text feedback to regenerate
//! it, and downloads the result as PDF or DOCX.
//!
//! Quick start:
//!   scope-estimate config init                         # Write ~/.scope-estimate/config.toml
//!   scope-estimate generate scope.pdf --export pdf     # One-shot estimate + download
//!   scope-estimate session scope.pdf                   # Interactive refine loop
//!   scope-estimate render estimation.md -f json        # Inspect a saved estimate

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{format_estimate, OutputFormat, Workflow};
use cli::{Cli, Commands, ConfigAction};
use domain::{AppConfig, AppError, OutputKind};
use infrastructure::{
    ensure_config_exists, load_config, load_document, render_config, FileDownloadSink,
    HttpEstimationClient,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| AppError::Config { message: e })?;

    match &cli.command {
        Commands::Generate {
            file,
            feedback,
            export,
            raw,
        } => {
            let config = effective_config(&cli)?;
            let format = if *raw { OutputFormat::Markdown } else { format };
            cmd_generate(&config, file, feedback, export, format).await?;
        }
        Commands::Session { file } => {
            let config = effective_config(&cli)?;
            cmd_session(&config, file.as_deref(), format).await?;
        }
        Commands::Render { file } => {
            cmd_render(file, format)?;
        }
        Commands::Config { action } => {
            cmd_config(action, &cli)?;
        }
    }

    Ok(())
}

/// Config file merged with command-line overrides.
fn effective_config(cli: &Cli) -> domain::Result<AppConfig> {
    let mut config = load_config(cli.config.as_deref())?;

    if let Some(server) = &cli.server {
        config.service.base_url.clone_from(server);
    }
    if let Some(dir) = &cli.out_dir {
        config.download.dir = Some(dir.clone());
    }

    Ok(config)
}

/// Wire the HTTP client and download directory into a workflow.
fn build_workflow(config: &AppConfig) -> domain::Result<Arc<Workflow>> {
    let client = HttpEstimationClient::new(config.service.clone())?;
    let sink = FileDownloadSink::new(config.download.dir());

    tracing::info!(
        server = client.base_url(),
        downloads = %sink.dir().display(),
        "Estimation workflow ready"
    );

    Ok(Arc::new(Workflow::new(Arc::new(client), Arc::new(sink))))
}

/// One-shot generate, refine and export.
async fn cmd_generate(
    config: &AppConfig,
    file: &Path,
    feedback: &[String],
    exports: &[OutputKind],
    format: OutputFormat,
) -> domain::Result<()> {
    let workflow = build_workflow(config)?;
    workflow.select_document(load_document(file)?);

    eprintln!("{}", "Processing...".yellow());
    let mut estimate = workflow.submit_document().await?;

    for (i, text) in feedback.iter().enumerate() {
        eprintln!(
            "{} ({}/{})",
            "Regenerating...".yellow(),
            i + 1,
            feedback.len()
        );
        estimate = workflow.refine(text.as_str()).await?;
    }

    let output = format_estimate(estimate.as_str(), format).map_err(AppError::json_parse)?;
    println!("{output}");

    for kind in exports {
        let saved = workflow.request_export(*kind).await?;
        eprintln!(
            "{} Saved {} to {} ({} bytes)",
            "✓".green().bold(),
            saved.kind,
            saved.path.display(),
            saved.size_bytes
        );
    }

    Ok(())
}

/// Interactive session command.
async fn cmd_session(
    config: &AppConfig,
    file: Option<&Path>,
    format: OutputFormat,
) -> domain::Result<()> {
    let workflow = build_workflow(config)?;

    if let Some(path) = file {
        let document = load_document(path)?;
        println!(
            "{} Selected {} ({} bytes)",
            "✓".green().bold(),
            document.file_name.cyan(),
            document.size_bytes()
        );
        workflow.select_document(document);
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    cli::session::run_session(workflow, stdin, format).await
}

/// Render a saved estimate file.
fn cmd_render(file: &Path, format: OutputFormat) -> domain::Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| AppError::io(format!("Failed to read {}", file.display()), e))?;

    let output = format_estimate(&text, format).map_err(AppError::json_parse)?;
    println!("{output}");

    Ok(())
}

/// Configuration management command.
fn cmd_config(action: &ConfigAction, cli: &Cli) -> domain::Result<()> {
    let path: PathBuf = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);

    match action {
        ConfigAction::Init => {
            let (path, created) = ensure_config_exists(Some(&path))?;
            if created {
                println!("{} Created {}", "✓".green().bold(), path.display());
            } else {
                println!("Config already exists: {}", path.display());
            }
        }
        ConfigAction::Show => {
            let config = effective_config(cli)?;
            println!("{}", format!("# {}", path.display()).dimmed());
            println!("{}", render_config(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

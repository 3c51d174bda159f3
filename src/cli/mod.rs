//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

pub mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;
use crate::domain::OutputKind;

/// Scope Estimate - Turn a scope document into a project estimate and refine it.
///
/// Typical use: scope-estimate generate scope.pdf --feedback "add QA" --export pdf
#[derive(Parser, Debug)]
#[command(name = "scope-estimate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: terminal, json, or markdown.
    #[arg(short, long, default_value = "terminal", global = true)]
    pub format: String,

    /// Config file path (default: ~/.scope-estimate/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Estimation service base URL, overrides the config file.
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Directory downloads are saved to, overrides the config file.
    #[arg(long, global = true)]
    pub out_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an estimate from a scope document in one go.
    Generate {
        /// Scope document (PDF).
        file: PathBuf,

        /// Feedback to apply after generation (repeat to refine in order).
        #[arg(long = "feedback", value_name = "TEXT")]
        feedback: Vec<String>,

        /// Download the final estimate (pdf or docx, may be repeated).
        #[arg(short, long = "export", value_name = "KIND")]
        export: Vec<OutputKind>,

        /// Print the estimate markup instead of rendering it.
        #[arg(long)]
        raw: bool,
    },

    /// Interactive session: generate, refine with feedback and download.
    Session {
        /// Scope document to select on start.
        file: Option<PathBuf>,
    },

    /// Render a saved estimate (Markdown file) without contacting the service.
    Render {
        /// Markdown file to render.
        file: PathBuf,
    },

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the default config file if none exists.
    Init,
    /// Print the effective configuration.
    Show,
    /// Print the config file path.
    Path,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

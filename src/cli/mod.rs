//! CLI adapter for codeindex
//!
//! Provides the command-line interface over one workspace handle.
//! The adapter only depends on `core/`; every operation goes
//! through [`Workspace`](crate::core::Workspace).
//!
//! # Architecture
//!
//! ```text
//!              +------------------+
//!              |     core/        |
//!              |  (domain logic)  |
//!              +--------+---------+
//!                       |
//!                       v
//!              +------------------+
//!              |      cli/        |
//!              | (clap adapter)   |
//!              +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// codeindex - BM25 code search for a workspace
///
/// Index the files of a directory tree into overlapping chunks and
/// search them with BM25 ranking.
#[derive(Parser, Debug)]
#[command(name = "codeindex")]
#[command(version)]
#[command(about = "Index and search a code workspace", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Workspace root
    #[arg(long, global = true, default_value = ".", env = "CODEINDEX_ROOT")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build (or rebuild) the workspace index
    Build(commands::BuildArgs),

    /// Search the workspace index
    Search(commands::SearchArgs),

    /// Show the index status
    Status(commands::StatusArgs),

    /// Delete the workspace index from disk
    Clear(commands::ClearArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  codeindex completions bash > ~/.local/share/bash-completion/completions/codeindex
    ///   zsh:   codeindex completions zsh > ~/.zfunc/_codeindex
    ///   fish:  codeindex completions fish > ~/.config/fish/completions/codeindex.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::services::Workspace;
    use crate::core::xdg::XdgDirs;
    use std::sync::Arc;

    // Handle completions command early (doesn't need a workspace)
    let command = match cli.command {
        Commands::Completions(args) => return commands::completions::execute(args),
        command => command,
    };

    // Initialize XDG directories
    let xdg = XdgDirs::new();
    xdg.ensure_dirs_exist()?;
    xdg.log_paths();

    // Load configuration
    let config = Config::load_with_xdg(&xdg)?;
    config.log_config();

    if let Commands::ShowConfig(args) = command {
        return commands::config::execute(args, &config, &xdg, cli.format);
    }

    let workspace: Arc<Workspace> = Arc::new(Workspace::open(&cli.root, config)?);

    match command {
        Commands::Build(args) => commands::build::execute(args, &workspace, cli.format).await,
        Commands::Search(args) => commands::search::execute(args, &workspace, cli.format).await,
        Commands::Status(args) => commands::status::execute(args, &workspace, cli.format),
        Commands::Clear(args) => commands::clear::execute(args, &workspace, cli.format),
        Commands::ShowConfig(_) | Commands::Completions(_) => Ok(()),
    }
}

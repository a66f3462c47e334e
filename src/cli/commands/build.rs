//! Build command - index the workspace

use crate::cli::output::{colors, format_millis, format_progress, print_json, print_warning};
use crate::cli::OutputFormat;
use crate::core::config::IndexOptionsOverride;
use crate::core::services::Workspace;
use crate::core::types::BuildResponse;
use clap::Args;
use std::io::Write;
use std::sync::Arc;

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Files read per indexing batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Characters per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Approximate character overlap between chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Skip files larger than this many KB
    #[arg(long)]
    pub max_file_size_kb: Option<u64>,

    /// Glob patterns to exclude (replaces the configured list)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    /// File extensions to index (replaces the configured list)
    #[arg(long = "include-ext", short = 'x')]
    pub include_ext: Vec<String>,

    /// Suppress progress output
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl BuildArgs {
    /// Options this invocation overrides
    pub fn overrides(&self) -> IndexOptionsOverride {
        IndexOptionsOverride {
            batch_size: self.batch_size,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            max_file_size_kb: self.max_file_size_kb,
            exclude_patterns: (!self.exclude.is_empty()).then(|| self.exclude.clone()),
            include_extensions: (!self.include_ext.is_empty()).then(|| self.include_ext.clone()),
        }
    }
}

/// Execute the build command
///
/// Progress goes to stderr; Ctrl-C cancels the build and leaves the
/// previous index in place.
pub async fn execute(
    args: BuildArgs,
    workspace: &Arc<Workspace>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let show_progress = !args.quiet && format == OutputFormat::Human;

    if show_progress {
        eprintln!(
            "Indexing {}...",
            colors::file_path(&workspace.root().display().to_string())
        );
    }

    let mut handle = match workspace.spawn_build(&args.overrides()) {
        Ok(handle) => handle,
        Err(e) => {
            if format == OutputFormat::Json {
                print_json(&BuildResponse::failure(&e, 0, 0, 0))?;
            }
            return Err(e.into());
        }
    };

    let cancel = handle.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            print_warning("Interrupted, cancelling build...");
            cancel.cancel();
        }
    });

    let mut rendered = false;
    while let Some(progress) = handle.progress.recv().await {
        if show_progress {
            eprint!("\r{:<100}", format_progress(&progress));
            let _ = std::io::stderr().flush();
            rendered = true;
        }
    }
    if rendered {
        eprintln!();
    }

    let response = handle.wait().await;
    interrupt.abort();

    match format {
        OutputFormat::Human if response.success => {
            println!(
                "{} {} files ({} documents) in {}",
                colors::success("Indexed"),
                colors::number(&response.file_count.to_string()),
                colors::number(&response.document_count.to_string()),
                colors::number(&format_millis(response.build_time_ms))
            );
            if let Some(path) = &response.index_file_path {
                println!("Index: {}", colors::file_path(&path.display().to_string()));
            }
        }
        OutputFormat::Human => {
            if response.is_cancelled() {
                print_warning("Build cancelled; the previous index is unchanged");
            }
        }
        OutputFormat::Json => print_json(&response)?,
    }

    if response.success {
        Ok(())
    } else {
        Err(response
            .error_message
            .unwrap_or_else(|| "Build failed".to_string())
            .into())
    }
}

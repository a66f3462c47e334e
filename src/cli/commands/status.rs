//! Status command - show the index status

use crate::cli::output::{colors, format_relative_time, format_state, print_header, print_json};
use crate::cli::OutputFormat;
use crate::core::services::Workspace;
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Execute the status command
pub fn execute(
    _args: StatusArgs,
    workspace: &Arc<Workspace>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = workspace.get_status();

    match format {
        OutputFormat::Human => {
            print_header(&format!("Workspace {}", workspace.root().display()));
            println!("  State:      {}", format_state(status.state));
            println!(
                "  Files:      {}",
                colors::number(&status.file_count.to_string())
            );
            println!(
                "  Documents:  {}",
                colors::number(&status.document_count.to_string())
            );
            match &status.last_build_time {
                Some(time) => println!(
                    "  Last build: {} {}",
                    time.format("%Y-%m-%d %H:%M:%S UTC"),
                    colors::dim(&format!("({})", format_relative_time(time)))
                ),
                None => println!("  Last build: {}", colors::dim("never")),
            }
            println!(
                "  Index file: {}",
                colors::file_path(&workspace.index_paths().index_file.display().to_string())
            );
            if let Some(message) = &status.error_message {
                println!("  Error:      {}", colors::error(message));
            }
        }
        OutputFormat::Json => print_json(&status)?,
    }

    Ok(())
}

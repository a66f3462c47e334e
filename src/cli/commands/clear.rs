//! Clear command - delete the workspace index

use crate::cli::output::{print_json, print_success};
use crate::cli::OutputFormat;
use crate::core::services::Workspace;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the clear command
#[derive(Args, Debug)]
pub struct ClearArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClearResponse {
    success: bool,
    index_file_path: String,
}

/// Execute the clear command
pub fn execute(
    _args: ClearArgs,
    workspace: &Arc<Workspace>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    workspace.clear_index()?;

    let index_file_path = workspace.index_paths().index_file.display().to_string();
    match format {
        OutputFormat::Human => print_success(&format!("Cleared index {index_file_path}")),
        OutputFormat::Json => print_json(&ClearResponse {
            success: true,
            index_file_path,
        })?,
    }

    Ok(())
}

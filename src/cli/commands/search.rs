//! Search command - search the workspace index

use crate::cli::output::{colors, print_json};
use crate::cli::OutputFormat;
use crate::core::services::Workspace;
use crate::core::types::{SearchOptions, SearchProperty, SearchRequest};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search terms; code punctuation is fine
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'k')]
    pub limit: Option<usize>,

    /// Fraction of terms a hit may miss (0 = all terms required)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Only keep files with this extension (repeatable)
    #[arg(long)]
    pub ext: Vec<String>,

    /// Only keep files under this path prefix (repeatable)
    #[arg(long)]
    pub path: Vec<String>,

    /// Fields to search (repeatable, default: both)
    #[arg(long, value_enum)]
    pub property: Vec<PropertyArg>,

    /// Only show file paths (no content)
    #[arg(long)]
    pub files_only: bool,
}

/// Searchable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PropertyArg {
    Content,
    FilePath,
}

impl From<PropertyArg> for SearchProperty {
    fn from(arg: PropertyArg) -> Self {
        match arg {
            PropertyArg::Content => SearchProperty::Content,
            PropertyArg::FilePath => SearchProperty::FilePath,
        }
    }
}

impl SearchArgs {
    /// Request for these arguments
    pub fn request(&self) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            options: SearchOptions {
                limit: self.limit,
                threshold: self.threshold,
                filter_extensions: self.ext.clone(),
                filter_paths: self.path.clone(),
                properties: (!self.property.is_empty())
                    .then(|| self.property.iter().map(|p| (*p).into()).collect()),
            },
        }
    }
}

/// Search result item
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub rank: usize,
    pub file: String,
    pub score: f32,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Files-only JSON output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilesOutput {
    pub query: String,
    pub total_matches: usize,
    pub results: Vec<SearchResultItem>,
}

/// Execute the search command
pub async fn execute(
    args: SearchArgs,
    workspace: &Arc<Workspace>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = workspace.search(&args.request()).await?;

    if format == OutputFormat::Json {
        if args.files_only {
            print_json(&SearchFilesOutput {
                query: response.query.clone(),
                total_matches: response.total_matches,
                results: response
                    .results
                    .iter()
                    .enumerate()
                    .map(|(i, hit)| SearchResultItem {
                        rank: i + 1,
                        file: hit.document.file_path.clone(),
                        score: hit.score,
                        start_line: hit.document.start_line,
                        end_line: hit.document.end_line,
                        text: None,
                    })
                    .collect(),
            })?;
        } else {
            print_json(&response)?;
        }
        return Ok(());
    }

    if response.results.is_empty() {
        println!("No results found for '{}'", colors::label(&args.query));
        return Ok(());
    }

    println!(
        "Found {} result(s) in {}ms:\n",
        colors::number(&response.total_matches.to_string()),
        response.execution_time_ms
    );

    for (i, hit) in response.results.iter().enumerate() {
        let doc = &hit.document;
        if args.files_only {
            println!("{}", colors::file_path(&doc.file_path));
            continue;
        }

        println!(
            "[{}] {}:{}-{} {}",
            colors::rank(&(i + 1).to_string()),
            colors::file_path(&doc.file_path),
            doc.start_line,
            doc.end_line,
            colors::score(&format!("(score: {:.2})", hit.score))
        );
        for line in doc.content.lines().take(5) {
            let truncated = if line.chars().count() > 100 {
                format!("{}...", line.chars().take(97).collect::<String>())
            } else {
                line.to_string()
            };
            println!("    {}", colors::dim(&truncated));
        }
        println!();
    }

    Ok(())
}

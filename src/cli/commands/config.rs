//! Config command - show current configuration

use crate::cli::output::print_json;
use crate::cli::OutputFormat;
use crate::core::config::{Config, IndexOptions, SearchConfig};
use crate::core::xdg::XdgDirs;
use clap::Args;
use serde::Serialize;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also list exclude patterns and include extensions
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Configuration response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse<'a> {
    pub config_file: String,
    pub index_dir: String,
    pub indexing: &'a IndexOptions,
    pub search: &'a SearchConfig,
}

/// Execute the config command
pub fn execute(
    args: ConfigArgs,
    config: &Config,
    xdg: &XdgDirs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = ConfigResponse {
        config_file: xdg.config_file().display().to_string(),
        index_dir: config.storage.index_dir.display().to_string(),
        indexing: &config.indexing,
        search: &config.search,
    };

    match format {
        OutputFormat::Human => {
            let indexing = response.indexing;
            println!("Configuration:");
            println!("  config_file: {}", response.config_file);
            println!("  index_dir: {}", response.index_dir);
            println!("  indexing:");
            println!("    batch_size: {}", indexing.batch_size);
            println!("    chunk_size: {}", indexing.chunk_size);
            println!("    chunk_overlap: {}", indexing.chunk_overlap);
            println!("    max_file_size_kb: {}", indexing.max_file_size_kb);
            if args.all {
                println!("    include_extensions: {:?}", indexing.include_extensions);
                println!("    exclude_patterns: {:?}", indexing.exclude_patterns);
            } else {
                println!(
                    "    include_extensions: {} entries",
                    indexing.include_extensions.len()
                );
                println!(
                    "    exclude_patterns: {} patterns",
                    indexing.exclude_patterns.len()
                );
            }
            println!("  search:");
            println!("    default_limit: {}", response.search.default_limit);
            println!("    max_limit: {}", response.search.max_limit);
            println!("    max_query_length: {}", response.search.max_query_length);
            println!("    default_threshold: {}", response.search.default_threshold);
        }
        OutputFormat::Json => print_json(&response)?,
    }

    Ok(())
}

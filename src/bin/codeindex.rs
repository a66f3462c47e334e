//! codeindex CLI - index and search a workspace from the shell
//!
//! # Examples
//!
//! ```bash
//! # Index the current directory
//! codeindex build
//!
//! # Index another tree with smaller chunks
//! codeindex --root ~/src/app build --chunk-size 500 -x ts -x tsx
//!
//! # Search
//! codeindex search "useEffect cleanup" -k 5
//!
//! # Inspect or drop the index
//! codeindex status
//! codeindex clear
//! ```
//!
//! Logs go to stderr. `RUST_LOG` overrides the default
//! `codeindex=info` filter, and `CODEINDEX_LOG_FORMAT=json` switches
//! to JSON lines.

use clap::Parser;
use codeindex::cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "codeindex=info".into());
    let json = std::env::var("CODEINDEX_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // stdout carries command output only
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

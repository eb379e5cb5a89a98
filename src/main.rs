// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, so it never mixes with the report or JSON)
// 3. Arrange for Ctrl-C to cancel the checks in flight
// 4. Run the check and exit with the proper code
//    (0 = every link valid, 1 = invalid links or an error)
//
// Rust concepts used:
// - async/await: validators talk to the network and the filesystem
// - Result<T, E>: For error handling (T = success type, E = error type)
// - match: Pattern matching to handle different subcommands
// =============================================================================

// Module declarations - tells Rust about our other source files
mod app; // src/app.rs - wires config, scanner, dispatcher and reporter
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - the YAML configuration file
mod dispatch; // src/dispatch.rs - routes links to validators
mod error; // src/error.rs - typed errors
mod link; // src/link.rs - the records flowing through the pipeline
mod render; // src/render/ - Markdown to HTML, and HTML queries
mod report; // src/report.rs - human and JSON output
mod scan; // src/scan/ - finds documents and their links
mod validator; // src/validator/ - the link validators

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let exit_code = match run(cli).await {
        Ok(false) => 0,
        Ok(true) => 1,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

// Returns: Ok(true) when invalid links were found
async fn run(cli: Cli) -> Result<bool> {
    let ctx = CancellationToken::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling the pending checks");
            interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Check { path, config, json } => {
            let config = config::Config::from_file(&config)?;
            app::run(&ctx, &path, &config, json).await
        }
    }
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,markdown_link_check=info",
        1 => "info,markdown_link_check=debug",
        2 => "debug,markdown_link_check=trace",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

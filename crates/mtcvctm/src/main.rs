//! mtcvctm CLI - Markdown to credential type metadata converter.
//!
//! Provides commands for:
//! - `generate`: Convert one markdown file into one or more metadata formats
//! - `batch`: Convert a directory tree and write a registry manifest

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BatchArgs, GenerateArgs};
use output::Output;

/// mtcvctm - Generate credential type metadata from markdown.
#[derive(Parser)]
#[command(name = "mtcvctm", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate metadata documents from a markdown file.
    Generate(GenerateArgs),
    /// Convert every markdown file in a directory.
    Batch(BatchArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Generate(args) => args.verbose,
            Self::Batch(args) => args.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Generate(args) => args.execute(),
        Commands::Batch(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

//! Etag CLI - Command line tool for ETag caching configuration.
//!
//! Commands:
//! - `etag check` - Validate a caching configuration file
//! - `etag explain` - Show the caching decision for a sample request
//! - `etag key` - Print the cache key of a request
//! - `etag tags` - Expand tag templates

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{CheckArgs, ExplainArgs, KeyArgs, TagsArgs};

/// Etag CLI - Validate and preview ETag caching configuration
#[derive(Parser)]
#[command(name = "etag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a caching configuration file
    Check(CheckArgs),

    /// Run a route's policies against a sample request
    Explain(ExplainArgs),

    /// Print the cache key of a request
    Key(KeyArgs),

    /// Expand tag templates with placeholder bindings
    Tags(TagsArgs),
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "etag_cache=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);
    let output = output::Output::new(cli.verbose, cli.json);

    let result = match cli.command {
        Commands::Check(args) => commands::check::run(args, &output).await,
        Commands::Explain(args) => commands::explain::run(args, &output).await,
        Commands::Key(args) => commands::key::run(args, &output),
        Commands::Tags(args) => commands::tags::run(args, &output),
    };

    if let Err(e) = result {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

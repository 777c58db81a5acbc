//! # Textbase CLI
//!
//! Command-line client of the Textbase bot deployment service.
//!
//! # Packaging
//!
//! Bot projects are packaged as deflate-compressed ZIP archives. A project
//! directory must contain `main.py` and `requirements.txt` at its root; every
//! file beneath it is stored under its relative path. See [`archiver`].
//!
//! # Deployment
//!
//! Archives are uploaded as a multipart form along with the bot name, and the
//! deployment summary returned by the service is parsed into a table.
//! Remaining subcommands (`health`, `list`, `delete`) are thin wrappers over the
//! same service. See [`client`].
//!
//! # Local testing
//!
//! The `test` subcommand serves a bot module locally using the functions
//! framework, alongside the chat UI. See [`process`].

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use clap::Parser;
use commands::{Cli, Commands};
use common::{config::Config, logging};

/// Bot project archiving utilities.
mod archiver;

/// Remote deployment service client.
mod client;

/// CLI subcommands.
mod commands;

/// Local test server process management.
mod process;

/// Interactive fallbacks for missing arguments.
mod prompt;

/// Remote service response model.
mod response;

/// Text table rendering.
mod table;

/// Test utilities.
#[cfg(test)]
mod testing;

/// CLI entrypoint.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let config = Config::new(cli.config_file)?;

    logging::init(&config.logging);

    match cli.command {
        Commands::Test(args) => commands::test(args, &config).await?,
        Commands::Compress(args) => commands::compress(args)?,
        Commands::Deploy(args) => commands::deploy(args, &config).await?,
        Commands::Health(args) => commands::health(args, &config).await?,
        Commands::List(args) => commands::list(args, &config).await?,
        Commands::Delete(args) => commands::delete(args, &config).await?,
    }

    Ok(())
}

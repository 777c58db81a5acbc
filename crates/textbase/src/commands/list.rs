use std::io;

use colored::Colorize;
use common::config::Config;
use derive_more::{Display, Error, From};

use crate::{
    client::{ApiClient, RequestError},
    commands::{spinner, List},
    prompt, table,
};

/// `list` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ListError {
    /// IO-related error.
    Io(io::Error),

    /// Remote service request error.
    Request(RequestError),
}

/// Bot listing flow entrypoint.
pub(crate) async fn list(List { api_key }: List, config: &Config) -> Result<(), ListError> {
    let api_key = prompt::api_key(api_key)?;

    println!("{}", "Getting the list of bots...".green());

    let progress = spinner("Fetching...");
    let result = ApiClient::new(config.endpoints.clone()).list(&api_key).await;
    progress.finish_and_clear();

    let bots = match result {
        Ok(bots) => bots,
        Err(error) => {
            println!("{}", "Something went wrong!".red());
            return Err(error.into());
        }
    };

    let records = bots.iter().map(|bot| bot.to_record()).collect::<Vec<_>>();

    match table::render(&records) {
        Ok(table) => {
            println!("{}", "List of bots:".blue());
            println!("{table}");
        }
        Err(_) => println!("{}", "No bots found.".yellow()),
    }

    Ok(())
}

use std::io;

use colored::Colorize;
use common::config::Config;
use derive_more::{Display, Error, From};

use crate::{
    client::{ApiClient, RequestError},
    commands::{spinner, Delete},
    prompt,
    table::{self, record_from_object},
};

/// `delete` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeleteError {
    /// IO-related error.
    Io(io::Error),

    /// Remote service request error.
    Request(RequestError),
}

/// Bot removal flow entrypoint.
pub(crate) async fn delete(
    Delete { bot_id, api_key }: Delete,
    config: &Config,
) -> Result<(), DeleteError> {
    let bot_id = prompt::text(bot_id, "Id of the bot")?;
    let api_key = prompt::api_key(api_key)?;

    println!("{}", format!("Deleting bot '{bot_id}'...").red());

    let progress = spinner("Deleting...");
    let result = ApiClient::new(config.endpoints.clone())
        .delete(&bot_id, &api_key)
        .await;
    progress.finish_and_clear();

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            println!("{}", "Something went wrong!".red());
            return Err(error.into());
        }
    };

    println!(
        "{}",
        format!("Bot '{bot_id}' deleted successfully!").green()
    );

    match table::render(&[record_from_object(&response)]) {
        Ok(table) => println!("{table}"),
        Err(_) => println!("No data found in the response."),
    }

    Ok(())
}

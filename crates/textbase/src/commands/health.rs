use std::io;

use colored::Colorize;
use common::config::Config;
use derive_more::{Display, Error, From};

use crate::{
    client::{ApiClient, RequestError},
    commands::{spinner, Health},
    prompt,
    table::{self, record_from_object},
};

/// `health` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum HealthError {
    /// IO-related error.
    Io(io::Error),

    /// Remote service request error.
    Request(RequestError),
}

/// Health check flow entrypoint.
pub(crate) async fn health(
    Health { bot_id, api_key }: Health,
    config: &Config,
) -> Result<(), HealthError> {
    let bot_id = prompt::text(bot_id, "Id of the bot")?;
    let api_key = prompt::api_key(api_key)?;

    println!("{}", format!("Checking health of bot '{bot_id}'").green());

    let progress = spinner("Checking...");
    let result = ApiClient::new(config.endpoints.clone())
        .health(&bot_id, &api_key)
        .await;
    progress.finish_and_clear();

    let status = match result {
        Ok(status) => status,
        Err(error) => {
            report_failure(&error);
            return Err(error.into());
        }
    };

    match table::render(&[record_from_object(&status)]) {
        Ok(table) => {
            println!("{}", "Bot status:".green());
            println!("{table}");
        }
        Err(_) => println!("{}", "Status information not found in the response.".red()),
    }

    Ok(())
}

/// Get the user-facing description of a failed health check.
fn failure_message(error: &RequestError) -> String {
    match error {
        RequestError::RemoteRejected { body } => {
            format!("Status information not found in the response.\n{body}")
        }
        RequestError::TransportFailure { .. } => String::from("Failed to retrieve bot status."),
    }
}

/// Print the description of a failed health check.
fn report_failure(error: &RequestError) {
    println!("{}", failure_message(error).red());
}

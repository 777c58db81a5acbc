use std::io;

use colored::Colorize;
use common::config::Config;
use derive_more::{Display, Error, From};

use crate::{
    client::{ApiClient, UploadError},
    commands::{spinner, Deploy},
    prompt, table,
};

/// `deploy` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeployError {
    /// IO-related error.
    Io(io::Error),

    /// Bot archive upload error.
    Upload(UploadError),
}

/// Deployment flow entrypoint.
pub(crate) async fn deploy(
    Deploy {
        path,
        bot_name,
        api_key,
    }: Deploy,
    config: &Config,
) -> Result<(), DeployError> {
    let path = prompt::path(path, "Path to the zip folder")?;
    let bot_name = prompt::bot_name(bot_name)?;
    let api_key = prompt::api_key(api_key)?;

    println!(
        "{}",
        format!(
            "Deploying bot '{bot_name}' with zip folder from path: {}",
            path.display()
        )
        .yellow()
    );

    let client = ApiClient::new(config.endpoints.clone());

    let progress = spinner("Uploading...");
    let result = client.deploy(&path, &bot_name, &api_key).await;
    progress.finish_and_clear();

    let deployment = match result {
        Ok(deployment) => deployment,
        Err(error) => {
            println!("{}", "Something went wrong! ❌".red());
            return Err(error.into());
        }
    };

    println!("{}", "Upload completed successfully! ✅".green());
    println!("{}", "Deployment details:".blue());

    if let Ok(table) = table::render(&[deployment.to_record()]) {
        println!("{table}");
    }

    Ok(())
}

/// `compress` subcommand.
mod compress;

/// `delete` subcommand.
mod delete;

/// `deploy` subcommand.
mod deploy;

/// `health` subcommand.
mod health;

/// `list` subcommand.
mod list;


pub(crate) use compress::compress;
pub(crate) use delete::delete;
pub(crate) use deploy::deploy;
pub(crate) use health::health;
pub(crate) use list::list;
pub(crate) use test::test;

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;

use crate::{archiver::DEFAULT_ARCHIVE_NAME, client::is_valid_bot_name};

/// Environment variable that may hold the API key.
const API_KEY_ENV: &str = "TEXTBASE_API_KEY";

/// CLI configuration.
#[derive(Parser)]
#[command(about)]
pub(crate) struct Cli {
    /// Configuration file path.
    #[arg(short, long)]
    pub config_file: Option<PathBuf>,

    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Serve a bot locally together with the chat UI.
    Test(Test),

    /// Package a bot project into a ZIP archive.
    Compress(Compress),

    /// Upload a bot archive to the deployment service.
    Deploy(Deploy),

    /// Check the health of a deployed bot.
    Health(Health),

    /// List deployed bots.
    List(List),

    /// Delete a deployed bot.
    Delete(Delete),
}

/// `test` subcommand configuration.
#[derive(Args)]
pub struct Test {
    /// Path to the bot's main.py file.
    #[arg(long)]
    path: Option<PathBuf>,

    /// Port the bot is served on.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

/// `compress` subcommand configuration.
#[derive(Args)]
pub struct Compress {
    /// Path to the directory containing main.py and requirements.txt files.
    #[arg(long)]
    path: Option<PathBuf>,

    /// Path where the archive is written.
    #[arg(long, default_value = DEFAULT_ARCHIVE_NAME)]
    output: PathBuf,
}

/// `deploy` subcommand configuration.
#[derive(Args)]
pub struct Deploy {
    /// Path to the ZIP archive.
    #[arg(long)]
    path: Option<PathBuf>,

    /// Bot name, made of lowercase letters, digits, hyphens and underscores.
    #[arg(long = "bot_name", alias = "bot-name", value_parser = parse_bot_name)]
    bot_name: Option<String>,

    /// Textbase API key.
    #[arg(long = "api_key", alias = "api-key", env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,
}

/// `health` subcommand configuration.
#[derive(Args)]
pub struct Health {
    /// Bot identifier, as shown by the `list` subcommand.
    #[arg(long = "bot_id", alias = "bot-id")]
    bot_id: Option<String>,

    /// Textbase API key.
    #[arg(long = "api_key", alias = "api-key", env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,
}

/// `list` subcommand configuration.
#[derive(Args)]
pub struct List {
    /// Textbase API key.
    #[arg(long = "api_key", alias = "api-key", env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,
}

/// `delete` subcommand configuration.
#[derive(Args)]
pub struct Delete {
    /// Bot identifier, as shown by the `list` subcommand.
    #[arg(long = "bot_id", alias = "bot-id")]
    bot_id: Option<String>,

    /// Textbase API key.
    #[arg(long = "api_key", alias = "api-key", env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,
}

/// Validate the bot name passed as a flag.
fn parse_bot_name(value: &str) -> Result<String, String> {
    if is_valid_bot_name(value) {
        Ok(value.to_owned())
    } else {
        Err(String::from(
            "bot name can only contain lowercase alphanumeric characters, hyphens, and underscores",
        ))
    }
}

/// Create a spinner that ticks while a blocking step is in progress.
fn spinner(message: &'static str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();

    progress.enable_steady_tick(Duration::from_millis(150));
    progress.set_message(message);

    progress
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_flags() {
        let cli = Cli::try_parse_from([
            "textbase",
            "deploy",
            "--path",
            "deploy.zip",
            "--bot_name",
            "echo-bot",
            "--api_key",
            "secret-key",
        ])
        .unwrap();

        let Commands::Deploy(deploy) = cli.command else {
            panic!("expected deploy subcommand");
        };

        assert_eq!(deploy.path, Some(PathBuf::from("deploy.zip")));
        assert_eq!(deploy.bot_name.as_deref(), Some("echo-bot"));
        assert_eq!(deploy.api_key.as_deref(), Some("secret-key"));
    }

    #[test]
    fn invalid_bot_name_flag() {
        let result = Cli::try_parse_from([
            "textbase",
            "deploy",
            "--path",
            "deploy.zip",
            "--bot_name",
            "Echo Bot",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["textbase", "test", "--path", "main.py"]).unwrap();
        let Commands::Test(test) = cli.command else {
            panic!("expected test subcommand");
        };
        assert_eq!(test.port, 8080);

        let cli = Cli::try_parse_from(["textbase", "compress"]).unwrap();
        let Commands::Compress(compress) = cli.command else {
            panic!("expected compress subcommand");
        };
        assert_eq!(compress.path, None);
        assert_eq!(compress.output, PathBuf::from(DEFAULT_ARCHIVE_NAME));
    }
}

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[cfg(feature = "logging")]
use tracing_subscriber::filter::LevelFilter;

/// Remote deployment service endpoints.
#[derive(Deserialize, Clone, Debug)]
pub struct Endpoints {
    /// Base URL for the bot management routes (`/bot-health`, `/list`, `/delete`).
    #[serde(default = "default_deploy_url")]
    pub deploy_url: String,

    /// URL that accepts bot archive uploads.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            deploy_url: default_deploy_url(),
            upload_url: default_upload_url(),
        }
    }
}

fn default_deploy_url() -> String {
    String::from("https://us-east1-chat-agents.cloudfunctions.net/deploy-from-cli")
}

fn default_upload_url() -> String {
    String::from("https://us-east1-chat-agents.cloudfunctions.net/upload-file")
}

/// Implementation of [`serde`]'s deserializer for [`FromStr`] types.
///
/// [`FromStr`]: std::str::FromStr
#[cfg(feature = "logging")]
fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error,
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
}

/// Logging configuration.
#[cfg(feature = "logging")]
#[derive(Deserialize)]
pub struct Logging {
    /// Log level.
    #[serde(deserialize_with = "deserialize_from_str")]
    pub level: LevelFilter,
}

#[cfg(feature = "logging")]
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
        }
    }
}

/// Local test server configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Local {
    /// Port the local chat UI listens on.
    #[serde(default = "default_ui_port")]
    pub ui_port: u16,

    /// Python interpreter used to launch the chat UI.
    #[serde(default = "default_python")]
    pub python: String,

    /// Python module that hosts the chat UI, launched with `-m`.
    #[serde(default = "default_ui_module")]
    pub ui_module: String,

    /// Functions framework executable that serves the bot entry point.
    #[serde(default = "default_functions_framework")]
    pub functions_framework: String,
}

impl Default for Local {
    fn default() -> Self {
        Self {
            ui_port: default_ui_port(),
            python: default_python(),
            ui_module: default_ui_module(),
            functions_framework: default_functions_framework(),
        }
    }
}

fn default_ui_port() -> u16 {
    4000
}

fn default_python() -> String {
    if cfg!(unix) {
        String::from("python3")
    } else {
        String::from("python")
    }
}

fn default_ui_module() -> String {
    String::from("textbase.utils.server")
}

fn default_functions_framework() -> String {
    String::from("functions_framework")
}

/// General configuration.
#[derive(Deserialize, Default)]
pub struct Config {
    /// Remote service endpoints.
    #[serde(default)]
    pub endpoints: Endpoints,

    /// Logging configuration.
    #[cfg(feature = "logging")]
    #[serde(default)]
    pub logging: Logging,

    /// Local test server configuration.
    #[serde(default)]
    pub local: Local,
}

impl Config {
    /// Create new config using a configuration file and environment variables.
    ///
    /// When `path` is [`None`], `~/.textbase/config.toml` is used. A missing
    /// file is not an error; built-in defaults apply instead.
    ///
    /// Environment variables are prefixed with `TEXTBASE_` and use `__` to
    /// separate nested keys, e.g. `TEXTBASE_ENDPOINTS__UPLOAD_URL`.
    /// See [`Env`] for more details.
    ///
    /// [`Env`]: figment::providers::Env
    pub fn new(path: Option<PathBuf>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new();

        if let Some(path) = path.or_else(default_config_path) {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("TEXTBASE_").split("__"))
            .extract()
    }
}

/// Get the default configuration file path.
///
/// Returns [`None`] if home directory cannot be determined.
fn default_config_path() -> Option<PathBuf> {
    let mut home_dir = home::home_dir()?;
    home_dir.push(".textbase/config.toml");
    Some(home_dir)
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_| {
            let config = Config::new(Some(PathBuf::from("Missing.toml")))?;

            assert_eq!(config.endpoints.upload_url, default_upload_url());
            assert_eq!(config.endpoints.deploy_url, default_deploy_url());
            assert_eq!(config.local.ui_port, 4000);
            assert_eq!(config.local.ui_module, "textbase.utils.server");

            Ok(())
        });
    }

    #[test]
    fn file_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                    [endpoints]
                    deploy_url = "http://localhost:9000/deploy-from-cli"

                    [local]
                    ui_port = 4100
                "#,
            )?;
            jail.set_env("TEXTBASE_ENDPOINTS__UPLOAD_URL", "http://localhost:9000/upload");

            let config = Config::new(Some(PathBuf::from("Config.toml")))?;

            assert_eq!(
                config.endpoints.deploy_url,
                "http://localhost:9000/deploy-from-cli"
            );
            assert_eq!(config.endpoints.upload_url, "http://localhost:9000/upload");
            assert_eq!(config.local.ui_port, 4100);
            assert_eq!(config.local.functions_framework, "functions_framework");

            Ok(())
        });
    }
}

use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
};

use colored::Colorize;
use common::config::Local;
use derive_more::{Display, Error, From};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::{process::Command, signal};
use tracing::{debug, info};
use url::Url;

/// Name of the function every bot module must define.
pub(crate) const ENTRY_POINT: &str = "on_message";

/// Matches an unindented, optionally async, definition of the entry point function.
static ENTRY_POINT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m)^(async\s+)?def\s+{ENTRY_POINT}\s*\("))
        .expect("invalid regex string")
});

/// Local test server errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum LocalServerError {
    /// IO-related error.
    Io(io::Error),

    /// [`which`] crate was unable to locate a required executable.
    #[from(ignore)]
    #[display(fmt = "unable to locate {}: {}", program, source)]
    Which {
        /// Executable name.
        program: String,

        /// Lookup error.
        source: which::Error,
    },

    /// Unable to construct the chat UI URL.
    #[display(fmt = "unable to build UI URL: {}", _0)]
    Url(url::ParseError),
}

/// Check whether a bot module defines a top-level entry point function.
///
/// Bot modules are not loaded or executed. Instead, the source is expected to
/// contain a `def on_message(` (or `async def on_message(`) line without indentation.
pub(crate) fn defines_entry_point(source: &str) -> bool {
    ENTRY_POINT_REGEX.is_match(source)
}

/// Build the local chat UI URL that talks to the bot served on `api_port`.
pub(crate) fn ui_url(ui_port: u16, api_port: u16) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &format!("http://localhost:{ui_port}/"),
        [("API_URL", format!("http://localhost:{api_port}"))],
    )
}

/// Locate an executable on `PATH`.
fn locate(program: &str) -> Result<PathBuf, LocalServerError> {
    which::which(program).map_err(|source| LocalServerError::Which {
        program: program.to_owned(),
        source,
    })
}

/// Serve a bot module locally along with the chat UI.
///
/// Both processes are awaited until they exit. On Ctrl-C both are killed
/// and the function returns normally.
pub(crate) async fn serve_locally(
    config: &Local,
    main_path: &Path,
    port: u16,
) -> Result<(), LocalServerError> {
    let python = locate(&config.python)?;
    let functions_framework = locate(&config.functions_framework)?;

    debug!(python = %python.display(), module = %config.ui_module, "starting chat UI");

    let mut ui = Command::new(python)
        .arg("-m")
        .arg(&config.ui_module)
        .kill_on_drop(true)
        .spawn()?;

    debug!(
        functions_framework = %functions_framework.display(),
        source = %main_path.display(),
        port,
        "starting function runtime"
    );

    let mut runtime = Command::new(functions_framework)
        .arg(format!("--target={ENTRY_POINT}"))
        .arg(format!("--source={}", main_path.display()))
        .arg("--debug")
        .arg(format!("--port={port}"))
        .stdin(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let url = ui_url(config.ui_port, port)?;

    println!("{}", format!("Server URL: {url}").cyan().bold());

    tokio::select! {
        statuses = async { tokio::try_join!(ui.wait(), runtime.wait()) } => {
            let (ui_status, runtime_status) = statuses?;
            info!(%ui_status, %runtime_status, "local server exited");
        }
        interrupt = signal::ctrl_c() => {
            interrupt?;
            runtime.kill().await?;
            ui.kill().await?;
            println!("{}", "Server stopped.".red());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_point_detection() {
        assert!(defines_entry_point(
            "from textbase import bot\n\n@bot()\ndef on_message(message_history, state):\n    pass\n"
        ));
        assert!(defines_entry_point("async def on_message (history):\n    pass\n"));
    }

    #[test]
    fn entry_point_must_be_top_level_function() {
        assert!(!defines_entry_point(""));
        assert!(!defines_entry_point("def on_message_v2(history):\n    pass\n"));
        assert!(!defines_entry_point(
            "class Bot:\n    def on_message(self, history):\n        pass\n"
        ));
        assert!(!defines_entry_point("on_message = lambda history: None\n"));
        assert!(!defines_entry_point("# def on_message(history):\n"));
    }

    #[test]
    fn ui_url_encodes_api_url() {
        assert_eq!(
            ui_url(4000, 8080).unwrap().as_str(),
            "http://localhost:4000/?API_URL=http%3A%2F%2Flocalhost%3A8080"
        );
    }
}

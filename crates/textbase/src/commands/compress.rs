use std::io;

use colored::Colorize;
use derive_more::{Display, Error, From};
use tracing::info;

use crate::{
    archiver::{build_zip_archive, validate, PackagingError},
    commands::{spinner, Compress},
    prompt,
};

/// `compress` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum CompressError {
    /// IO-related error.
    Io(io::Error),

    /// Archive creation error.
    #[display(fmt = "unable to create zip archive: {}", _0)]
    Packaging(PackagingError),

    /// Project directory lacks required files.
    #[display(fmt = "project directory is missing required files")]
    InvalidProject,
}

/// Packaging flow entrypoint.
pub(crate) fn compress(Compress { path, output }: Compress) -> Result<(), CompressError> {
    let path = prompt::path(
        path,
        "Path to the directory containing main.py and requirements.txt file",
    )?;

    println!("{}", "Creating zip file for deployment".green());

    if !validate(&path) {
        return Err(CompressError::InvalidProject);
    }

    let progress = spinner("Archiving...");
    let result = build_zip_archive(&path, &output, &progress);
    progress.finish_and_clear();

    let count = result?;

    info!(files = count, output = %output.display(), "archive created");

    println!(
        "{}",
        format!("Files have been zipped to {}", output.display()).green()
    );

    Ok(())
}

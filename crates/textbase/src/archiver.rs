use std::{
    fs::{self, File},
    io,
    path::{Component, Path, PathBuf, StripPrefixError},
};

use colored::Colorize;
use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use itertools::Itertools;
use tracing::debug;
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Files that every bot project must contain at its root.
pub(crate) const REQUIRED_FILES: [&str; 2] = ["main.py", "requirements.txt"];

/// Archive file name used when no explicit output path is given.
pub(crate) const DEFAULT_ARCHIVE_NAME: &str = "deploy.zip";

/// Errors that may occur during the archive creation process.
#[derive(Debug, Display, From, Error)]
pub(crate) enum PackagingError {
    /// Project directory is missing or cannot be listed.
    #[from(ignore)]
    #[display(fmt = "project directory {} does not exist or is not readable", "path.display()")]
    NotFound {
        /// Requested project directory.
        path: PathBuf,
    },

    /// IO error while reading project files or writing the archive.
    #[display(fmt = "unable to read project files: {}", _0)]
    Io(io::Error),

    /// [`zip`]-crate specific error.
    #[display(fmt = "unable to write zip archive: {}", _0)]
    Zip(zip::result::ZipError),

    /// Unable to strip project directory prefix from path.
    StripPrefix(StripPrefixError),

    /// Project file path cannot be stored as a ZIP entry name.
    #[from(ignore)]
    #[display(fmt = "file {} contains non-unicode symbols in path", "path.display()")]
    NonUnicodePath {
        /// Offending file path.
        path: PathBuf,
    },
}

impl From<walkdir::Error> for PackagingError {
    fn from(error: walkdir::Error) -> Self {
        PackagingError::Io(error.into())
    }
}

/// Get the list of required files absent from the root of `dir`.
///
/// Every required file is checked, so the caller can report all of them at once.
pub(crate) fn missing_project_files(dir: &Path) -> Vec<&'static str> {
    REQUIRED_FILES
        .into_iter()
        .filter(|name| !dir.join(name).is_file())
        .collect()
}

/// Check that `dir` is a bot project, printing every missing file.
pub(crate) fn validate(dir: &Path) -> bool {
    let missing = missing_project_files(dir);

    for name in &missing {
        println!(
            "{}",
            format!("Error: {name} not found in {} directory.", dir.display()).red()
        );
    }

    missing.is_empty()
}

/// Archive the contents of `dir` into a deflate-compressed ZIP file at `output`.
///
/// Every regular file under `dir` is stored under its path relative to `dir`,
/// with `/` used as a separator. Symbolic links to files are archived with the
/// contents of their target, while linked directories are not descended into.
/// The output file itself is skipped when it resides inside `dir`. An existing
/// file at `output` is overwritten.
///
/// Any file that cannot be read or named aborts the whole operation, and a
/// partially written archive may be left behind.
///
/// Returns the number of archived files.
pub(crate) fn build_zip_archive(
    dir: &Path,
    output: &Path,
    progress: &ProgressBar,
) -> Result<usize, PackagingError> {
    let not_found = |_| PackagingError::NotFound {
        path: dir.to_path_buf(),
    };

    fs::read_dir(dir).map_err(not_found)?;
    let root = dir.canonicalize().map_err(not_found)?;

    let mut writer = ZipWriter::new(File::create(output)?);
    let output = output.canonicalize()?;
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;

        if !is_archived_file(&entry)? || entry.path() == output {
            continue;
        }

        let relative = entry.path().strip_prefix(&root)?;

        let name = archive_name(relative).ok_or_else(|| PackagingError::NonUnicodePath {
            path: entry.path().to_path_buf(),
        })?;

        debug!(%name, "adding file to archive");
        progress.set_message(format!("Archiving {name}"));

        writer.start_file(name, options)?;
        io::copy(&mut File::open(entry.path())?, &mut writer)?;
        count += 1;
    }

    writer.finish()?;

    Ok(count)
}

/// Check whether a walked entry holds file contents to archive.
///
/// Links are resolved, so a dangling link is reported as an IO error.
fn is_archived_file(entry: &walkdir::DirEntry) -> Result<bool, io::Error> {
    if entry.path_is_symlink() {
        Ok(fs::metadata(entry.path())?.is_file())
    } else {
        Ok(entry.file_type().is_file())
    }
}

/// Convert a relative path into a ZIP entry name.
fn archive_name(relative: &Path) -> Option<String> {
    relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.into_iter().join("/"))
}

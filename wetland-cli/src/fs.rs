//! Capability-based filesystem access for command inputs and the database.

use std::io::{self, Read};
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

use crate::CliError;

/// Check that `path` names an existing regular file.
pub(crate) fn require_file(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::ReadInput {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read a UTF-8 input file.
pub(crate) fn read_input(path: &Utf8Path, field: &'static str) -> Result<String, CliError> {
    require_file(path, field)?;
    let read_error = |source| CliError::ReadInput {
        field,
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs_utf8::File::open_ambient(path, ambient_authority()).map_err(read_error)?;
    let mut text = String::new();
    file.read_to_string(&mut text).map_err(read_error)?;
    Ok(text)
}

/// Create the parent directory of the database file when missing.
pub(crate) fn prepare_database_dir(path: &Utf8Path) -> Result<(), CliError> {
    ensure_parent_dir(path).map_err(|source| CliError::PrepareDatabaseDir {
        path: path.to_path_buf(),
        source,
    })
}

fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other("path should include a file name"))?;
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.metadata(name).map(|meta| meta.is_file())
}

fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

// Absolute paths are opened from the root, relative ones from the working
// directory.
fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let (base, relative) = match parent.as_std_path().components().next() {
        Some(Component::RootDir) => {
            let relative = parent
                .strip_prefix("/")
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?;
            (Utf8Path::new("/"), relative.to_path_buf())
        }
        Some(Component::Prefix(_)) => {
            return Err(io::Error::other(
                "database paths with a drive prefix are not supported",
            ));
        }
        _ => (Utf8Path::new("."), parent.to_path_buf()),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(base, ambient_authority())?;
    Ok((dir, relative))
}

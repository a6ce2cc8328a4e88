//! Recursive file copy preserving modes.

use depot_core::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Copy `source` to `destination`. Directories are copied recursively;
/// file permissions are preserved.
pub fn copy(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::metadata(source).map_err(|e| Error::io(e, source, "inspecting source"))?;
    if !metadata.is_dir() {
        return copy_file(source, destination);
    }

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| Error::io(e.into(), source, "walking source"))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| Error::validation(format!("{} escapes {}", entry.path().display(), source.display())))?;
        let output = destination.join(relative);

        if entry.file_type().is_dir() {
            debug!(path = %output.display(), "creating output directory");
            fs::create_dir_all(&output)
                .map_err(|e| Error::io(e, output.clone(), "creating directory"))?;
            copy_permissions(entry.path(), &output)?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &output)?;
        } else {
            debug!(path = %entry.path().display(), "skipping special file");
        }
    }

    Ok(())
}

fn copy_file(source: &Path, destination: &Path) -> Result<()> {
    debug!(from = %source.display(), to = %destination.display(), "copying file");
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "creating directory"))?;
    }
    // fs::copy carries permissions along with the contents.
    fs::copy(source, destination)
        .map_err(|e| Error::io(e, destination, "copying file"))?;
    Ok(())
}

#[cfg(unix)]
fn copy_permissions(source: &Path, destination: &Path) -> Result<()> {
    let permissions = fs::metadata(source)
        .map_err(|e| Error::io(e, source, "reading permissions"))?
        .permissions();
    fs::set_permissions(destination, permissions)
        .map_err(|e| Error::io(e, destination, "setting permissions"))
}

#[cfg(not(unix))]
fn copy_permissions(_source: &Path, _destination: &Path) -> Result<()> {
    Ok(())
}

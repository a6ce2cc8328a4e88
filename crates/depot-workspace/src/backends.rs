//! Re-hydration of remote backends from persisted workspace metadata.
//!
//! The workspace metadata records which backend wrote it via the
//! `sourceSetType` / `managerType` tags; the opaque `.sourceset` /
//! `.manager` files hold whatever that backend needs to reconstruct
//! itself. Dispatch is on the type tag alone.

use crate::workspace::{find_workspace, manager_metadata_path, read_metadata, source_set_metadata_path};
use depot_artifacts::{FsRegistry, FsStore, RemoteSourceSet, RemoteStore, FS_BACKEND_TYPE};
use depot_core::{Error, Result};
use std::fs::File;
use std::path::Path;

/// Reconstruct the remote source set bound to the workspace containing
/// `directory`.
pub fn remote_source_set(directory: &Path) -> Result<Box<dyn RemoteSourceSet>> {
    let workspace = find_workspace(directory)?;
    let metadata = read_metadata(&workspace)?;

    let path = source_set_metadata_path(&workspace);
    let file =
        File::open(&path).map_err(|e| Error::io(e, path, "opening source set metadata"))?;

    match metadata.source_set_type.as_str() {
        FS_BACKEND_TYPE => Ok(Box::new(FsRegistry::from_metadata(
            metadata.source_set_name,
            file,
        )?)),
        other => Err(Error::UnknownBackend {
            kind: other.to_string(),
        }),
    }
}

/// Reconstruct the remote artifact store bound to the workspace
/// containing `directory`.
pub fn remote_store(directory: &Path) -> Result<Box<dyn RemoteStore>> {
    let workspace = find_workspace(directory)?;
    let metadata = read_metadata(&workspace)?;

    let path = manager_metadata_path(&workspace);
    let file = File::open(&path).map_err(|e| Error::io(e, path, "opening store metadata"))?;

    match metadata.manager_type.as_str() {
        FS_BACKEND_TYPE => Ok(Box::new(FsStore::from_metadata(file)?)),
        other => Err(Error::UnknownBackend {
            kind: other.to_string(),
        }),
    }
}

//! Workspace discovery and metadata persistence.
//!
//! A workspace is a directory owning a hidden `.workspace/` subdirectory:
//!
//! ```text
//! <workspace>/
//!   .workspace/
//!     metadata.json      sourceSetName, sourceSetType, managerType, artifacts
//!     .sourceset         backend-opaque source set metadata
//!     .manager           backend-opaque store metadata
//!     package-cache/<ns>/<name>/<version>/<buildNumber>/
//!   <packageDir>/
//!     build.yaml
//! ```
//!
//! Metadata is created by init and overwritten in full by refresh, never
//! partially mutated.

use depot_artifacts::{RemoteSourceSet, RemoteStore, SourceSet};
use depot_core::{Artifact, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the hidden workspace metadata directory.
pub const WORKSPACE_DIR: &str = ".workspace";

/// Name of the metadata file inside [`WORKSPACE_DIR`].
pub const METADATA_FILE: &str = "metadata.json";

/// Name of the backend-opaque source set metadata file.
pub const SOURCE_SET_FILE: &str = ".sourceset";

/// Name of the backend-opaque store metadata file.
pub const MANAGER_FILE: &str = ".manager";

/// Name of the unpacked artifact cache directory.
pub const PACKAGE_CACHE_DIR: &str = "package-cache";

/// Persisted workspace metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMetadata {
    /// Name of the source set this workspace tracks.
    pub source_set_name: String,
    /// Type tag of the remote source set backend.
    pub source_set_type: String,
    /// Type tag of the remote store backend.
    pub manager_type: String,
    /// Cached snapshot of the source set, used for offline lookups.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// Ascend from `directory` looking for the nearest workspace root.
///
/// Every ancestor of the absolute path is checked for
/// `.workspace/metadata.json`; the filesystem root is checked exactly
/// once. The nearest match wins, so nested workspaces resolve to the
/// innermost one.
pub fn find_workspace(directory: &Path) -> Result<PathBuf> {
    let absolute = absolutize(directory)?;

    let mut current = Some(absolute.as_path());
    while let Some(dir) = current {
        let marker = dir.join(WORKSPACE_DIR).join(METADATA_FILE);
        if marker.is_file() {
            return Ok(dir.to_path_buf());
        }
        debug!(path = %dir.display(), "no workspace here");
        current = dir.parent();
    }

    Err(Error::WorkspaceNotFound { path: absolute })
}

/// Initialize a workspace at `location` bound to the given backends.
///
/// Fails if `location` already contains a `.workspace/` directory. The
/// backends' own metadata-persistence hooks write `.sourceset` and
/// `.manager`; the artifact snapshot is then filled in by an immediate
/// refresh.
pub fn init_workspace(
    location: &Path,
    source_set: &dyn RemoteSourceSet,
    store: &dyn RemoteStore,
) -> Result<()> {
    let workspace_dir = location.join(WORKSPACE_DIR);
    if workspace_dir.exists() {
        return Err(Error::WorkspaceExists {
            path: location.to_path_buf(),
        });
    }

    fs::create_dir_all(&workspace_dir)
        .map_err(|e| Error::io(e, workspace_dir.clone(), "creating workspace directory"))?;

    let metadata = WorkspaceMetadata {
        source_set_name: source_set.name().to_string(),
        source_set_type: source_set.kind().to_string(),
        manager_type: store.kind().to_string(),
        artifacts: Vec::new(),
    };
    write_metadata(location, &metadata)?;

    let source_set_path = workspace_dir.join(SOURCE_SET_FILE);
    let mut source_set_file = File::create(&source_set_path)
        .map_err(|e| Error::io(e, source_set_path, "creating source set metadata"))?;
    source_set.persist_metadata(&mut source_set_file)?;

    let manager_path = workspace_dir.join(MANAGER_FILE);
    let mut manager_file = File::create(&manager_path)
        .map_err(|e| Error::io(e, manager_path, "creating store metadata"))?;
    store.persist_metadata(&mut manager_file)?;

    info!(workspace = %location.display(), source_set = source_set.name(), "initialized workspace");
    refresh_workspace(location, source_set)
}

/// Refresh the artifact snapshot of the workspace rooted at `location`.
///
/// The backend type fields of the existing metadata are preserved; the
/// artifact list is replaced by the source set's full contents and the
/// file is rewritten in one shot.
pub fn refresh_workspace(location: &Path, source_set: &dyn SourceSet) -> Result<()> {
    let mut metadata = read_metadata(location)?;
    metadata.source_set_name = source_set.name().to_string();
    metadata.artifacts = source_set.get_all_artifacts()?;

    write_metadata(location, &metadata)?;
    info!(
        workspace = %location.display(),
        artifacts = metadata.artifacts.len(),
        "refreshed workspace metadata"
    );
    Ok(())
}

/// Read the metadata of the workspace containing `directory`.
pub fn read_metadata(directory: &Path) -> Result<WorkspaceMetadata> {
    let workspace = find_workspace(directory)?;
    let path = workspace.join(WORKSPACE_DIR).join(METADATA_FILE);
    let file = File::open(&path).map_err(|e| Error::io(e, path.clone(), "opening workspace metadata"))?;
    serde_json::from_reader(file).map_err(|e| Error::Json {
        source: e,
        path: Some(path),
    })
}

/// Canonical cache directory for an artifact within a workspace.
pub fn artifact_cache_dir(workspace: &Path, artifact: &Artifact) -> PathBuf {
    workspace
        .join(WORKSPACE_DIR)
        .join(PACKAGE_CACHE_DIR)
        .join(&artifact.package.namespace)
        .join(&artifact.package.name)
        .join(&artifact.package.version)
        .join(&artifact.build_number)
}

/// Path of the backend-opaque source set metadata file.
pub fn source_set_metadata_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_DIR).join(SOURCE_SET_FILE)
}

/// Path of the backend-opaque store metadata file.
pub fn manager_metadata_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_DIR).join(MANAGER_FILE)
}

fn write_metadata(location: &Path, metadata: &WorkspaceMetadata) -> Result<()> {
    let path = location.join(WORKSPACE_DIR).join(METADATA_FILE);
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&path)
        .map_err(|e| Error::io(e, path.clone(), "writing workspace metadata"))?;
    serde_json::to_writer_pretty(file, metadata).map_err(|e| Error::Json {
        source: e,
        path: Some(path),
    })
}

fn absolutize(directory: &Path) -> Result<PathBuf> {
    if directory.is_absolute() {
        Ok(directory.to_path_buf())
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::io(e, directory, "resolving working directory"))?;
        Ok(cwd.join(directory))
    }
}

use depot_artifacts::{FsRegistry, FsStore, RemoteSourceSet, RemoteStore};
use depot_core::validate::validate_name;
use depot_core::{Error, Result};
use depot_workspace::{find_workspace, init_workspace};
use std::path::{Path, PathBuf};
use tracing::info;

/// Initialize a workspace in `working_dir` bound to filesystem backends.
pub async fn run(
    working_dir: &Path,
    source_set: String,
    registry_root: PathBuf,
    store_root: PathBuf,
) -> Result<()> {
    // Initializing inside an existing workspace would shadow it.
    match find_workspace(working_dir) {
        Ok(existing) => return Err(Error::WorkspaceExists { path: existing }),
        Err(Error::WorkspaceNotFound { .. }) => {}
        Err(error) => return Err(error),
    }
    validate_name(&source_set)?;

    let registry = FsRegistry::new(registry_root, source_set);
    let store = FsStore::new(store_root);

    // The backends may each create several resources; run them together.
    let registry_setup = {
        let registry = registry.clone();
        tokio::task::spawn_blocking(move || registry.setup())
    };
    let store_setup = {
        let store = store.clone();
        tokio::task::spawn_blocking(move || store.setup())
    };
    let (registry_result, store_result) =
        tokio::try_join!(registry_setup, store_setup).expect("setup task panicked");
    registry_result?;
    store_result?;

    init_workspace(working_dir, &registry, &store)?;
    info!(workspace = %working_dir.display(), "workspace ready");
    Ok(())
}

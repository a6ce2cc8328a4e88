use depot_core::Result;
use depot_workspace::{find_workspace, refresh_workspace, remote_source_set};
use std::path::Path;

/// Pull the source set's full artifact list into the workspace snapshot.
pub fn run(working_dir: &Path) -> Result<()> {
    let workspace = find_workspace(working_dir)?;
    let source_set = remote_source_set(&workspace)?;
    refresh_workspace(&workspace, source_set.as_ref())
}

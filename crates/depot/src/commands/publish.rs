use depot_artifacts::{transfer, RemoteSourceSet, SourceSet};
use depot_core::{parse_buildfile, Artifact, Error, Result, BUILDFILE_NAME};
use depot_workspace::{remote_source_set, remote_store, CacheStore};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Publish the package in `working_dir`: upload its build output, append
/// it to the global artifact space, and move the source-set pin to it.
pub fn run(working_dir: &Path) -> Result<()> {
    let parsed = parse_buildfile(&working_dir.join(BUILDFILE_NAME))?;
    info!(package = %parsed.package, "publishing package");

    let local = CacheStore::for_workspace(working_dir)?;
    let remote = remote_store(working_dir)?;

    let build_number = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::validation(format!("system clock is before the Unix epoch: {e}")))?
        .as_secs()
        .to_string();
    let artifact = Artifact::new(parsed.package, build_number);

    transfer(&local, remote.as_ref(), &artifact)?;

    // Register before pinning: the register is conditional on global
    // uniqueness, the pin is an unconditional overwrite. A crash between
    // the two leaves an unpinned artifact, which is safe to re-publish
    // over with a new build number.
    let source_set = remote_source_set(working_dir)?;
    source_set.register_artifact(&artifact)?;
    source_set.use_artifact(&artifact)?;

    info!(artifact = %artifact, source_set = source_set.name(), "published");
    Ok(())
}

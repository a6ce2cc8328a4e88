//! Streaming transfer of one artifact between two stores.

use crate::store::ArtifactStore;
use depot_core::{Artifact, Error, Result};
use std::io;
use tracing::{debug, info};

/// Stream an artifact's contents from `source` to `destination`.
///
/// The writer is closed before the reader is released; since a sink's
/// close blocks until the destination has fully materialized the
/// artifact, a successful return means a subsequent reader at the
/// destination observes the complete artifact. Note: this does not update
/// any source set.
pub fn transfer(
    source: &dyn ArtifactStore,
    destination: &dyn ArtifactStore,
    artifact: &Artifact,
) -> Result<()> {
    info!(artifact = %artifact, "transferring artifact");

    let mut reader = source.open_reader(artifact)?;
    let mut writer = destination.open_writer(artifact)?;

    let copied = io::copy(&mut reader, &mut writer)
        .map_err(|e| Error::io(e, artifact.key(), "copying artifact stream"))?;
    writer.close()?;

    debug!(artifact = %artifact, bytes = copied, "transfer complete");
    Ok(())
}

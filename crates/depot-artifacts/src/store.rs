//! Artifact store contracts.

use depot_core::{Artifact, Result};
use std::io::{Read, Write};

/// A byte store for artifact contents.
///
/// Readers and writers carry a gzip-compressed tar stream whose entry
/// names are relative to the source package's `build/` directory.
pub trait ArtifactStore {
    /// Open a stream over the artifact's contents.
    fn open_reader(&self, artifact: &Artifact) -> Result<Box<dyn Read + Send>>;

    /// Open a sink that materializes the artifact at this store.
    ///
    /// Stores that enforce immutability fail here with
    /// [`depot_core::Error::ArtifactExists`] when the artifact is already
    /// present.
    fn open_writer(&self, artifact: &Artifact) -> Result<Box<dyn ArtifactSink>>;
}

/// The write half of an artifact store.
///
/// Dropping a sink without calling [`ArtifactSink::close`] abandons the
/// write; no artifact becomes observable. A successful close means the
/// destination is fully materialized: a subsequent reader sees the
/// complete artifact.
pub trait ArtifactSink: Write + Send {
    /// Finish the write, blocking until the destination has fully
    /// materialized the artifact (unpack completed, upload acknowledged).
    fn close(self: Box<Self>) -> Result<()>;
}

/// An artifact store that persists metadata for later re-hydration.
pub trait RemoteStore: ArtifactStore {
    /// The persisted type tag used to re-hydrate this backend.
    fn kind(&self) -> &'static str;

    /// Idempotently create whatever backing structures the store needs.
    fn setup(&self) -> Result<()>;

    /// Write the backend-opaque metadata needed to reconstruct this store.
    fn persist_metadata(&self, writer: &mut dyn Write) -> Result<()>;
}

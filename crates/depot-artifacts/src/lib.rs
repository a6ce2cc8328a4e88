//! Contracts for source sets and artifact stores, plus the streaming
//! transfer between two stores and the filesystem-backed remote.
//!
//! A *source set* maps package identities to pinned artifacts. An
//! *artifact store* moves the bytes of an artifact's build output. Remote
//! variants of both persist enough metadata to be reconstructed later from
//! the workspace; dispatch is always on the persisted type tag, never on
//! runtime type inference.

pub mod fs;
pub mod pipe;
pub mod store;
pub mod transfer;

use depot_core::{Artifact, Result};
use std::io::Write;

pub use fs::{FsRegistry, FsStore, FS_BACKEND_TYPE};
pub use store::{ArtifactSink, ArtifactStore, RemoteStore};
pub use transfer::transfer;

/// A named set of pins mapping package identities to chosen artifacts.
pub trait SourceSet {
    /// Name of this source set.
    fn name(&self) -> &str;

    /// Look up the pinned artifact for an identity triple.
    ///
    /// Returns the distinguished [`depot_core::Error::ArtifactNotFound`]
    /// when no pin matches, so callers can fall through to another source
    /// set; any other error is a backend failure.
    fn get_artifact(&self, namespace: &str, name: &str, version: &str) -> Result<Artifact>;

    /// All artifacts pinned in this source set.
    fn get_all_artifacts(&self) -> Result<Vec<Artifact>>;
}

/// A source set that owns the global artifact space and accepts writes.
pub trait RemoteSourceSet: SourceSet {
    /// The persisted type tag used to re-hydrate this backend.
    fn kind(&self) -> &'static str;

    /// Idempotently create whatever backing structures the backend needs.
    fn setup(&self) -> Result<()>;

    /// Append an artifact to the global artifact space.
    ///
    /// Registration is conditional on the `(namespace, name, version,
    /// buildNumber)` quadruple not existing; a duplicate fails with
    /// [`depot_core::Error::ArtifactExists`].
    fn register_artifact(&self, artifact: &Artifact) -> Result<()>;

    /// Pin the given artifact for its package identity.
    ///
    /// The artifact must already be registered in the global space. The
    /// pin itself is an unconditional overwrite; a later build of the same
    /// version replaces the pin.
    fn use_artifact(&self, artifact: &Artifact) -> Result<()>;

    /// Write the backend-opaque metadata needed to reconstruct this
    /// source set later.
    fn persist_metadata(&self, writer: &mut dyn Write) -> Result<()>;
}

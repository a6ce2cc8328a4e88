//! Workspace-side machinery: discovery and metadata persistence, the
//! local and override source sets, the tar+gzip package cache, backend
//! re-hydration, and the buildpath resolver.

pub mod backends;
pub mod buildpath;
pub mod cache_store;
pub mod overrides;
pub mod snapshot;
pub mod workspace;

pub use backends::{remote_source_set, remote_store};
pub use buildpath::{BuildpathResolver, DependencyKind};
pub use cache_store::CacheStore;
pub use overrides::OverrideSourceSet;
pub use snapshot::SnapshotSourceSet;
pub use workspace::{
    artifact_cache_dir, find_workspace, init_workspace, read_metadata, refresh_workspace,
    WorkspaceMetadata, METADATA_FILE, WORKSPACE_DIR,
};

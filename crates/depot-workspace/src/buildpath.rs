//! Buildpath resolution.
//!
//! Given a target package, compute the ordered list of directories
//! holding the build output of every transitively reached dependency.
//! Packages checked out in the workspace win over pinned source-set
//! versions; pinned versions are served from the package cache,
//! downloading from the remote store on a miss.

use crate::cache_store::CacheStore;
use crate::overrides::OverrideSourceSet;
use crate::snapshot::SnapshotSourceSet;
use crate::workspace::{artifact_cache_dir, find_workspace};
use crate::backends::remote_store;
use depot_artifacts::{transfer, RemoteStore, SourceSet};
use depot_core::{Error, Package, PackageRef, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which dependency edges the resolver follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// Compile dependencies only.
    Compile,
    /// Compile dependencies everywhere, plus the target's own test
    /// dependencies. Test dependencies apply only to the root target;
    /// following them transitively would pull unrelated test-only graphs
    /// into every build.
    Test,
}

impl DependencyKind {
    fn dependencies(self, package: &Package, is_root: bool) -> Vec<PackageRef> {
        let deps = &package.dependencies;
        let mut edges = deps.compile.clone();
        if is_root && self == Self::Test {
            edges.extend(deps.test.iter().cloned());
        }
        edges
    }
}

/// Resolves buildpaths for one workspace.
pub struct BuildpathResolver {
    workspace: PathBuf,
    overrides: OverrideSourceSet,
    snapshot: SnapshotSourceSet,
    cache: CacheStore,
    remote: Box<dyn RemoteStore>,
}

impl BuildpathResolver {
    /// Build a resolver for the workspace containing `directory`,
    /// re-hydrating the remote store from the workspace metadata.
    pub fn for_workspace(directory: &Path) -> Result<Self> {
        let workspace = find_workspace(directory)?;
        Ok(Self {
            overrides: OverrideSourceSet::for_workspace(&workspace)?,
            snapshot: SnapshotSourceSet::for_workspace(&workspace)?,
            cache: CacheStore::for_workspace(&workspace)?,
            remote: remote_store(&workspace)?,
            workspace,
        })
    }

    /// Build a resolver from explicit parts. Used when the remote store
    /// is already in hand.
    pub fn new(
        workspace: PathBuf,
        overrides: OverrideSourceSet,
        snapshot: SnapshotSourceSet,
        cache: CacheStore,
        remote: Box<dyn RemoteStore>,
    ) -> Self {
        Self {
            workspace,
            overrides,
            snapshot,
            cache,
            remote,
        }
    }

    /// Compute the buildpath for `target`.
    ///
    /// The result is one directory per transitively reached package, in
    /// depth-first pre-order from the target, duplicates preserved. A
    /// package may appear in several subtrees, but a package depending on
    /// itself along a single path is a cycle and fails with the full
    /// chain as the diagnostic.
    pub fn buildpath(&self, target: &Package, kind: DependencyKind) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut on_stack: HashSet<String> = HashSet::new();
        let mut stack = vec![StackEntry {
            target: target.to_ref(),
            visited: false,
            is_root: true,
        }];

        while let Some(top) = stack.last() {
            let key = top.target.key();

            if top.visited {
                on_stack.remove(&key);
                stack.pop();
                continue;
            }

            if on_stack.contains(&key) {
                let chain: Vec<String> = stack.iter().map(|entry| entry.target.key()).collect();
                return Err(Error::DependencyCycle {
                    chain: chain.join(" -> "),
                });
            }
            on_stack.insert(key);

            let is_root = top.is_root;
            let current = top.target.clone();
            if let Some(top) = stack.last_mut() {
                top.visited = true;
            }

            let (location, resolved) = self.resolve(&current)?;
            paths.push(location);

            for dependency in kind.dependencies(&resolved, is_root) {
                stack.push(StackEntry {
                    target: dependency,
                    visited: false,
                    is_root: false,
                });
            }
        }

        Ok(paths)
    }

    /// Resolve one package to the directory holding its build output and
    /// the full package definition used to continue the traversal.
    fn resolve(&self, target: &PackageRef) -> Result<(PathBuf, Package)> {
        match self
            .overrides
            .get_artifact(&target.namespace, &target.name, &target.version)
        {
            Ok(artifact) => {
                let location = self
                    .overrides
                    .location(&target.namespace, &target.name, &target.version)?;
                return Ok((location.to_path_buf(), artifact.package));
            }
            Err(error) if error.is_artifact_not_found() => {}
            Err(error) => return Err(error),
        }

        let artifact =
            self.snapshot
                .get_artifact(&target.namespace, &target.name, &target.version)?;

        let location = artifact_cache_dir(&self.workspace, &artifact);
        if !location.is_dir() {
            debug!(artifact = %artifact, "cache miss, downloading");
            transfer(self.remote.as_ref(), &self.cache, &artifact)?;
        }

        Ok((location, artifact.package))
    }
}

struct StackEntry {
    target: PackageRef,
    visited: bool,
    is_root: bool,
}

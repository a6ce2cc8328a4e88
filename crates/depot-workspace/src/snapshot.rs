//! The local source set: a read-only view over the workspace's cached
//! snapshot of the remote source set.

use crate::workspace::read_metadata;
use depot_artifacts::SourceSet;
use depot_core::{Artifact, Error, Result};
use std::collections::HashMap;
use std::path::Path;

type ArtifactIndex = HashMap<String, HashMap<String, HashMap<String, Artifact>>>;

/// Source set backed by the `metadata.json` artifact snapshot.
#[derive(Debug)]
pub struct SnapshotSourceSet {
    name: String,
    artifacts: Vec<Artifact>,
    index: ArtifactIndex,
}

impl SnapshotSourceSet {
    /// Build the snapshot source set for the workspace containing
    /// `directory`.
    pub fn for_workspace(directory: &Path) -> Result<Self> {
        let metadata = read_metadata(directory)?;
        Ok(Self::from_artifacts(
            metadata.source_set_name,
            metadata.artifacts,
        ))
    }

    /// Build a snapshot source set from an explicit artifact list,
    /// indexed namespace → name → version for constant-time lookup.
    pub fn from_artifacts(name: impl Into<String>, artifacts: Vec<Artifact>) -> Self {
        let mut index: ArtifactIndex = HashMap::new();
        for artifact in &artifacts {
            index
                .entry(artifact.package.namespace.clone())
                .or_default()
                .entry(artifact.package.name.clone())
                .or_default()
                .insert(artifact.package.version.clone(), artifact.clone());
        }

        Self {
            name: name.into(),
            artifacts,
            index,
        }
    }
}

impl SourceSet for SnapshotSourceSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_artifact(&self, namespace: &str, name: &str, version: &str) -> Result<Artifact> {
        self.index
            .get(namespace)
            .and_then(|names| names.get(name))
            .and_then(|versions| versions.get(version))
            .cloned()
            .ok_or_else(|| Error::ArtifactNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    fn get_all_artifacts(&self) -> Result<Vec<Artifact>> {
        Ok(self.artifacts.clone())
    }
}

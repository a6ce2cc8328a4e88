//! The override source set: packages physically checked out in the
//! workspace, which shadow any pin for the same identity.

use crate::workspace::{find_workspace, read_metadata, WORKSPACE_DIR};
use depot_artifacts::SourceSet;
use depot_core::{parse_buildfile, Artifact, Error, Result, BUILDFILE_NAME};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source set over the packages checked out at the top level of the
/// workspace. Each local package acts as a pin of itself, and its
/// directory is remembered so the resolver can consume it in place
/// without any transfer.
#[derive(Debug)]
pub struct OverrideSourceSet {
    name: String,
    artifacts: Vec<Artifact>,
    locations: HashMap<String, PathBuf>,
}

impl OverrideSourceSet {
    /// Scan the workspace containing `directory` for checked-out packages.
    ///
    /// Top-level entries that are not directories, are the workspace
    /// metadata directory, or do not hold a parseable build file are
    /// skipped.
    pub fn for_workspace(directory: &Path) -> Result<Self> {
        let workspace = find_workspace(directory)?;
        let metadata = read_metadata(&workspace)?;

        let mut artifacts = Vec::new();
        let mut locations = HashMap::new();

        let entries = fs::read_dir(&workspace)
            .map_err(|e| Error::io(e, workspace.clone(), "listing workspace"))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(e, workspace.clone(), "listing workspace"))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if entry.file_name() == WORKSPACE_DIR {
                continue;
            }

            let buildfile_path = path.join(BUILDFILE_NAME);
            let parsed = match parse_buildfile(&buildfile_path) {
                Ok(parsed) => parsed,
                Err(error) => {
                    debug!(path = %buildfile_path.display(), %error, "ignoring possible override");
                    continue;
                }
            };

            locations.insert(parsed.package.key(), path);
            // Build numbers are meaningless for overrides; the directory
            // contents stand in for any build of the package.
            artifacts.push(Artifact::new(parsed.package, "0"));
        }

        Ok(Self {
            name: metadata.source_set_name,
            artifacts,
            locations,
        })
    }

    /// The checked-out directory for an overridden package.
    pub fn location(&self, namespace: &str, name: &str, version: &str) -> Result<&Path> {
        self.locations
            .get(&depot_core::package_key(namespace, name, version))
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::ArtifactNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
                version: version.to_string(),
            })
    }
}

impl SourceSet for OverrideSourceSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_artifact(&self, namespace: &str, name: &str, version: &str) -> Result<Artifact> {
        let key = depot_core::package_key(namespace, name, version);
        self.artifacts
            .iter()
            .find(|artifact| artifact.key() == key)
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

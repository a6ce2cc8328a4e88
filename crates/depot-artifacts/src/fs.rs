//! Filesystem-backed remote backend.
//!
//! Suitable for a shared directory (NFS mount, synced volume). The
//! registry keeps pins as one JSON file per package identity and the
//! global artifact space as one JSON file per artifact quadruple, created
//! exclusively so registration stays append-only. The blob store keeps
//! one object per artifact under the `<ns>/<name>/<version>/<bn>` key,
//! staged to a partial file and renamed into place on close.

use crate::store::{ArtifactSink, ArtifactStore, RemoteStore};
use crate::{RemoteSourceSet, SourceSet};
use depot_core::validate::validate_artifact;
use depot_core::{Artifact, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Type tag persisted in workspace metadata for both fs backends.
pub const FS_BACKEND_TYPE: &str = "fs";

const SETS_DIR: &str = "sets";
const ARTIFACTS_DIR: &str = "artifacts";
const DEPS_DIR: &str = "deps";

/// Backend-opaque metadata persisted into the workspace for re-hydration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FsMetadata {
    root: PathBuf,
}

/// A remote source set rooted at a shared directory.
#[derive(Debug, Clone)]
pub struct FsRegistry {
    root: PathBuf,
    source_set: String,
}

impl FsRegistry {
    /// Create a registry over `root` for the named source set.
    pub fn new(root: impl Into<PathBuf>, source_set: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            source_set: source_set.into(),
        }
    }

    /// Reconstruct a registry from persisted backend metadata.
    pub fn from_metadata(source_set: impl Into<String>, reader: impl Read) -> Result<Self> {
        let metadata: FsMetadata = serde_json::from_reader(reader)?;
        Ok(Self::new(metadata.root, source_set))
    }

    fn pin_path(&self, namespace: &str, name: &str, version: &str) -> PathBuf {
        self.root
            .join(SETS_DIR)
            .join(&self.source_set)
            .join(namespace)
            .join(name)
            .join(format!("{version}.json"))
    }

    fn record_path(&self, artifact: &Artifact) -> PathBuf {
        self.root
            .join(ARTIFACTS_DIR)
            .join(&artifact.package.namespace)
            .join(&artifact.package.name)
            .join(&artifact.package.version)
            .join(format!("{}.json", artifact.build_number))
    }

    /// Informational reverse-dependency rows, written alongside
    /// registration and never read by the resolver.
    fn write_dependency_rows(&self, artifact: &Artifact) {
        let downstream = format!(
            "{}.{}.{}.{}",
            artifact.package.namespace,
            artifact.package.name,
            artifact.package.version,
            artifact.build_number
        );

        let deps = &artifact.package.dependencies;
        for upstream in deps.compile.iter().chain(deps.test.iter()) {
            let row = self
                .root
                .join(DEPS_DIR)
                .join(&upstream.namespace)
                .join(&upstream.name)
                .join(&upstream.version)
                .join(&downstream);
            let written = row
                .parent()
                .map(fs::create_dir_all)
                .unwrap_or(Ok(()))
                .and_then(|()| fs::write(&row, artifact.to_string()));
            if let Err(error) = written {
                debug!(upstream = %upstream, %error, "skipping dependency row");
            }
        }
    }
}

impl SourceSet for FsRegistry {
    fn name(&self) -> &str {
        &self.source_set
    }

    fn get_artifact(&self, namespace: &str, name: &str, version: &str) -> Result<Artifact> {
        let path = self.pin_path(namespace, name, version);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ArtifactNotFound {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    version: version.to_string(),
                });
            }
            Err(e) => return Err(Error::io(e, path, "opening pin")),
        };

        serde_json::from_reader(file).map_err(|e| Error::Json {
            source: e,
            path: Some(path),
        })
    }

    fn get_all_artifacts(&self) -> Result<Vec<Artifact>> {
        let set_root = self.root.join(SETS_DIR).join(&self.source_set);
        if !set_root.exists() {
            return Ok(Vec::new());
        }

        let mut artifacts = Vec::new();
        for entry in WalkDir::new(&set_root).follow_links(false) {
            let entry = entry.map_err(|e| {
                Error::io(e.into(), set_root.clone(), "listing source set")
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let file = File::open(entry.path())
                .map_err(|e| Error::io(e, entry.path(), "opening pin"))?;
            let artifact: Artifact = serde_json::from_reader(file).map_err(|e| Error::Json {
                source: e,
                path: Some(entry.path().to_path_buf()),
            })?;
            artifacts.push(artifact);
        }

        artifacts.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(artifacts)
    }
}

impl RemoteSourceSet for FsRegistry {
    fn kind(&self) -> &'static str {
        FS_BACKEND_TYPE
    }

    fn setup(&self) -> Result<()> {
        for dir in [
            self.root.join(SETS_DIR).join(&self.source_set),
            self.root.join(ARTIFACTS_DIR),
            self.root.join(DEPS_DIR),
        ] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(e, dir, "creating registry directory"))?;
        }
        Ok(())
    }

    fn register_artifact(&self, artifact: &Artifact) -> Result<()> {
        validate_artifact(artifact)?;

        let path = self.record_path(artifact);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(e, parent, "creating artifact record directory"))?;
        }

        // Exclusive create keeps the global artifact space append-only.
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::ArtifactExists {
                    namespace: artifact.package.namespace.clone(),
                    name: artifact.package.name.clone(),
                    version: artifact.package.version.clone(),
                    build_number: artifact.build_number.clone(),
                });
            }
            Err(e) => return Err(Error::io(e, path, "creating artifact record")),
        };
        serde_json::to_writer(file, artifact).map_err(|e| Error::Json {
            source: e,
            path: Some(path),
        })?;

        self.write_dependency_rows(artifact);
        Ok(())
    }

    fn use_artifact(&self, artifact: &Artifact) -> Result<()> {
        validate_artifact(artifact)?;

        if !self.record_path(artifact).is_file() {
            return Err(Error::validation(format!(
                "cannot pin unregistered artifact {artifact}"
            )));
        }

        let path = self.pin_path(
            &artifact.package.namespace,
            &artifact.package.name,
            &artifact.package.version,
        );
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(e, parent, "creating pin directory"))?;
        }

        // Write the replacement pin next to the old one, then swap.
        let staged = path.with_extension("tmp");
        let file = File::create(&staged).map_err(|e| Error::io(e, staged.clone(), "staging pin"))?;
        serde_json::to_writer(file, artifact).map_err(|e| Error::Json {
            source: e,
            path: Some(staged.clone()),
        })?;
        fs::rename(&staged, &path).map_err(|e| Error::io(e, path, "replacing pin"))?;
        Ok(())
    }

    fn persist_metadata(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(
            writer,
            &FsMetadata {
                root: self.root.clone(),
            },
        )?;
        Ok(())
    }
}

/// A remote artifact store rooted at a shared directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reconstruct a store from persisted backend metadata.
    pub fn from_metadata(reader: impl Read) -> Result<Self> {
        let metadata: FsMetadata = serde_json::from_reader(reader)?;
        Ok(Self::new(metadata.root))
    }

    fn object_path(&self, artifact: &Artifact) -> PathBuf {
        self.root
            .join(&artifact.package.namespace)
            .join(&artifact.package.name)
            .join(&artifact.package.version)
            .join(&artifact.build_number)
    }
}

impl ArtifactStore for FsStore {
    fn open_reader(&self, artifact: &Artifact) -> Result<Box<dyn Read + Send>> {
        let path = self.object_path(artifact);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::ArtifactNotFound {
                namespace: artifact.package.namespace.clone(),
                name: artifact.package.name.clone(),
                version: artifact.package.version.clone(),
            }),
            Err(e) => Err(Error::io(e, path, "opening artifact object")),
        }
    }

    fn open_writer(&self, artifact: &Artifact) -> Result<Box<dyn ArtifactSink>> {
        let path = self.object_path(artifact);
        if path.exists() {
            return Err(Error::ArtifactExists {
                namespace: artifact.package.namespace.clone(),
                name: artifact.package.name.clone(),
                version: artifact.package.version.clone(),
                build_number: artifact.build_number.clone(),
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(e, parent, "creating object directory"))?;
        }

        let staged = path.with_extension("partial");
        let file = File::create(&staged)
            .map_err(|e| Error::io(e, staged.clone(), "staging artifact object"))?;

        Ok(Box::new(FsSink {
            file: Some(file),
            staged,
            object: path,
            finished: false,
        }))
    }
}

impl RemoteStore for FsStore {
    fn kind(&self) -> &'static str {
        FS_BACKEND_TYPE
    }

    fn setup(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::io(e, self.root.clone(), "creating store root"))
    }

    fn persist_metadata(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(
            writer,
            &FsMetadata {
                root: self.root.clone(),
            },
        )?;
        Ok(())
    }
}

/// Sink writing into a staged object, published by rename on close.
struct FsSink {
    file: Option<File>,
    staged: PathBuf,
    object: PathBuf,
    finished: bool,
}

impl Write for FsSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "sink already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl ArtifactSink for FsSink {
    fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()
                .map_err(|e| Error::io(e, self.staged.clone(), "syncing artifact object"))?;
        }
        fs::rename(&self.staged, &self.object)
            .map_err(|e| Error::io(e, self.object.clone(), "publishing artifact object"))?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for FsSink {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(error) = fs::remove_file(&self.staged) {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!(path = %self.staged.display(), %error, "failed to clean up staged object");
                }
            }
        }
    }
}

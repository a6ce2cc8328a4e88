//! The local endpoint of the tar+gzip artifact transport.
//!
//! The two directions are asymmetric. Reading an artifact locates the
//! checked-out package matching the artifact's identity and streams a
//! gzip-compressed tar of its `build/` subtree, with entry names relative
//! to `build/`. Writing an artifact unpacks such a stream into the
//! workspace package cache, staging into a sibling directory and renaming
//! it into place on successful close, so a cache directory existing at
//! the canonical path always holds a complete artifact.

use crate::workspace::{artifact_cache_dir, find_workspace, WORKSPACE_DIR};
use depot_artifacts::pipe::{self, PipeReader, PipeWriter};
use depot_artifacts::{ArtifactSink, ArtifactStore};
use depot_core::{parse_buildfile, Artifact, Error, Result, BUILDFILE_NAME, BUILD_DIR};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::debug;
use walkdir::WalkDir;

/// Artifact store over the workspace: reads checked-out build output,
/// writes into the package cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    workspace: PathBuf,
}

impl CacheStore {
    /// Create a cache store for the workspace containing `directory`.
    pub fn for_workspace(directory: &Path) -> Result<Self> {
        Ok(Self {
            workspace: find_workspace(directory)?,
        })
    }

    /// Find the unique checked-out package matching the artifact's
    /// identity. The build number is irrelevant locally.
    fn working_dir(&self, artifact: &Artifact) -> Result<PathBuf> {
        let mut found: Option<PathBuf> = None;

        let entries = fs::read_dir(&self.workspace)
            .map_err(|e| Error::io(e, self.workspace.clone(), "listing workspace"))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| Error::io(e, self.workspace.clone(), "listing workspace"))?;
            let path = entry.path();
            if !path.is_dir() || entry.file_name() == WORKSPACE_DIR {
                continue;
            }

            let buildfile_path = path.join(BUILDFILE_NAME);
            let parsed = match parse_buildfile(&buildfile_path) {
                Ok(parsed) => parsed,
                Err(error) => {
                    debug!(path = %buildfile_path.display(), %error, "ignoring directory");
                    continue;
                }
            };

            if parsed.package.namespace != artifact.package.namespace
                || parsed.package.name != artifact.package.name
                || parsed.package.version != artifact.package.version
            {
                continue;
            }

            if let Some(first) = found {
                return Err(Error::DuplicatePackage {
                    namespace: artifact.package.namespace.clone(),
                    name: artifact.package.name.clone(),
                    version: artifact.package.version.clone(),
                    first,
                    second: path,
                });
            }
            found = Some(path);
        }

        found.ok_or_else(|| Error::ArtifactNotFound {
            namespace: artifact.package.namespace.clone(),
            name: artifact.package.name.clone(),
            version: artifact.package.version.clone(),
        })
    }
}

impl ArtifactStore for CacheStore {
    fn open_reader(&self, artifact: &Artifact) -> Result<Box<dyn Read + Send>> {
        let build_dir = self.working_dir(artifact)?.join(BUILD_DIR);
        debug!(artifact = %artifact, build_dir = %build_dir.display(), "packing build output");

        let (writer, reader) = pipe::pipe();
        thread::spawn(move || {
            let mut writer = writer;
            if let Err(error) = pack_tree(&build_dir, &mut writer) {
                writer.fail(error);
            }
        });

        Ok(Box::new(reader))
    }

    fn open_writer(&self, artifact: &Artifact) -> Result<Box<dyn ArtifactSink>> {
        let target = artifact_cache_dir(&self.workspace, artifact);
        let staging = staging_dir(&target);

        // Replace any previous download wholesale.
        for dir in [&target, &staging] {
            match fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(e, dir.clone(), "removing cache entry")),
            }
        }
        fs::create_dir_all(&staging)
            .map_err(|e| Error::io(e, staging.clone(), "creating cache staging directory"))?;

        let (writer, reader) = pipe::pipe();
        let unpack_into = staging.clone();
        let handle = thread::spawn(move || unpack_tree(reader, &unpack_into));

        Ok(Box::new(CacheSink {
            writer: Some(writer),
            handle: Some(handle),
            staging,
            target,
        }))
    }
}

/// Sink unpacking the stream into the cache staging directory; the
/// staging directory is renamed to the canonical path on close.
struct CacheSink {
    writer: Option<PipeWriter>,
    handle: Option<JoinHandle<Result<()>>>,
    staging: PathBuf,
    target: PathBuf,
}

impl Write for CacheSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "sink already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ArtifactSink for CacheSink {
    fn close(mut self: Box<Self>) -> Result<()> {
        // Signal EOF, then join the unpacker so a successful close means
        // the artifact is fully materialized.
        drop(self.writer.take());
        let unpacked = match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(Error::archive("unpack task panicked"))),
            None => Ok(()),
        };

        match unpacked {
            Ok(()) => fs::rename(&self.staging, &self.target)
                .map_err(|e| Error::io(e, self.target.clone(), "publishing cache entry")),
            Err(error) => {
                let _ = fs::remove_dir_all(&self.staging);
                Err(error)
            }
        }
    }
}

impl Drop for CacheSink {
    fn drop(&mut self) {
        // Abandoned without close: stop the unpacker and clean the staging
        // directory so no half-written entry survives.
        drop(self.writer.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            let _ = fs::remove_dir_all(&self.staging);
        }
    }
}

fn staging_dir(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

/// Serialize `build_dir` as a gzip-compressed tar into `writer`, entry
/// names relative to `build_dir`.
fn pack_tree(build_dir: &Path, writer: &mut PipeWriter) -> io::Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut archive = tar::Builder::new(encoder);

    for entry in WalkDir::new(build_dir).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.path() == build_dir {
            continue;
        }

        let name = entry
            .path()
            .strip_prefix(build_dir)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if entry.file_type().is_dir() {
            archive.append_dir(name, entry.path())?;
        } else if entry.file_type().is_file() {
            let mut file = File::open(entry.path())?;
            archive.append_file(name, &mut file)?;
        } else {
            debug!(path = %entry.path().display(), "skipping special file");
        }
    }

    archive.into_inner()?.finish()?;
    Ok(())
}

/// Unpack a gzip-compressed tar stream into `destination`.
///
/// Directories are created with mode `0755`; regular files are created
/// exclusively with the mode carried by their header; all other entry
/// types are logged and skipped. Absolute entry names and names with
/// parent traversal are rejected.
fn unpack_tree(reader: PipeReader, destination: &Path) -> Result<()> {
    let decoder = GzDecoder::new(reader);
    let mut archive = tar::Archive::new(decoder);

    let entries = archive
        .entries()
        .map_err(|e| Error::archive(format!("reading archive: {e}")))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::archive(format!("reading tar entry: {e}")))?;
        let name = entry
            .path()
            .map_err(|e| Error::archive(format!("decoding tar entry name: {e}")))?
            .into_owned();
        validate_entry_name(&name)?;

        let path = destination.join(&name);
        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            fs::create_dir_all(&path)
                .map_err(|e| Error::io(e, path.clone(), "creating cached directory"))?;
            set_mode(&path, 0o755)?;
        } else if entry_type.is_file() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::io(e, parent, "creating cached directory"))?;
            }
            let mode = entry.header().mode().unwrap_or(0o644);
            let mut file = open_exclusive(&path, mode)
                .map_err(|e| Error::io(e, path.clone(), "creating cached file"))?;
            io::copy(&mut entry, &mut file)
                .map_err(|e| Error::io(e, path.clone(), "writing cached file"))?;
        } else {
            debug!(name = %name.display(), kind = ?entry_type, "skipping tar entry");
        }
    }

    Ok(())
}

fn validate_entry_name(name: &Path) -> Result<()> {
    if name.is_absolute() {
        return Err(Error::archive(format!(
            "absolute tar entry name: {}",
            name.display()
        )));
    }
    if name
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(Error::archive(format!(
            "tar entry name traverses parent: {}",
            name.display()
        )));
    }
    Ok(())
}

#[cfg(unix)]
fn open_exclusive(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn open_exclusive(path: &Path, _mode: u32) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::io(e, path, "setting permissions"))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::init_workspace;
    use depot_artifacts::{transfer, FsRegistry, FsStore, RemoteSourceSet, RemoteStore};
    use depot_core::{Dependencies, Package};
    use tempfile::TempDir;

    fn artifact(name: &str, build_number: &str) -> Artifact {
        Artifact::new(
            Package {
                namespace: "acme".to_string(),
                name: name.to_string(),
                version: "1.0".to_string(),
                kind: "go".to_string(),
                dependencies: Dependencies::default(),
            },
            build_number,
        )
    }

    fn init_test_workspace(temp: &TempDir) -> PathBuf {
        let registry = FsRegistry::new(temp.path().join("registry"), "main");
        let store = FsStore::new(temp.path().join("store"));
        registry.setup().unwrap();
        store.setup().unwrap();

        let root = temp.path().join("ws");
        fs::create_dir_all(&root).unwrap();
        init_workspace(&root, &registry, &store).unwrap();
        root
    }

    fn add_package_with_build(root: &Path, name: &str) {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("build/src/inner")).unwrap();
        fs::write(
            dir.join(BUILDFILE_NAME),
            format!("namespace: acme\nname: {name}\nversion: \"1.0\"\ntype: go\n"),
        )
        .unwrap();
        fs::write(dir.join("build/src/main.file"), b"fn main() {}").unwrap();
        fs::write(dir.join("build/src/inner/util.file"), b"util").unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(
                dir.join("build/src/main.file"),
                fs::Permissions::from_mode(0o755),
            )
            .unwrap();
        }
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let temp = TempDir::new().unwrap();
        let root = init_test_workspace(&temp);
        add_package_with_build(&root, "lib");

        let store = CacheStore::for_workspace(&root).unwrap();
        let a = artifact("lib", "7");

        let mut reader = store.open_reader(&a).unwrap();
        let mut writer = store.open_writer(&a).unwrap();
        io::copy(&mut reader, &mut writer).unwrap();
        writer.close().unwrap();

        let cache = artifact_cache_dir(&root, &a);
        assert!(cache.is_dir());
        assert_eq!(
            fs::read(cache.join("src/main.file")).unwrap(),
            b"fn main() {}"
        );
        assert_eq!(fs::read(cache.join("src/inner/util.file")).unwrap(), b"util");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(cache.join("src/main.file"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_repeated_transfer_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = init_test_workspace(&temp);
        add_package_with_build(&root, "lib");

        let remote = FsStore::new(temp.path().join("blobs"));
        remote.setup().unwrap();
        let local = CacheStore::for_workspace(&root).unwrap();
        let a = artifact("lib", "7");

        transfer(&local, &remote, &a).unwrap();
        transfer(&remote, &local, &a).unwrap();
        let cache = artifact_cache_dir(&root, &a);
        let first = fs::read(cache.join("src/main.file")).unwrap();

        // A second download replaces the cache entry with identical bytes.
        transfer(&remote, &local, &a).unwrap();
        assert_eq!(fs::read(cache.join("src/main.file")).unwrap(), first);
        assert!(!staging_dir(&cache).exists());
    }

    #[test]
    fn test_reader_requires_unique_package() {
        let temp = TempDir::new().unwrap();
        let root = init_test_workspace(&temp);
        add_package_with_build(&root, "lib");

        // A second directory claiming the same identity.
        let dup = root.join("lib-copy");
        fs::create_dir_all(&dup).unwrap();
        fs::write(
            dup.join(BUILDFILE_NAME),
            "namespace: acme\nname: lib\nversion: \"1.0\"\ntype: go\n",
        )
        .unwrap();

        let store = CacheStore::for_workspace(&root).unwrap();
        let result = store.open_reader(&artifact("lib", "7"));
        assert!(matches!(result, Err(Error::DuplicatePackage { .. })));
    }

    #[test]
    fn test_reader_missing_package() {
        let temp = TempDir::new().unwrap();
        let root = init_test_workspace(&temp);

        let store = CacheStore::for_workspace(&root).unwrap();
        let result = store.open_reader(&artifact("ghost", "7"));
        match result {
            Err(e) => assert!(e.is_artifact_not_found()),
            Ok(_) => panic!("expected artifact-not-found error"),
        }
    }

    #[test]
    fn test_corrupt_stream_leaves_no_cache_entry() {
        let temp = TempDir::new().unwrap();
        let root = init_test_workspace(&temp);

        let store = CacheStore::for_workspace(&root).unwrap();
        let a = artifact("lib", "7");

        let mut writer = store.open_writer(&a).unwrap();
        // The unpacker may bail before consuming everything we send.
        let _ = writer.write_all(b"definitely not gzip");
        let result = writer.close();
        assert!(result.is_err());

        let cache = artifact_cache_dir(&root, &a);
        assert!(!cache.exists());
        assert!(!staging_dir(&cache).exists());
    }

    #[test]
    fn test_parent_traversal_entry_rejected() {
        let temp = TempDir::new().unwrap();
        let root = init_test_workspace(&temp);

        // Hand-build an archive with a hostile entry name.
        let mut raw = Vec::new();
        {
            let encoder = GzEncoder::new(&mut raw, Compression::default());
            let mut archive = tar::Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            // set_path refuses `..`, so write the raw name bytes.
            let name = b"../escape";
            header.as_old_mut().name[..name.len()].copy_from_slice(name);
            header.set_size(4);
            header.set_mode(0o644);
            header.set_cksum();
            archive.append(&header, &b"oops"[..]).unwrap();
            archive.into_inner().unwrap().finish().unwrap();
        }

        let store = CacheStore::for_workspace(&root).unwrap();
        let a = artifact("lib", "7");
        let mut writer = store.open_writer(&a).unwrap();
        writer.write_all(&raw).unwrap();
        let result = writer.close();
        assert!(matches!(result, Err(Error::Archive(_))));
        assert!(!artifact_cache_dir(&root, &a).exists());
    }

    #[test]
    fn test_validate_entry_name() {
        assert!(validate_entry_name(Path::new("src/main.file")).is_ok());
        assert!(validate_entry_name(Path::new("/etc/passwd")).is_err());
        assert!(validate_entry_name(Path::new("src/../../escape")).is_err());
    }
}

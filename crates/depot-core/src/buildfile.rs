//! Build-file loading.
//!
//! Every package root carries a `build.yaml` describing the package
//! identity, its builder type, and its dependencies. Language-specific
//! subtrees (a `go:` mapping, say) are ignored here and consumed by the
//! matching builder.

use crate::error::{Error, Result};
use crate::model::Package;
use crate::validate::validate_name;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the package manifest within a package root.
pub const BUILDFILE_NAME: &str = "build.yaml";

/// Name of the build-output subdirectory within a package root.
pub const BUILD_DIR: &str = "build";

/// The raw shape of a `build.yaml` file.
#[derive(Debug, Clone, Deserialize)]
struct Buildfile {
    #[serde(flatten)]
    package: Package,
}

/// A parsed build file plus the filesystem context it was read from.
#[derive(Debug, Clone)]
pub struct ParsedBuildfile {
    /// The package declared by the build file.
    pub package: Package,
    /// Absolute path of the package root (the directory holding `build.yaml`).
    pub working_dir: PathBuf,
    /// Absolute path of the package's `build/` output directory.
    pub build_dir: PathBuf,
}

/// Parse the build file at the given path and validate its identifiers.
pub fn parse_buildfile(path: &Path) -> Result<ParsedBuildfile> {
    debug!(path = %path.display(), "parsing build file");
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io(e, path, "reading build file"))?;

    let buildfile: Buildfile = serde_yaml::from_str(&content).map_err(|e| Error::Yaml {
        source: e,
        path: Some(path.to_path_buf()),
    })?;
    let package = buildfile.package;

    validate_name(&package.namespace)?;
    validate_name(&package.name)?;
    validate_name(&package.version)?;
    for dep in package
        .dependencies
        .compile
        .iter()
        .chain(package.dependencies.test.iter())
    {
        validate_name(&dep.namespace)?;
        validate_name(&dep.name)?;
        validate_name(&dep.version)?;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::io(e, path, "resolving working directory"))?
            .join(path)
    };
    let working_dir = absolute
        .parent()
        .ok_or_else(|| Error::validation(format!("build file {} has no parent directory", absolute.display())))?
        .to_path_buf();
    let build_dir = working_dir.join(BUILD_DIR);

    Ok(ParsedBuildfile {
        package,
        working_dir,
        build_dir,
    })
}

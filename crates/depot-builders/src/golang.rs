//! The Go builder.
//!
//! Go builds compile the package (to prove it builds) with `GOPATH` set
//! to the package's compile buildpath, then copy the source tree into
//! the build directory so downstream consumers see it under
//! `<cache>/src/`.

use crate::copy;
use crate::Builder;
use depot_core::{Error, ParsedBuildfile, Result};
use depot_workspace::{BuildpathResolver, DependencyKind};
use std::process::Command;
use tracing::{debug, info};

const GO_BUILDER_TYPE: &str = "go";
const SRC_DIR: &str = "src";

/// Builder for `type: go` packages.
#[derive(Debug, Default)]
pub struct GoBuilder;

impl GoBuilder {
    /// Create a Go builder.
    pub fn new() -> Self {
        Self
    }

    fn gopath(&self, buildfile: &ParsedBuildfile) -> Result<std::ffi::OsString> {
        let resolver = BuildpathResolver::for_workspace(&buildfile.working_dir)?;
        let buildpath = resolver.buildpath(&buildfile.package, DependencyKind::Compile)?;
        std::env::join_paths(buildpath.iter())
            .map_err(|e| Error::validation(format!("buildpath is not a valid GOPATH: {e}")))
    }
}

impl Builder for GoBuilder {
    fn kind(&self) -> &'static str {
        GO_BUILDER_TYPE
    }

    fn build(&self, buildfile: &ParsedBuildfile) -> Result<()> {
        info!(package = %buildfile.package, "building Go package");
        let gopath = self.gopath(buildfile)?;

        let status = Command::new("go")
            .arg("build")
            .arg("./...")
            .current_dir(&buildfile.working_dir)
            .env("GOPATH", &gopath)
            .status()
            .map_err(|e| Error::io(e, buildfile.working_dir.clone(), "running go build"))?;
        if !status.success() {
            return Err(Error::validation(format!(
                "go build failed for {} with {status}",
                buildfile.package
            )));
        }

        let src_input = buildfile.working_dir.join(SRC_DIR);
        let src_output = buildfile.build_dir.join(SRC_DIR);
        debug!(
            from = %src_input.display(),
            to = %src_output.display(),
            "copying sources into build directory"
        );
        copy::copy(&src_input, &src_output)
    }
}

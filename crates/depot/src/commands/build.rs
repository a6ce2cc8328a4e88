use depot_builders::{Builder, BuilderRegistry};
use depot_core::{parse_buildfile, Error, Result, BUILDFILE_NAME};
use std::path::Path;
use tracing::info;

/// Build the package in `working_dir` using the matching language builder.
pub fn run(working_dir: &Path, builders: &BuilderRegistry) -> Result<()> {
    let parsed = parse_buildfile(&working_dir.join(BUILDFILE_NAME))?;
    info!(package = %parsed.package, "parsed build file");

    let builder = builders.get(&parsed.package.kind).ok_or_else(|| {
        Error::validation(format!(
            "no builder registered for type '{}'",
            parsed.package.kind
        ))
    })?;

    builder.build(&parsed)
}

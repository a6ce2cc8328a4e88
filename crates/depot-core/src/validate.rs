//! Identifier validation.
//!
//! Namespaces, names, and versions share one alphabet; build numbers are
//! decimal integers. Validation runs at ingress (build-file parsing and
//! artifact registration) so the resolver can assume validity.

use crate::error::{Error, Result};
use crate::model::Artifact;
use regex::Regex;
use std::sync::LazyLock;

const NAME_PATTERN: &str = r"^[a-z0-9.\-]{1,40}$";
const BUILD_NUMBER_PATTERN: &str = r"^[0-9]+$";

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("name pattern is valid"));
static BUILD_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BUILD_NUMBER_PATTERN).expect("build number pattern is valid"));

/// Validate a namespace, name, or version string.
pub fn validate_name(name: &str) -> Result<()> {
    if !NAME_REGEX.is_match(name) {
        return Err(Error::validation(format!(
            "'{name}' does not match {NAME_PATTERN}"
        )));
    }
    Ok(())
}

/// Validate a build number string.
pub fn validate_build_number(build_number: &str) -> Result<()> {
    if !BUILD_NUMBER_REGEX.is_match(build_number) {
        return Err(Error::validation(format!(
            "build number '{build_number}' does not match {BUILD_NUMBER_PATTERN}"
        )));
    }
    Ok(())
}

/// Validate every identifier carried by an artifact.
pub fn validate_artifact(artifact: &Artifact) -> Result<()> {
    validate_name(&artifact.package.namespace)?;
    validate_name(&artifact.package.name)?;
    validate_name(&artifact.package.version)?;
    validate_build_number(&artifact.build_number)?;
    Ok(())
}

//! Core types for depot: the data model, identifier validation, build-file
//! loading, and the error type shared by every crate in the workspace.

pub mod buildfile;
pub mod error;
pub mod model;
pub mod validate;

pub use buildfile::{parse_buildfile, ParsedBuildfile, BUILDFILE_NAME, BUILD_DIR};
pub use error::{Error, Result};
pub use model::{package_key, Artifact, Dependencies, Package, PackageRef};

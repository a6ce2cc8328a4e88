//! Value types for packages and artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A buildable unit: identity triple, builder type, and dependency lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Namespace of the package.
    pub namespace: String,
    /// Name of the package.
    pub name: String,
    /// Version of the package.
    pub version: String,
    /// The builder type, e.g. `go`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Compile and test dependencies.
    #[serde(default)]
    pub dependencies: Dependencies,
}

impl Package {
    /// The `namespace/name/version` key used by source-set indexes and the
    /// buildpath resolver.
    pub fn key(&self) -> String {
        package_key(&self.namespace, &self.name, &self.version)
    }

    /// The identity triple of this package, without type or dependencies.
    pub fn to_ref(&self) -> PackageRef {
        PackageRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.namespace, self.name, self.version)
    }
}

/// A reference to a package by identity alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRef {
    /// Namespace of the referenced package.
    pub namespace: String,
    /// Name of the referenced package.
    pub name: String,
    /// Version of the referenced package.
    pub version: String,
}

impl PackageRef {
    /// The `namespace/name/version` key for this reference.
    pub fn key(&self) -> String {
        package_key(&self.namespace, &self.name, &self.version)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.namespace, self.name, self.version)
    }
}

/// Container for the different classes of package dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Dependencies required to compile the package.
    #[serde(default)]
    pub compile: Vec<PackageRef>,
    /// Dependencies additionally required to run the package's tests.
    #[serde(default)]
    pub test: Vec<PackageRef>,
}

/// An immutable build of a package: the package plus a build number.
///
/// Build numbers are monotonically increasing integers rendered as strings;
/// the publish flow mints them from the wall clock in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// The package this artifact is a build of.
    #[serde(flatten)]
    pub package: Package,
    /// Build number of this artifact.
    pub build_number: String,
}

impl Artifact {
    /// Construct an artifact for the given package and build number.
    pub fn new(package: Package, build_number: impl Into<String>) -> Self {
        Self {
            package,
            build_number: build_number.into(),
        }
    }

    /// The `namespace/name/version` key of the underlying package.
    pub fn key(&self) -> String {
        self.package.key()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.package, self.build_number)
    }
}

/// The `namespace/name/version` key for an identity triple.
pub fn package_key(namespace: &str, name: &str, version: &str) -> String {
    format!("{namespace}/{name}/{version}")
}

//! Language builders.
//!
//! A builder turns a parsed build file into build output under the
//! package's `build/` directory. Builders are looked up by the `type`
//! field of the build file through an explicit registry that is
//! populated once at startup and passed into command execution.

pub mod copy;
pub mod golang;

use depot_core::{Error, ParsedBuildfile, Result};
use std::collections::HashMap;

pub use golang::GoBuilder;

/// A language builder.
pub trait Builder {
    /// The build-file `type` value this builder handles.
    fn kind(&self) -> &'static str;

    /// Build the package, leaving its output under `build/`.
    fn build(&self, buildfile: &ParsedBuildfile) -> Result<()>;
}

/// Registry of language builders keyed by type.
///
/// Populated before any build runs; immutable afterwards.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: HashMap<&'static str, Box<dyn Builder>>,
}

impl BuilderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with every built-in builder registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(GoBuilder::new()))
            .expect("built-in builders have unique types");
        registry
    }

    /// Associate a builder with its type. Registering a second builder
    /// for the same type is an error.
    pub fn register(&mut self, builder: Box<dyn Builder>) -> Result<()> {
        let kind = builder.kind();
        if self.builders.contains_key(kind) {
            return Err(Error::validation(format!(
                "builder type '{kind}' is already registered"
            )));
        }
        self.builders.insert(kind, builder);
        Ok(())
    }

    /// The builder registered for the given type, if any.
    pub fn get(&self, kind: &str) -> Option<&dyn Builder> {
        self.builders.get(kind).map(Box::as_ref)
    }
}

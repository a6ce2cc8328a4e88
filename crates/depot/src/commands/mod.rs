//! Command implementations for the CLI verbs.

mod build;
mod init_workspace;
mod publish;
mod refresh;

use crate::cli::Commands;
use depot_builders::BuilderRegistry;
use depot_core::{Error, Result};
use std::path::PathBuf;

/// Execute the parsed command from the current working directory.
///
/// The builder registry is populated here, once, before any build runs.
pub async fn run(command: Commands) -> Result<()> {
    let working_dir = current_dir()?;
    match command {
        Commands::Build => {
            let builders = BuilderRegistry::with_defaults();
            build::run(&working_dir, &builders)
        }
        Commands::InitWorkspace {
            source_set,
            registry_root,
            store_root,
        } => init_workspace::run(&working_dir, source_set, registry_root, store_root).await,
        Commands::Publish => publish::run(&working_dir),
        Commands::Refresh => refresh::run(&working_dir),
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| Error::io(e, ".", "resolving working directory"))
}

//! Tracing subscriber setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. Verbose raises the default level
/// from `info` to `debug`; an explicit `RUST_LOG` always wins.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "depot={default_level},depot_core={default_level},depot_artifacts={default_level},depot_workspace={default_level},depot_builders={default_level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

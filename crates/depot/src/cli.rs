use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "depot")]
#[command(about = "Builds packages and distributes their artifacts through shared source sets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short = 'v', long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Build the package in the current directory")]
    Build,

    #[command(about = "Initialize a workspace bound to a source set and artifact store")]
    InitWorkspace {
        #[arg(long, help = "Name of the source set to track")]
        source_set: String,

        #[arg(long, help = "Root directory of the shared artifact registry")]
        registry_root: PathBuf,

        #[arg(long, help = "Root directory of the shared artifact store")]
        store_root: PathBuf,
    },

    #[command(about = "Publish the package in the current directory into the source set")]
    Publish,

    #[command(about = "Refresh the workspace's snapshot of the source set")]
    Refresh,
}

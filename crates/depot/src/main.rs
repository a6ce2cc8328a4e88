//! The `depot` binary: builds packages and distributes their artifacts
//! through shared source sets.

mod cli;
mod commands;
mod trace;

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    trace::init(cli.verbose);

    if let Err(error) = commands::run(cli.command).await {
        eprintln!("{:?}", miette::Report::new(error));
        std::process::exit(1);
    }
}

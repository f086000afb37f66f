//! Command implementations and dispatch.

pub mod check;
pub mod encode;
pub mod explain;
pub mod extract;
pub mod search;
pub mod shared;

use std::process::ExitCode;

use super::args::Commands;

/// Dispatches to the selected subcommand.
pub fn run(command: Commands) -> ExitCode {
    match command {
        Commands::Check(cmd) => check::run(&cmd),
        Commands::Encode(cmd) => encode::run(&cmd),
        Commands::Explain(cmd) => explain::run(&cmd),
        Commands::Extract(cmd) => extract::run(&cmd),
        Commands::Search(cmd) => search::run(&cmd),
    }
}

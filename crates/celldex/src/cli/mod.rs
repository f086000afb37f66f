//! CLI support for the `celldex` binary.

pub mod args;
pub mod commands;
pub mod load;
pub mod output;

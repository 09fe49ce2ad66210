//! Command-line interface for `gorun` and `gorund`

pub mod args;
pub mod commands;

pub use args::{Cli, DaemonCli, DaemonCommands, RunArgs};

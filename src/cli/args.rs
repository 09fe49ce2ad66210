//! CLI argument definitions using clap derive

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// gorun - run Go packages from a compile cache
///
/// Resolves PACKAGE to a cached executable via gorund, compiling it on
/// first use, then replaces itself with that executable.
#[derive(Parser, Debug)]
#[command(name = "gorun")]
#[command(author, version, long_about = None)]
#[command(about = "Run Go packages from a compile cache")]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "GORUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Recompile the package instead of running it
    #[arg(long, env = "GORUN_REBUILD", value_parser = FalseyValueParser::new())]
    pub rebuild: bool,

    /// Start gorund without asking if it is not running
    #[arg(short, long)]
    pub yes: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Package and the arguments passed to it
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Package to build, as accepted by `go build`
    pub package: String,

    /// Arguments for the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// gorund - the gorun compile server
#[derive(Parser, Debug)]
#[command(name = "gorund")]
#[command(author, version, long_about = None)]
#[command(about = "The gorun compile server")]
#[command(propagate_version = true)]
pub struct DaemonCli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: DaemonCommands,

    /// Increase verbosity (-v debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GORUN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available daemon commands
#[derive(Subcommand, Debug)]
pub enum DaemonCommands {
    /// Start the server in the background
    Start,

    /// Stop the background server
    Stop,

    /// Run the server in the foreground
    Run,

    /// Show whether the background server is running
    Status,
}

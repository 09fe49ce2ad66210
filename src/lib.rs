//! gorun - run Go packages from a compile cache
//!
//! A long-lived server (`gorund`) compiles each (package, directory) pair
//! once and hands out paths to immutable executables; the `gorun` client
//! asks it for a path and execs the result.

pub mod build;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod rpc;
pub mod ui;

pub use error::{GorunError, GorunResult};

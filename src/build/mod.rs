//! Build cache for compiled Go executables
//!
//! A request is identified by its (package, directory) pair. The cache
//! compiles each pair at most once at a time and hands out paths to
//! immutable artifacts.
//!
//! # Artifact layout
//!
//! | Path | Description |
//! |------|-------------|
//! | `<root>/<key>/` | One directory per build key |
//! | `<root>/<key>/<random>` | One file per successful compile, never rewritten |
//!
//! Superseded artifacts are left in place: a caller may still be executing
//! a path handed out before a rebuild.

pub mod cache;
pub mod compiler;
pub mod key;

pub use cache::BuildCache;
pub use compiler::{Compiler, GoCompiler};
pub use key::{BuildContext, BuildKey};

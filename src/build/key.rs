//! Build identity: what to compile and where its artifacts live

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What to compile: a main package resolved relative to a directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildContext {
    /// Package path as passed to `go build`
    pub package: String,

    /// Directory `go build` runs in
    pub directory: PathBuf,
}

impl BuildContext {
    /// Create a new build context
    pub fn new(package: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            package: package.into(),
            directory: directory.into(),
        }
    }

    /// Derive the cache key for this context
    pub fn key(&self) -> BuildKey {
        BuildKey::derive(&self.package, &self.directory.to_string_lossy())
    }
}

impl fmt::Display for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.package, self.directory.display())
    }
}

/// XXH3-128 of `package \0 directory`, rendered as 32 lowercase hex chars
///
/// Safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildKey(String);

impl BuildKey {
    /// Hash a (package, directory) pair
    pub fn derive(package: &str, directory: &str) -> Self {
        let mut input = Vec::with_capacity(package.len() + directory.len() + 1);
        input.extend_from_slice(package.as_bytes());
        input.push(0);
        input.extend_from_slice(directory.as_bytes());

        let hash = xxhash_rust::xxh3::xxh3_128(&input);
        Self(hex::encode(hash.to_be_bytes()))
    }

    /// The hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<std::path::Path> for BuildKey {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

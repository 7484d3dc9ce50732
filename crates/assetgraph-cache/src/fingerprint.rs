//! Aggregate fingerprint of a project's asset files

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project-relative path -> content hash, for every asset file on disk.
///
/// Two sets are equal iff the same files exist with the same content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintSet(BTreeMap<String, String>);

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file's hash, returning the previous one if the path was present
    pub fn insert(&mut self, path: impl Into<String>, hash: impl Into<String>) -> Option<String> {
        self.0.insert(path.into(), hash.into())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(path, hash)| (path.as_str(), hash.as_str()))
    }

    /// Paths whose presence or hash differs between the two sets
    pub fn changed_paths<'a>(&'a self, other: &'a FingerprintSet) -> Vec<&'a str> {
        let mut changed: Vec<&str> = self
            .0
            .iter()
            .filter(|(path, hash)| other.0.get(*path) != Some(*hash))
            .map(|(path, _)| path.as_str())
            .collect();
        changed.extend(
            other
                .0
                .keys()
                .filter(|path| !self.0.contains_key(*path))
                .map(String::as_str),
        );
        changed.sort_unstable();
        changed
    }
}

impl<P: Into<String>, H: Into<String>> FromIterator<(P, H)> for FingerprintSet {
    fn from_iter<I: IntoIterator<Item = (P, H)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(path, hash)| (path.into(), hash.into()))
                .collect(),
        )
    }
}

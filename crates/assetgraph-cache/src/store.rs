//! File-backed artifact store with atomic writes

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::fingerprint::FingerprintSet;

/// Envelope layout version. Entries with any other version are misses.
pub const FORMAT_VERSION: u32 = 1;

/// The four derived artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Manifest,
    Lineage,
    Schemas,
    Tests,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [Self::Manifest, Self::Lineage, Self::Schemas, Self::Tests];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::Lineage => "lineage",
            Self::Schemas => "schemas",
            Self::Tests => "tests",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// On-disk envelope for one artifact.
///
/// `generated_at` is the only volatile field and lives outside `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub format_version: u32,
    pub kind: ArtifactKind,
    pub generated_at: DateTime<Utc>,
    pub fingerprints: FingerprintSet,
    pub payload: T,
}

/// Validity of a stored artifact against the current fingerprint set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Stored fingerprints match the current asset files
    Fresh,

    /// Readable, but computed from a different file set
    Stale,

    /// Nothing stored
    Missing,

    /// Unreadable or undecodable entry
    Corrupt,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Stale => write!(f, "stale"),
            Self::Missing => write!(f, "missing"),
            Self::Corrupt => write!(f, "corrupt"),
        }
    }
}

/// Metadata cache rooted at one directory.
///
/// Holds no in-memory state, so any number of instances may read the same
/// directory concurrently. Writers of the same kind race; the last rename wins.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    dir: PathBuf,
}

impl MetadataCache {
    /// Create a cache over `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the stored artifact for `kind`
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Load an artifact if it was computed from exactly `fingerprints`.
    ///
    /// Returns None on a miss. Corrupt entries are logged and also count as a
    /// miss so the caller regenerates.
    pub fn load<T: DeserializeOwned>(&self, kind: ArtifactKind, fingerprints: &FingerprintSet) -> Option<T> {
        match self.read_entry::<T>(kind) {
            Ok(Some(entry)) if entry.fingerprints == *fingerprints => {
                tracing::debug!(%kind, generated_at = %entry.generated_at, "cache hit");
                Some(entry.payload)
            }
            Ok(Some(entry)) => {
                tracing::debug!(
                    %kind,
                    changed = entry.fingerprints.changed_paths(fingerprints).len(),
                    "cache stale"
                );
                None
            }
            Ok(None) => {
                tracing::debug!(%kind, "cache missing");
                None
            }
            Err(e) => {
                tracing::warn!(%kind, "ignoring unreadable cache entry: {}", e);
                None
            }
        }
    }

    /// Atomically store an artifact together with the fingerprints it was computed from
    ///
    /// # Arguments
    ///
    /// * `kind` - Which artifact slot to write
    /// * `payload` - The artifact
    /// * `fingerprints` - Fingerprint set of the asset files the artifact reflects
    pub fn save<T: Serialize>(
        &self,
        kind: ArtifactKind,
        payload: &T,
        fingerprints: &FingerprintSet,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            format_version: FORMAT_VERSION,
            kind,
            generated_at: Utc::now(),
            fingerprints: fingerprints.clone(),
            payload,
        };
        let bytes = serde_json::to_vec_pretty(&entry).map_err(|source| CacheError::Serialize { kind, source })?;

        std::fs::create_dir_all(&self.dir).map_err(|source| self.io_error(&self.dir, source))?;

        // Readers see either the old file or the new one, never a partial write
        let target = self.path_for(kind);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|source| self.io_error(&self.dir, source))?;
        tmp.write_all(&bytes).map_err(|source| self.io_error(tmp.path(), source))?;
        tmp.as_file().sync_all().map_err(|source| self.io_error(tmp.path(), source))?;
        tmp.persist(&target).map_err(|e| self.io_error(&target, e.error))?;

        tracing::debug!(%kind, path = %target.display(), "cache saved");
        Ok(())
    }

    /// Classify the stored artifact for `kind` against `fingerprints`
    pub fn status(&self, kind: ArtifactKind, fingerprints: &FingerprintSet) -> CacheStatus {
        match self.read_entry::<serde_json::Value>(kind) {
            Ok(Some(entry)) if entry.fingerprints == *fingerprints => CacheStatus::Fresh,
            Ok(Some(_)) => CacheStatus::Stale,
            Ok(None) => CacheStatus::Missing,
            Err(_) => CacheStatus::Corrupt,
        }
    }

    /// Generation time of the stored artifact, if readable
    pub fn generated_at(&self, kind: ArtifactKind) -> Option<DateTime<Utc>> {
        self.read_entry::<serde_json::Value>(kind)
            .ok()
            .flatten()
            .map(|entry| entry.generated_at)
    }

    /// Remove every stored artifact. Returns how many files were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for kind in ArtifactKind::ALL {
            let path = self.path_for(kind);
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(self.io_error(&path, source)),
            }
        }

        tracing::info!(removed, dir = %self.dir.display(), "cache cleared");
        Ok(removed)
    }

    /// Read and validate the envelope for `kind`. Ok(None) means no file.
    fn read_entry<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<Option<CacheEntry<T>>, CacheError> {
        let path = self.path_for(kind);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(&path, source)),
        };

        let entry: CacheEntry<T> = serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupt {
            kind,
            reason: e.to_string(),
        })?;

        if entry.format_version != FORMAT_VERSION {
            return Err(CacheError::Corrupt {
                kind,
                reason: format!(
                    "format version {} (expected {})",
                    entry.format_version, FORMAT_VERSION
                ),
            });
        }
        if entry.kind != kind {
            return Err(CacheError::Corrupt {
                kind,
                reason: format!("entry holds a {} artifact", entry.kind),
            });
        }

        Ok(Some(entry))
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

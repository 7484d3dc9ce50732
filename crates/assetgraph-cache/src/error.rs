//! Cache errors
//!
//! Only `save` and `clear` surface these to callers. Read-side failures are
//! logged and reported as a miss.

use std::path::PathBuf;

use crate::store::ArtifactKind;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {kind} artifact: {source}")]
    Serialize {
        kind: ArtifactKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupt {kind} cache entry: {reason}")]
    Corrupt { kind: ArtifactKind, reason: String },
}

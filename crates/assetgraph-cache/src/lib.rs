//! Persistent store for derived compile artifacts
//!
//! Artifacts (manifest, lineage, schemas, tests) are stored as JSON envelopes
//! keyed by the fingerprint set of the asset files they were computed from.
//! Any difference in that set invalidates the whole artifact.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let cache = MetadataCache::new(project_root.join(".assetgraph"));
//!
//! if let Some(manifest) = cache.load::<Manifest>(ArtifactKind::Manifest, &fingerprints) {
//!     // Use cached manifest
//! }
//!
//! cache.save(ArtifactKind::Manifest, &manifest, &fingerprints)?;
//! ```

pub mod error;
pub mod fingerprint;
pub mod store;

pub use error::CacheError;
pub use fingerprint::FingerprintSet;
pub use store::{ArtifactKind, CacheEntry, CacheStatus, MetadataCache, FORMAT_VERSION};

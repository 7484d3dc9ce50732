//! Definition parsing errors

use std::path::PathBuf;

/// Errors raised while reading a single asset definition.
///
/// All variants carry the offending path; no partial record is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Failed to parse asset definition {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Asset definition {} is missing required field '{field}'", path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("Failed to read asset definition {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DefinitionError {
    /// Path of the definition that failed
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Parse { path, .. } | Self::MissingField { path, .. } | Self::Io { path, .. } => {
                path
            }
        }
    }
}

//! Asset definition parsing
//!
//! Reads one YAML definition file, fingerprints its raw bytes and yields the
//! declared blocks. No cross-file reads happen here.

use assetgraph_core::blocks::null_as_default;
use assetgraph_core::{Blocks, ContractBlock, IngestBlock, TestDefinition, TransformBlock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::DefinitionError;

/// Hex-encoded SHA-256 of raw file content
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// One parsed asset definition. Superseded, never edited, when content changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDefinition {
    /// Unique asset identifier (`id`, falling back to `name`)
    pub id: String,

    /// File the definition was read from
    pub path: PathBuf,

    /// Optional free-text description
    pub description: Option<String>,

    /// Declared blocks; absent blocks are empty
    pub blocks: Blocks,

    /// Fingerprint of the raw file bytes
    pub content_hash: String,
}

/// Raw document shape. Unknown top-level keys are ignored.
#[derive(Deserialize)]
struct RawDefinition {
    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    ingest: IngestBlock,

    #[serde(default, deserialize_with = "null_as_default")]
    transform: TransformBlock,

    #[serde(default, deserialize_with = "null_as_default")]
    contract: ContractBlock,

    #[serde(default, deserialize_with = "null_as_default")]
    tests: Vec<TestDefinition>,
}

/// Parser for asset definition files
pub struct DefinitionParser;

impl DefinitionParser {
    /// Read and parse a definition file.
    ///
    /// Returns the record together with its content hash.
    pub fn parse(path: &Path) -> Result<(AssetDefinition, String), DefinitionError> {
        let bytes = std::fs::read(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let definition = Self::parse_bytes(path, &bytes)?;
        let hash = definition.content_hash.clone();
        Ok((definition, hash))
    }

    /// Parse definition content that was already read from `path`
    pub fn parse_bytes(path: &Path, bytes: &[u8]) -> Result<AssetDefinition, DefinitionError> {
        let parse_error = |message: String| DefinitionError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let document: serde_yaml::Value =
            serde_yaml::from_slice(bytes).map_err(|e| parse_error(e.to_string()))?;
        if !document.is_mapping() {
            return Err(parse_error("definition must be a YAML mapping".to_string()));
        }

        let raw: RawDefinition =
            serde_yaml::from_value(document).map_err(|e| parse_error(e.to_string()))?;

        let id = [raw.id, raw.name]
            .into_iter()
            .flatten()
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .ok_or_else(|| DefinitionError::MissingField {
                path: path.to_path_buf(),
                field: "id",
            })?;

        tracing::debug!(asset = %id, path = %path.display(), "parsed asset definition");

        Ok(AssetDefinition {
            id,
            path: path.to_path_buf(),
            description: raw.description,
            blocks: Blocks {
                ingest: raw.ingest,
                transform: raw.transform,
                contract: raw.contract,
                tests: raw.tests,
            },
            content_hash: content_hash(bytes),
        })
    }
}

//! Canonical definition blocks
//!
//! Every asset carries all four blocks. A block that is absent from the
//! definition file (or written as YAML `null`) is the block's empty value,
//! never `None`, so consumers can read fields without presence checks.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::schema::{ColumnInfo, TestDefinition};

/// Free-form settings kept alongside the typed fields of a block
pub type Settings = BTreeMap<String, serde_json::Value>;

/// Deserialize a possibly-null value as its default
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Source configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestBlock {
    /// Source kind (e.g. `rest_api`, `sql_database`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    /// Explicit column list; authoritative for the schema when present
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnInfo>,

    /// Remaining source settings (endpoint, table, credentials, ...)
    #[serde(flatten)]
    pub settings: Settings,
}

impl IngestBlock {
    pub fn is_empty(&self) -> bool {
        self.source_type.is_none() && self.columns.is_empty() && self.settings.is_empty()
    }
}

/// Query-like body with templated references to upstream assets
///
/// Written either as a plain string or as a map with a `sql` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransformSpec")]
pub struct TransformBlock {
    /// Transform text
    pub sql: String,

    /// Additional transform settings (e.g. materialization)
    #[serde(flatten)]
    pub settings: Settings,
}

impl TransformBlock {
    /// Create a transform from query text
    pub fn from_sql(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            settings: Settings::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty() && self.settings.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TransformSpec {
    Query(String),
    Detailed(TransformMap),
}

#[derive(Deserialize)]
struct TransformMap {
    #[serde(default, deserialize_with = "null_as_default")]
    sql: String,
    #[serde(flatten)]
    settings: Settings,
}

impl From<TransformSpec> for TransformBlock {
    fn from(spec: TransformSpec) -> Self {
        match spec {
            TransformSpec::Query(sql) => TransformBlock::from_sql(sql),
            TransformSpec::Detailed(map) => TransformBlock {
                sql: map.sql,
                settings: map.settings,
            },
        }
    }
}

/// Schema/type enforcement policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractBlock {
    /// Schema evolution policy (e.g. `evolve`, `freeze`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution: Option<String>,

    /// Enforce declared column types
    #[serde(default, deserialize_with = "null_as_default")]
    pub enforce_types: bool,

    /// Columns that must be present
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub required_columns: Vec<String>,

    /// Remaining contract settings
    #[serde(flatten)]
    pub settings: Settings,
}

impl ContractBlock {
    pub fn is_empty(&self) -> bool {
        self.evolution.is_none()
            && !self.enforce_types
            && self.required_columns.is_empty()
            && self.settings.is_empty()
    }
}

/// All declared blocks of one asset, normalized
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blocks {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingest: IngestBlock,

    #[serde(default, deserialize_with = "null_as_default")]
    pub transform: TransformBlock,

    #[serde(default, deserialize_with = "null_as_default")]
    pub contract: ContractBlock,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tests: Vec<TestDefinition>,
}

impl Blocks {
    /// Names of the blocks that carry content, in canonical order
    pub fn declared(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if !self.ingest.is_empty() {
            names.push("ingest");
        }
        if !self.transform.is_empty() {
            names.push("transform");
        }
        if !self.contract.is_empty() {
            names.push("contract");
        }
        if !self.tests.is_empty() {
            names.push("tests");
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_blocks_are_empty() {
        let blocks: Blocks = serde_json::from_str("{}").unwrap();
        assert!(blocks.ingest.is_empty());
        assert!(blocks.transform.is_empty());
        assert!(blocks.contract.is_empty());
        assert!(blocks.tests.is_empty());
        assert!(blocks.declared().is_empty());
    }

    #[test]
    fn null_blocks_are_empty() {
        let blocks: Blocks =
            serde_json::from_str(r#"{"ingest": null, "transform": null, "tests": null}"#).unwrap();
        assert_eq!(blocks, Blocks::default());
    }

    #[test]
    fn transform_accepts_string_or_map() {
        let plain: TransformBlock = serde_json::from_str(r#""SELECT 1""#).unwrap();
        assert_eq!(plain.sql, "SELECT 1");

        let detailed: TransformBlock =
            serde_json::from_str(r#"{"sql": "SELECT 2", "materialization": "view"}"#).unwrap();
        assert_eq!(detailed.sql, "SELECT 2");
        assert_eq!(detailed.settings["materialization"], "view");
    }

    #[test]
    fn serialized_blocks_are_never_null() {
        let json = serde_json::to_value(Blocks::default()).unwrap();
        assert_eq!(json["ingest"], serde_json::json!({}));
        assert_eq!(json["transform"], serde_json::json!({"sql": ""}));
        assert_eq!(json["contract"], serde_json::json!({"enforce_types": false}));
        assert_eq!(json["tests"], serde_json::json!([]));
    }

    #[test]
    fn ingest_keeps_unknown_settings() {
        let ingest: IngestBlock = serde_json::from_str(
            r#"{"type": "rest_api", "endpoint": "https://api.example.com", "columns": ["id"]}"#,
        )
        .unwrap();

        assert_eq!(ingest.source_type.as_deref(), Some("rest_api"));
        assert_eq!(ingest.columns.len(), 1);
        assert_eq!(ingest.settings["endpoint"], "https://api.example.com");
    }
}

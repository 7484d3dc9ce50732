//! Schema and test metadata attached to each asset

use serde::{Deserialize, Serialize};

/// Type name recorded when a column's type is not declared
pub const UNKNOWN_TYPE: &str = "unknown";

fn unknown_type() -> String {
    UNKNOWN_TYPE.to_string()
}

/// A column in an asset schema
///
/// In definition files a column may be written as a bare name or as a
/// `{name, type, description}` map; both deserialize into this struct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ColumnSpec")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// Declared type, or `unknown`
    #[serde(rename = "type")]
    pub data_type: String,

    /// Description
    pub description: String,
}

impl ColumnInfo {
    /// Create a column with a declared type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            description: String::new(),
        }
    }

    /// Create a column whose type could not be determined
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, UNKNOWN_TYPE)
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether the type is known
    pub fn is_typed(&self) -> bool {
        self.data_type != UNKNOWN_TYPE
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Name(String),
    Detailed {
        name: String,
        #[serde(rename = "type", default = "unknown_type")]
        data_type: String,
        #[serde(default)]
        description: String,
    },
}

impl From<ColumnSpec> for ColumnInfo {
    fn from(spec: ColumnSpec) -> Self {
        match spec {
            ColumnSpec::Name(name) => ColumnInfo::untyped(name),
            ColumnSpec::Detailed {
                name,
                data_type,
                description,
            } => ColumnInfo::new(name, data_type).with_description(description),
        }
    }
}

/// Where the columns of a schema came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSource {
    /// Explicit column list in the ingest block (authoritative)
    Declared,

    /// Lexically inferred from the transform text
    Inferred,

    /// No column information available
    Absent,
}

/// Per-asset schema as exposed to downstream consumers
///
/// `columns` may be truncated; `total_columns` always holds the original count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    /// Ordered list of columns
    pub columns: Vec<ColumnInfo>,

    /// Provenance of the column list
    pub source: ColumnSource,

    /// Whether `columns` was cut to the size limit
    pub truncated: bool,

    /// Number of columns before truncation
    pub total_columns: usize,
}

impl SchemaInfo {
    /// Create an empty schema
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            source: ColumnSource::Absent,
            truncated: false,
            total_columns: 0,
        }
    }

    /// Build a schema, truncating to `limit` columns
    pub fn from_columns(mut columns: Vec<ColumnInfo>, source: ColumnSource, limit: usize) -> Self {
        let total_columns = columns.len();
        let truncated = total_columns > limit;
        if truncated {
            columns.truncate(limit);
        }

        Self {
            columns,
            source,
            truncated,
            total_columns,
        }
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for SchemaInfo {
    fn default() -> Self {
        Self::empty()
    }
}

fn unnamed_test() -> String {
    "unnamed_test".to_string()
}

fn empty_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A named validation declared in an asset's `tests` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TestSpec")]
pub struct TestDefinition {
    /// Test name
    pub name: String,

    /// Test kind (e.g. `not_null`, `unique`)
    #[serde(rename = "type")]
    pub test_type: String,

    /// Free-form test configuration
    pub config: serde_json::Value,

    /// Description
    pub description: String,
}

impl TestDefinition {
    /// Create a test with the given name and kind
    pub fn new(name: impl Into<String>, test_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            test_type: test_type.into(),
            config: empty_config(),
            description: String::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TestSpec {
    Name(String),
    Detailed {
        #[serde(default = "unnamed_test")]
        name: String,
        #[serde(rename = "type", default = "unknown_type")]
        test_type: String,
        #[serde(default = "empty_config")]
        config: serde_json::Value,
        #[serde(default)]
        description: String,
    },
}

impl From<TestSpec> for TestDefinition {
    fn from(spec: TestSpec) -> Self {
        match spec {
            TestSpec::Name(name) => TestDefinition::new(name, UNKNOWN_TYPE),
            TestSpec::Detailed {
                name,
                test_type,
                config,
                description,
            } => {
                let config = if config.is_null() { empty_config() } else { config };
                TestDefinition {
                    name,
                    test_type,
                    config,
                    description,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_from_bare_name() {
        let col: ColumnInfo = serde_json::from_str(r#""user_id""#).unwrap();
        assert_eq!(col, ColumnInfo::untyped("user_id"));
        assert!(!col.is_typed());
    }

    #[test]
    fn column_from_map() {
        let col: ColumnInfo =
            serde_json::from_str(r#"{"name": "amount", "type": "decimal", "description": "net"}"#)
                .unwrap();
        assert_eq!(col.data_type, "decimal");
        assert_eq!(col.description, "net");
    }

    #[test]
    fn schema_truncation_keeps_total() {
        let columns = (0..60).map(|i| ColumnInfo::untyped(format!("c{}", i))).collect();
        let schema = SchemaInfo::from_columns(columns, ColumnSource::Declared, 50);

        assert_eq!(schema.columns.len(), 50);
        assert!(schema.truncated);
        assert_eq!(schema.total_columns, 60);
        assert_eq!(schema.columns.last().unwrap().name, "c49");
    }

    #[test]
    fn schema_under_limit_not_truncated() {
        let schema = SchemaInfo::from_columns(
            vec![ColumnInfo::untyped("id"), ColumnInfo::untyped("name")],
            ColumnSource::Inferred,
            50,
        );

        assert!(!schema.truncated);
        assert_eq!(schema.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_definition_defaults() {
        let test: TestDefinition = serde_json::from_str(r#"{"type": "not_null"}"#).unwrap();
        assert_eq!(test.name, "unnamed_test");
        assert_eq!(test.test_type, "not_null");
        assert_eq!(test.config, serde_json::json!({}));

        let bare: TestDefinition = serde_json::from_str(r#""row_count""#).unwrap();
        assert_eq!(bare.test_type, UNKNOWN_TYPE);
    }

    #[test]
    fn test_definition_survives_serialization() {
        let mut test = TestDefinition::new("positive_amount", "expression");
        test.config = serde_json::json!({"expr": "amount > 0"});

        let json = serde_json::to_string(&test).unwrap();
        let back: TestDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, test);
    }
}

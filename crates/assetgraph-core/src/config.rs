//! Configuration schema (assetgraph.toml)

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "assetgraph.toml";

fn default_asset_extension() -> String {
    "asset".to_string()
}

fn default_cache_dir() -> String {
    ".assetgraph".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_schema_columns() -> usize {
    50
}

fn default_max_inferred_columns() -> usize {
    20
}

/// Project identity and discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (defaults to the root directory name)
    #[serde(default)]
    pub name: String,

    /// File extension of asset definitions, without the dot
    #[serde(default = "default_asset_extension")]
    pub asset_extension: String,

    /// Paths to skip during discovery (glob patterns, relative to the root)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Directory holding cached artifacts, relative to the root
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Worker threads for parsing (0 = one per core)
    #[serde(default)]
    pub concurrency: usize,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            asset_extension: default_asset_extension(),
            exclude: Vec::new(),
            cache_dir: default_cache_dir(),
            concurrency: 0,
        }
    }
}

impl ProjectConfig {
    /// Compile the exclude patterns into one matcher over relative paths.
    ///
    /// A pattern without glob metacharacters excludes that path and everything
    /// below it. `*` stays within one path segment; `**` crosses segments.
    pub fn exclude_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in &self.exclude {
            let pattern = pattern.trim_end_matches('/');
            let expanded = if pattern.contains(['*', '?', '[', '{']) {
                vec![pattern.to_string()]
            } else {
                vec![pattern.to_string(), format!("{}/**", pattern)]
            };

            for glob in expanded {
                let glob = GlobBuilder::new(&glob)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern(pattern.to_string(), e.to_string()))?;
                builder.add(glob);
            }
        }

        builder
            .build()
            .map_err(|e| ConfigError::InvalidPattern(self.exclude.join(", "), e.to_string()))
    }
}

/// Lineage resolution policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Accept references to assets outside the project as external sources.
    /// When false, an unresolved reference fails the compile pass.
    #[serde(default = "default_true")]
    pub allow_external: bool,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            allow_external: true,
        }
    }
}

/// Size limits applied to derived metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum columns exposed per schema before truncation
    #[serde(default = "default_max_schema_columns")]
    pub max_schema_columns: usize,

    /// Maximum columns inferred from transform text
    #[serde(default = "default_max_inferred_columns")]
    pub max_inferred_columns: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_schema_columns: default_max_schema_columns(),
            max_inferred_columns: default_max_inferred_columns(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project settings
    #[serde(default)]
    pub project: ProjectConfig,

    /// Lineage policy
    #[serde(default)]
    pub lineage: LineageConfig,

    /// Metadata limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.display().to_string(), e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }
        config.fill_project_name();

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load `assetgraph.toml` from a project root, or fall back to defaults
    pub fn for_project(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Self::from_file(&path);
        }

        let mut config = Config {
            project_root: root.to_path_buf(),
            ..Config::default()
        };
        config.fill_project_name();
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(path.display().to_string(), e.to_string()))?;

        Ok(())
    }

    /// Absolute location of the cache directory
    pub fn cache_path(&self) -> PathBuf {
        self.project_root.join(&self.project.cache_dir)
    }

    fn fill_project_name(&mut self) {
        if self.project.name.is_empty() {
            self.project.name = self
                .project_root
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "project".to_string());
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    IoError(String, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid exclude pattern '{0}': {1}")]
    InvalidPattern(String, String),
}

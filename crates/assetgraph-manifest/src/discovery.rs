//! Asset file discovery and fingerprinting
//!
//! Reads every definition file once. The bytes read here are both hashed for
//! the cache key and handed to the parser, so the fingerprint always matches
//! what was compiled.

use assetgraph_cache::FingerprintSet;
use assetgraph_core::Config;
use assetgraph_parser::content_hash;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error::CompileError;

/// Directories never searched for definitions
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

/// One definition file read from disk
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the project root, `/`-separated
    pub relative: String,

    /// Raw file content
    pub content: Vec<u8>,

    /// Hash of `content`
    pub hash: String,
}

/// All definition files of a project, sorted by relative path
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    files: Vec<SourceFile>,
}

impl SourceSet {
    /// Walk the project root and read every definition file
    pub fn scan(config: &Config) -> Result<Self, CompileError> {
        let root = &config.project_root;
        let cache_dir = config.cache_path();
        let extension = config.project.asset_extension.trim_start_matches('.');
        let excluded = config.project.exclude_set()?;

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry, &cache_dir));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                CompileError::Discovery {
                    path,
                    source: e.into(),
                }
            })?;

            if !entry.file_type().is_file() || entry.path().extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }

            let relative = relative_path(root, entry.path());
            if excluded.is_match(&relative) {
                tracing::debug!(path = %relative, "excluded");
                continue;
            }

            let content = std::fs::read(entry.path()).map_err(|source| CompileError::Discovery {
                path: entry.path().to_path_buf(),
                source,
            })?;
            let hash = content_hash(&content);
            files.push(SourceFile {
                relative,
                content,
                hash,
            });
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        tracing::debug!(root = %root.display(), files = files.len(), "discovered asset files");

        Ok(Self { files })
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Cache key for this file set
    pub fn fingerprints(&self) -> FingerprintSet {
        self.files
            .iter()
            .map(|file| (file.relative.as_str(), file.hash.as_str()))
            .collect()
    }
}

fn is_skipped_dir(entry: &DirEntry, cache_dir: &Path) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&&*name) || entry.path() == cache_dir
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Absolute path of a source file
pub fn absolute_path(root: &Path, relative: &str) -> PathBuf {
    relative.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}

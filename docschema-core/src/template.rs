// Templates and frontmatter
//
// A template is a markdown file whose YAML frontmatter carries a `validation:`
// mapping. Documents use the same frontmatter block for their own metadata.
//
//   ---            <- first line of the file
//   doc_type: hub
//   validation:
//     max_lines: 200
//   ---
//   # Body ...

use crate::rules::{Frontmatter, ValidationSchema};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n").expect("frontmatter regex is valid")
});

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template {} has no frontmatter", .path.display())]
    MissingFrontmatter { path: PathBuf },

    #[error("template {} has no 'validation' section in frontmatter", .path.display())]
    MissingValidationBlock { path: PathBuf },

    #[error("failed to parse YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid validation block in {}: {source}", .path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Split a leading `---` frontmatter block from the body.
/// Returns `(yaml, body)`, or `None` when the text has no frontmatter.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let captures = FRONTMATTER_RE.captures(content)?;
    let yaml = captures.get(1)?.as_str();
    let body = &content[captures.get(0)?.end()..];
    Some((yaml, body))
}

/// Whether the first line is a frontmatter fence, closed or not.
pub fn has_frontmatter_marker(content: &str) -> bool {
    content.lines().next().is_some_and(|line| line.trim() == "---")
}

/// Parse a document's frontmatter block as a YAML mapping.
/// `Ok(None)` when there is no block; an empty block is an empty mapping.
pub fn extract_frontmatter(content: &str) -> Result<Option<Frontmatter>, serde_yaml::Error> {
    let Some((yaml, _)) = split_frontmatter(content) else {
        return Ok(None);
    };
    if yaml.trim().is_empty() {
        return Ok(Some(Frontmatter::new()));
    }
    serde_yaml::from_str(yaml).map(Some)
}

/// A template's validation block, both raw and typed.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub path: PathBuf,
    /// The `validation:` value exactly as written.
    pub block: serde_yaml::Value,
    pub schema: ValidationSchema,
    /// See [`schema_digest`].
    pub digest: String,
}

/// The raw `validation:` value of a template, `None` when its frontmatter has no such key.
pub fn read_validation_block(path: &Path) -> Result<Option<serde_yaml::Value>, TemplateError> {
    let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (yaml, _) = split_frontmatter(&content).ok_or_else(|| TemplateError::MissingFrontmatter {
        path: path.to_path_buf(),
    })?;

    let frontmatter: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|source| TemplateError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(frontmatter.get("validation").cloned())
}

pub fn load_template(path: &Path) -> Result<LoadedTemplate, TemplateError> {
    let block = read_validation_block(path)?.ok_or_else(|| TemplateError::MissingValidationBlock {
        path: path.to_path_buf(),
    })?;

    let schema = ValidationSchema::from_value(block.clone()).map_err(|source| TemplateError::Schema {
        path: path.to_path_buf(),
        source,
    })?;

    let digest = schema_digest(&block);
    tracing::debug!(template = %path.display(), digest = %digest, "template loaded");

    Ok(LoadedTemplate {
        path: path.to_path_buf(),
        block,
        schema,
        digest,
    })
}

/// Hex sha256 of the block's canonical JSON form (object keys sorted), so
/// that reformatting a template does not change its digest.
pub fn schema_digest(block: &serde_yaml::Value) -> String {
    let canonical = serde_json::to_value(block)
        .map(|json| json.to_string())
        .unwrap_or_else(|_| serde_yaml::to_string(block).unwrap_or_default());

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Loaded templates keyed by path. Owned by the caller; repeated loads of a
/// path return the same `Arc` until it is invalidated. Failed loads are not cached.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<PathBuf, Arc<LoadedTemplate>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, path: &Path) -> Result<Arc<LoadedTemplate>, TemplateError> {
        if let Some(hit) = self.lock().get(path) {
            tracing::trace!(template = %path.display(), "template cache hit");
            return Ok(Arc::clone(hit));
        }

        let loaded = Arc::new(load_template(path)?);
        let mut entries = self.lock();
        let stored = entries.entry(path.to_path_buf()).or_insert(loaded);
        Ok(Arc::clone(stored))
    }

    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<LoadedTemplate>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

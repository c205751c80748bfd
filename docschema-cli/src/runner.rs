// Validation runs: load a schema, then check each document against it.

use anyhow::{Context, Result};
use docschema_core::markdown::{parse_markdown, TokenCache};
use docschema_core::predicates::{Predicate, PredicateContext};
use docschema_core::rules::{Frontmatter, RuleEvaluator, ValidationSchema};
use docschema_core::template::{extract_frontmatter, has_frontmatter_marker, load_template, schema_digest};
use docschema_core::types::{RuleCategory, ValidationError};
use docschema_core::EngineConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A validation schema and where it came from.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    pub origin: PathBuf,
    pub block: serde_yaml::Value,
    pub schema: ValidationSchema,
    pub digest: String,
}

impl SchemaSource {
    /// The `validation:` block of a template's frontmatter.
    pub fn from_template(path: &Path) -> Result<Self> {
        let loaded = load_template(path)?;
        Ok(Self {
            origin: loaded.path,
            block: loaded.block,
            schema: loaded.schema,
            digest: loaded.digest,
        })
    }

    /// A standalone schema file; see [`load_schema_file`].
    pub fn from_schema_file(path: &Path) -> Result<Self> {
        let block = load_schema_file(path)?;
        let schema = ValidationSchema::from_value(block.clone())
            .with_context(|| format!("invalid validation schema in {}", path.display()))?;
        let digest = schema_digest(&block);
        Ok(Self {
            origin: path.to_path_buf(),
            block,
            schema,
            digest,
        })
    }
}

/// Read a schema file as a raw value: JSON for `.json`, YAML otherwise.
pub fn load_schema_file(path: &Path) -> Result<serde_yaml::Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading schema {}", path.display()))?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");

    let value = if is_json {
        serde_json::from_str(&content).with_context(|| format!("parsing JSON schema {}", path.display()))?
    } else if content.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("parsing YAML schema {}", path.display()))?
    };
    Ok(value)
}

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Documents must not start with a frontmatter block.
    pub no_frontmatter: bool,
    /// Only check documents whose frontmatter `doc_type` equals this.
    pub doc_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub documents_checked: usize,
    pub documents_skipped: usize,
    pub errors: Vec<ValidationError>,
}

impl RunSummary {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every document in order. A document that cannot be read aborts the run.
pub fn validate_documents(
    schema: &ValidationSchema,
    config: &EngineConfig,
    documents: &[PathBuf],
    options: &ValidateOptions,
) -> Result<RunSummary> {
    let cache = TokenCache::new();
    let evaluator = RuleEvaluator::new(schema)
        .with_config(config.clone())
        .with_cache(&cache);
    let mut summary = RunSummary::default();

    for path in documents {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading document {}", path.display()))?;
        let file_path = path.display().to_string();

        if options.no_frontmatter && has_frontmatter_marker(&content) {
            summary.documents_checked += 1;
            summary.errors.push(ValidationError::new(
                file_path,
                1,
                RuleCategory::Frontmatter,
                "Document must NOT have YAML frontmatter",
                "No frontmatter block",
                "---",
            ));
            continue;
        }

        let (frontmatter, frontmatter_error) = match extract_frontmatter(&content) {
            Ok(frontmatter) => (frontmatter, None),
            Err(err) => (None, Some(err)),
        };

        if let Some(wanted) = &options.doc_type {
            if !has_doc_type(frontmatter.as_ref(), wanted) {
                tracing::debug!(file = %file_path, doc_type = %wanted, "skipping document of another type");
                summary.documents_skipped += 1;
                continue;
            }
        }

        summary.documents_checked += 1;
        if let Some(err) = frontmatter_error {
            tracing::warn!(file = %file_path, error = %err, "frontmatter is not valid YAML");
            summary.errors.push(ValidationError::new(
                file_path,
                0,
                RuleCategory::Frontmatter,
                format!("Failed to parse frontmatter: {err}"),
                "Valid YAML frontmatter",
                "",
            ));
        }
        summary
            .errors
            .extend(evaluator.evaluate(path, &content, frontmatter.as_ref()));
    }

    Ok(summary)
}

/// Context for evaluating `predicate` against one document. The document is
/// read and parsed only when the predicate inspects its structure.
pub fn predicate_context(document: &Path, predicate: &Predicate) -> Result<PredicateContext> {
    let mut ctx = PredicateContext::new(document);
    if predicate.needs_ast() {
        let content = std::fs::read_to_string(document)
            .with_context(|| format!("reading document {}", document.display()))?;
        let tokens =
            parse_markdown(&content).with_context(|| format!("parsing document {}", document.display()))?;
        ctx.attach_ast(Arc::new(tokens));
    }
    Ok(ctx)
}

fn has_doc_type(frontmatter: Option<&Frontmatter>, wanted: &str) -> bool {
    frontmatter
        .and_then(|fm| fm.get("doc_type"))
        .and_then(|value| value.as_str())
        .is_some_and(|doc_type| doc_type == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_doc_type() {
        let fm: Frontmatter = serde_yaml::from_str("doc_type: hub\n").unwrap();
        assert!(has_doc_type(Some(&fm), "hub"));
        assert!(!has_doc_type(Some(&fm), "spoke"));
        assert!(!has_doc_type(None, "hub"));
    }
}

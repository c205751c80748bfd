use super::document::{check_filename_pattern, check_forbidden, check_max_lines, check_title_pattern};
use super::frontmatter::{check_frontmatter, Frontmatter};
use super::schema::ValidationSchema;
use super::section_rules::check_required_sections;
use crate::config::EngineConfig;
use crate::markdown::{MarkdownError, TokenCache, TokenStream};
use crate::predicates::{Predicate, PredicateContext, PredicateError};
use crate::types::{RuleCategory, ValidationError};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of each schema condition for one evaluation. Unknown names read as false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionResults {
    results: HashMap<String, bool>,
}

impl ConditionResults {
    pub fn is_true(&self, name: &str) -> bool {
        self.results.get(name).copied().unwrap_or(false)
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.results.get(name).copied()
    }

    pub(crate) fn set(&mut self, name: &str, value: bool) {
        self.results.insert(name.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Errors plus the condition outcomes that gated them.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub errors: Vec<ValidationError>,
    pub conditions: ConditionResults,
}

/// State for evaluating one document: where it lives, its text, the lazily
/// parsed token stream, and the errors found so far.
pub(crate) struct DocumentPass<'a> {
    pub path: &'a Path,
    pub file_path: String,
    pub doc_dir: PathBuf,
    pub content: &'a str,
    pub config: &'a EngineConfig,
    cache: Option<&'a TokenCache>,
    tokens: Option<Arc<TokenStream>>,
    pub errors: Vec<ValidationError>,
}

impl<'a> DocumentPass<'a> {
    fn new(path: &'a Path, content: &'a str, config: &'a EngineConfig, cache: Option<&'a TokenCache>) -> Self {
        let file_path = path.display().to_string();
        let doc_dir = PredicateContext::new(path).doc_dir;
        Self {
            path,
            file_path,
            doc_dir,
            content,
            config,
            cache,
            tokens: None,
            errors: Vec::new(),
        }
    }

    /// Token stream of the document, parsed at most once per pass.
    pub fn tokens(&mut self) -> Result<Arc<TokenStream>, MarkdownError> {
        if let Some(tokens) = &self.tokens {
            return Ok(Arc::clone(tokens));
        }
        let tokens = match self.cache {
            Some(cache) => cache.parse(self.content, Some(self.file_path.as_str()))?,
            None => Arc::new(crate::markdown::parse_markdown(self.content)?),
        };
        self.tokens = Some(Arc::clone(&tokens));
        Ok(tokens)
    }

    /// Record a violation. Severity defaults to error; adjust through the returned reference.
    pub fn report(
        &mut self,
        line_number: usize,
        category: RuleCategory,
        detail: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> &mut ValidationError {
        self.errors.push(ValidationError::new(
            self.file_path.clone(),
            line_number,
            category,
            detail,
            expected,
            found,
        ));
        let last = self.errors.len() - 1;
        &mut self.errors[last]
    }

    pub fn report_invalid_pattern(
        &mut self,
        line_number: usize,
        category: RuleCategory,
        detail: impl Into<String>,
        pattern: &str,
    ) {
        tracing::warn!(file = %self.file_path, pattern, category = %category, "invalid regex pattern");
        self.report(line_number, category, detail, "Valid regular expression", pattern);
    }
}

/// Match that must begin at the start of `text` (but need not reach its end).
pub(crate) fn matches_at_start(regex: &Regex, text: &str) -> bool {
    regex.find(text).is_some_and(|m| m.start() == 0)
}

/// First `width` characters of `text`.
pub(crate) fn excerpt(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Interprets a [`ValidationSchema`] against documents.
///
/// Holds no per-document state: each call to [`evaluate`](Self::evaluate)
/// starts from fresh condition results and, unless a context was supplied,
/// a fresh predicate context for the document.
pub struct RuleEvaluator<'a> {
    schema: &'a ValidationSchema,
    config: EngineConfig,
    context: Option<PredicateContext>,
    cache: Option<&'a TokenCache>,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(schema: &'a ValidationSchema) -> Self {
        Self {
            schema,
            config: EngineConfig::default(),
            context: None,
            cache: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this predicate context (and any AST it carries) instead of building one per document.
    pub fn with_context(mut self, context: PredicateContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Share parsed token streams through `cache`, keyed by document path.
    pub fn with_cache(mut self, cache: &'a TokenCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn schema(&self) -> &ValidationSchema {
        self.schema
    }

    pub fn evaluate(
        &self,
        document_path: &Path,
        document_content: &str,
        frontmatter: Option<&Frontmatter>,
    ) -> Vec<ValidationError> {
        self.evaluate_detailed(document_path, document_content, frontmatter).errors
    }

    /// Run every configured rule in order. Rules are independent: a failure in
    /// one never skips a later one.
    pub fn evaluate_detailed(
        &self,
        document_path: &Path,
        document_content: &str,
        frontmatter: Option<&Frontmatter>,
    ) -> Evaluation {
        let mut pass = DocumentPass::new(document_path, document_content, &self.config, self.cache);
        let schema = self.schema;
        tracing::debug!(file = %pass.file_path, "evaluating document");

        let conditions = self.evaluate_conditions(&mut pass);

        if let Some(pattern) = &schema.filename_pattern {
            tracing::debug!(stage = "filename_pattern");
            check_filename_pattern(&mut pass, pattern);
        }

        if let (Some(rules), Some(frontmatter)) = (&schema.frontmatter, frontmatter) {
            tracing::debug!(stage = "frontmatter");
            check_frontmatter(&mut pass, frontmatter, rules);
        }

        if let Some(pattern) = &schema.title_pattern {
            tracing::debug!(stage = "title_pattern");
            check_title_pattern(&mut pass, pattern);
        }

        if let Some(limit) = schema.max_lines {
            tracing::debug!(stage = "max_lines");
            check_max_lines(&mut pass, limit);
        }

        if !schema.forbidden.is_empty() {
            tracing::debug!(stage = "forbidden");
            check_forbidden(&mut pass, &schema.forbidden);
        }

        if !schema.required_sections.is_empty() {
            tracing::debug!(stage = "required_sections");
            check_required_sections(&mut pass, &schema.required_sections, &conditions);
        }

        tracing::debug!(file = %pass.file_path, errors = pass.errors.len(), "document evaluated");
        Evaluation {
            errors: pass.errors,
            conditions,
        }
    }

    fn evaluate_conditions(&self, pass: &mut DocumentPass) -> ConditionResults {
        let mut results = ConditionResults::default();
        if self.schema.conditions.is_empty() {
            return results;
        }

        let mut ctx = self
            .context
            .clone()
            .unwrap_or_else(|| PredicateContext::new(pass.path));

        for (name, expression) in self.schema.conditions.iter() {
            match evaluate_condition(pass, &mut ctx, expression) {
                Ok(value) => {
                    tracing::debug!(condition = name, expression, value, "condition evaluated");
                    results.set(name, value);
                }
                Err(err) => {
                    tracing::warn!(condition = name, expression, error = %err, "condition failed");
                    pass.report(
                        0,
                        RuleCategory::Conditions,
                        format!("Failed to evaluate condition '{name}': {}", err.message()),
                        "Valid predicate expression",
                        expression,
                    );
                    // Rules gated on a failed condition are skipped.
                    results.set(name, false);
                }
            }
        }

        results
    }
}

fn evaluate_condition(
    pass: &mut DocumentPass,
    ctx: &mut PredicateContext,
    expression: &str,
) -> Result<bool, PredicateError> {
    let predicate = Predicate::parse(expression)?;

    if predicate.needs_ast() && !ctx.has_ast() {
        let tokens = pass.tokens().map_err(|err| PredicateError::Evaluation {
            expression: expression.to_string(),
            message: format!("failed to parse document: {err}"),
        })?;
        ctx.attach_ast(tokens);
    }

    predicate.evaluate(expression, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_at_start_is_prefix_anchored() {
        let re = Regex::new(r"CLAUDE").unwrap();
        assert!(matches_at_start(&re, "CLAUDE.md"));
        assert!(!matches_at_start(&re, "my-CLAUDE.md"));

        let re = Regex::new(r"[a-z]+\.md").unwrap();
        assert!(matches_at_start(&re, "guide.md.bak"));
    }

    #[test]
    fn test_excerpt_counts_characters() {
        assert_eq!(excerpt("héllo world", 5), "héllo");
        assert_eq!(excerpt("ab", 60), "ab");
    }

    #[test]
    fn test_condition_results_fail_closed() {
        let mut results = ConditionResults::default();
        results.set("a", true);
        assert!(results.is_true("a"));
        assert!(!results.is_true("missing"));
        assert_eq!(results.get("missing"), None);
    }

    #[test]
    fn test_empty_schema_reports_nothing() {
        let schema = ValidationSchema::default();
        let errors = RuleEvaluator::new(&schema).evaluate(Path::new("doc.md"), "# Anything\n", None);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_cache_is_keyed_by_document_path() {
        let schema = ValidationSchema::from_yaml_str(
            "conditions:\n  has_files: section_present(\"Files\")\n",
        )
        .unwrap();
        let cache = TokenCache::new();
        let evaluator = RuleEvaluator::new(&schema).with_cache(&cache);

        let result = evaluator.evaluate_detailed(Path::new("/tmp/x/doc.md"), "## Files\n\nx\n", None);
        assert!(result.conditions.is_true("has_files"));
        assert!(cache.get("/tmp/x/doc.md").is_some());
    }
}

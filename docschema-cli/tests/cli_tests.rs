//! CLI-facing behavior: report formatting, document discovery, schema files
//! and whole validation runs over temporary directory trees.

use docschema_cli::{
    collect_documents, format_error, load_schema_file, predicate_context, validate_documents, JsonReport,
    SchemaSource, ValidateOptions,
};
use docschema_core::predicates::Predicate;
use docschema_core::types::{RuleCategory, Severity, ValidationError};
use docschema_core::{EngineConfig, ValidationSchema};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Fixture helpers
// ============================================================================

fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn run(yaml: &str, documents: &[PathBuf], options: &ValidateOptions) -> docschema_cli::RunSummary {
    let schema = ValidationSchema::from_yaml_str(yaml).unwrap();
    validate_documents(&schema, &EngineConfig::default(), documents, options).unwrap()
}

// ============================================================================
// Text formatting
// ============================================================================

mod formatting {
    use super::*;

    #[test]
    fn line_level_error_with_all_parts() {
        let error = ValidationError::new(
            "docs/guide.md",
            12,
            RuleCategory::Forbidden,
            "Forbidden pattern found: how-to",
            "Content without forbidden pattern",
            "Pattern 'How to' found in: How to install...",
        );
        assert_eq!(
            format_error(&error),
            "[ERROR] docs/guide.md:12: forbidden\n  \
             Detail: Forbidden pattern found: how-to\n  \
             Expected: Content without forbidden pattern\n  \
             Found: Pattern 'How to' found in: How to install..."
        );
    }

    #[test]
    fn empty_parts_are_omitted() {
        let error = ValidationError::new("a.md", 0, RuleCategory::RequiredSections, "Failed to parse document", "", "")
            .with_severity(Severity::Warn);
        assert_eq!(format_error(&error), "[WARN] a.md: required_sections\n  Detail: Failed to parse document");
    }

    #[test]
    fn json_report_shape() {
        let errors = vec![ValidationError::new("a.md", 3, RuleCategory::MaxLines, "d", "e", "f")];
        let report = JsonReport::new(Some("hub.md".into()), "deadbeef", 2, errors);
        let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["schema_digest"], "deadbeef");
        assert_eq!(json["documents_checked"], 2);
        assert_eq!(json["template"], "hub.md");
        assert_eq!(json["errors"][0]["rule_violated"], "max_lines");
        assert_eq!(json["errors"][0]["severity"], "error");
        let generated_at = json["generated_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(generated_at).is_ok());
    }
}

// ============================================================================
// Discovery
// ============================================================================

mod discovery {
    use super::*;

    #[test]
    fn directories_are_walked_sorted_skipping_hidden_and_dunder() {
        let root = TempDir::new().unwrap();
        write(root.path(), "b.md", "");
        write(root.path(), "a.md", "");
        write(root.path(), "notes.txt", "");
        write(root.path(), "guides/setup.md", "");
        write(root.path(), ".git/HEAD.md", "");
        write(root.path(), "__pycache__/x.md", "");

        let found = collect_documents(&[root.path().to_path_buf()]).unwrap();
        let relative: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(root.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(relative, vec!["a.md", "b.md", "guides/setup.md"]);
    }

    #[test]
    fn explicit_files_keep_order_without_duplicates() {
        let root = TempDir::new().unwrap();
        let z = write(root.path(), "z.md", "");
        let a = write(root.path(), "a.md", "");
        let found = collect_documents(&[z.clone(), a.clone(), z.clone()]).unwrap();
        assert_eq!(found, vec![z, a]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let root = TempDir::new().unwrap();
        assert!(collect_documents(&[root.path().join("absent")]).is_err());
    }
}

// ============================================================================
// Schema sources
// ============================================================================

mod schema_sources {
    use super::*;

    #[test]
    fn json_and_yaml_schema_files_agree() {
        let root = TempDir::new().unwrap();
        let yaml = write(root.path(), "rules.yaml", "max_lines: 10\ntitle_pattern: '^# '\n");
        let json = write(root.path(), "rules.json", r#"{"title_pattern": "^# ", "max_lines": 10}"#);

        let from_yaml = SchemaSource::from_schema_file(&yaml).unwrap();
        let from_json = SchemaSource::from_schema_file(&json).unwrap();
        assert_eq!(from_yaml.schema, from_json.schema);
        assert_eq!(from_yaml.digest, from_json.digest);
    }

    #[test]
    fn empty_yaml_schema_file_is_empty_schema() {
        let root = TempDir::new().unwrap();
        let path = write(root.path(), "empty.yaml", "");
        assert!(load_schema_file(&path).unwrap().is_null());
        assert_eq!(SchemaSource::from_schema_file(&path).unwrap().schema, ValidationSchema::default());
    }

    #[test]
    fn template_source_reads_validation_block() {
        let root = TempDir::new().unwrap();
        let path = write(root.path(), "hub.md", "---\nvalidation:\n  max_lines: 5\n---\n# Hub\n");
        let source = SchemaSource::from_template(&path).unwrap();
        assert_eq!(source.schema.max_lines, Some(5));
        assert_eq!(source.origin, path);
    }
}

// ============================================================================
// Validation runs
// ============================================================================

mod runs {
    use super::*;

    #[test]
    fn errors_collected_across_documents() {
        let root = TempDir::new().unwrap();
        let short = write(root.path(), "short.md", "# Short\n");
        let long = write(root.path(), "long.md", "# Long\n1\n2\n3\n");
        let summary = run("max_lines: 3", &[short, long], &ValidateOptions::default());

        assert_eq!(summary.documents_checked, 2);
        assert!(!summary.passed());
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].file_path.ends_with("long.md"));
    }

    #[test]
    fn frontmatter_is_rejected_when_forbidden() {
        let root = TempDir::new().unwrap();
        let doc = write(root.path(), "CLAUDE.md", "---\ntitle: x\n---\n# Index\n");
        let options = ValidateOptions {
            no_frontmatter: true,
            ..Default::default()
        };
        let summary = run("max_lines: 1", &[doc], &options);

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].rule_violated, RuleCategory::Frontmatter);
        assert!(summary.errors[0].detail.contains("must NOT have YAML frontmatter"));
    }

    #[test]
    fn broken_frontmatter_is_reported_and_rules_still_run() {
        let root = TempDir::new().unwrap();
        let doc = write(root.path(), "doc.md", "---\nkey: [unclosed\n---\nno title\n");
        let summary = run("title_pattern: '^# '", &[doc], &ValidateOptions::default());

        let categories: Vec<RuleCategory> = summary.errors.iter().map(|e| e.rule_violated).collect();
        assert_eq!(categories, vec![RuleCategory::Frontmatter, RuleCategory::TitlePattern]);
        assert!(summary.errors[0].detail.starts_with("Failed to parse frontmatter"));
    }

    #[test]
    fn doc_type_filter_skips_other_documents() {
        let root = TempDir::new().unwrap();
        let hub = write(root.path(), "hub.md", "---\ndoc_type: hub\n---\n# Hub\n");
        let spoke = write(root.path(), "spoke.md", "---\ndoc_type: spoke\n---\n# Spoke\n");
        let plain = write(root.path(), "plain.md", "# Plain\n");
        let options = ValidateOptions {
            doc_type: Some("hub".into()),
            ..Default::default()
        };
        let summary = run(
            "frontmatter:\n  required_fields: [hub_for]\n",
            &[hub, spoke, plain],
            &options,
        );

        assert_eq!(summary.documents_checked, 1);
        assert_eq!(summary.documents_skipped, 2);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].detail, "Missing required frontmatter field: hub_for");
    }
}

// ============================================================================
// Single predicate evaluation
// ============================================================================

mod predicate_command {
    use super::*;

    #[test]
    fn structural_predicate_gets_parsed_document() {
        let root = TempDir::new().unwrap();
        let doc = write(root.path(), "CLAUDE.md", "# Index\n\n## Files\n\n- a.md\n");
        let expression = r#"section_present("Files")"#;
        let predicate = Predicate::parse(expression).unwrap();

        let ctx = predicate_context(&doc, &predicate).unwrap();
        assert!(ctx.has_ast());
        assert!(predicate.evaluate(expression, &ctx).unwrap());
    }

    #[test]
    fn missing_document_reports_read_failure() {
        let root = TempDir::new().unwrap();
        let doc = root.path().join("absent.md");
        let predicate = Predicate::parse(r#"section_present("Files")"#).unwrap();

        let err = predicate_context(&doc, &predicate).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("reading document"), "{message}");
        assert!(message.contains("absent.md"));
    }

    #[test]
    fn filesystem_predicate_does_not_read_document() {
        let root = TempDir::new().unwrap();
        write(root.path(), "MIGRATED.md", "");
        let doc = root.path().join("absent.md");
        let expression = r#"file_exists("MIGRATED.md")"#;
        let predicate = Predicate::parse(expression).unwrap();

        let ctx = predicate_context(&doc, &predicate).unwrap();
        assert!(!ctx.has_ast());
        assert!(predicate.evaluate(expression, &ctx).unwrap());
    }
}

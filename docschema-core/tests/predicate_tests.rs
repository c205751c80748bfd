//! Predicate engine tests against real directories.

use docschema_core::markdown::parse_markdown;
use docschema_core::predicates::{
    evaluate_predicate, parse_expression, ArgValue, PredicateContext, PredicateError,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Fixture helpers
// ============================================================================

/// A document directory holding CLAUDE.md, README.md, guide.md and a `sub/` directory.
fn doc_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("CLAUDE.md"), "# Index\n\n## Files\n\nguide.md\n").unwrap();
    fs::write(dir.path().join("README.md"), "# Readme\n").unwrap();
    fs::write(dir.path().join("guide.md"), "# Guide\n").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    dir
}

fn context(dir: &TempDir) -> PredicateContext {
    PredicateContext::new(dir.path().join("CLAUDE.md"))
}

// ============================================================================
// Parsing
// ============================================================================

mod parsing {
    use super::*;

    #[test]
    fn positional_argument_maps_to_path() {
        let parsed = parse_expression(r#"file_exists("README.md")"#).unwrap();
        assert_eq!(parsed.name, "file_exists");
        assert_eq!(parsed.args.len(), 1);
        assert_eq!(parsed.args["path"], ArgValue::Str("README.md".into()));
    }

    #[test]
    fn keyword_list_argument() {
        let parsed = parse_expression(r#"md_files_exist(exclude=["a.md","b.md"])"#).unwrap();
        assert_eq!(parsed.name, "md_files_exist");
        assert_eq!(
            parsed.args["exclude"],
            ArgValue::List(vec!["a.md".into(), "b.md".into()])
        );
    }

    #[test]
    fn empty_argument_list() {
        let parsed = parse_expression("subdirs_exist()").unwrap();
        assert_eq!(parsed.name, "subdirs_exist");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn mismatched_parens_are_parse_errors() {
        for expr in ["file_exists README.md)", "file_exists(\"README.md\"", "file_exists)\"README.md\"("] {
            assert!(
                matches!(parse_expression(expr), Err(PredicateError::Parse { .. })),
                "{expr} should not parse"
            );
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

mod evaluation {
    use super::*;

    #[test]
    fn file_exists_is_relative_to_document() {
        let dir = doc_dir();
        let ctx = context(&dir);
        assert!(evaluate_predicate(r#"file_exists("README.md")"#, &ctx).unwrap());
        assert!(!evaluate_predicate(r#"file_exists("sub")"#, &ctx).unwrap());
        assert!(!evaluate_predicate(r#"file_exists("nope.md")"#, &ctx).unwrap());
    }

    #[test]
    fn md_files_exist_honours_exclusions() {
        let dir = doc_dir();
        let ctx = context(&dir);
        assert!(evaluate_predicate("md_files_exist()", &ctx).unwrap());
        assert!(evaluate_predicate(r#"md_files_exist(exclude=["README.md", "CLAUDE.md"])"#, &ctx).unwrap());
        assert!(!evaluate_predicate(
            r#"md_files_exist(exclude=["README.md", "CLAUDE.md", "guide.md"])"#,
            &ctx
        )
        .unwrap());
    }

    #[test]
    fn subdirs_exist_sees_directories_only() {
        let dir = doc_dir();
        assert!(evaluate_predicate("subdirs_exist()", &context(&dir)).unwrap());

        let flat = TempDir::new().unwrap();
        fs::write(flat.path().join("only.md"), "").unwrap();
        assert!(!evaluate_predicate("subdirs_exist()", &context(&flat)).unwrap());
    }

    #[test]
    fn section_present_uses_attached_ast() {
        let dir = doc_dir();
        let ast = Arc::new(parse_markdown("# Index\n\n## Files\n\nguide.md\n").unwrap());
        let ctx = context(&dir).with_ast(ast);
        assert!(evaluate_predicate(r#"section_present("Files")"#, &ctx).unwrap());
        assert!(!evaluate_predicate(r#"section_present("Index")"#, &ctx).unwrap());
    }

    #[test]
    fn section_present_without_ast_is_evaluation_error() {
        let dir = doc_dir();
        let err = evaluate_predicate(r#"section_present("Files")"#, &context(&dir)).unwrap_err();
        assert!(matches!(err, PredicateError::Evaluation { .. }));
        assert_eq!(err.expression(), r#"section_present("Files")"#);
    }

    #[test]
    fn missing_directory_is_evaluation_error() {
        let ctx = PredicateContext::new("/nonexistent/docschema/dir/CLAUDE.md");
        let err = evaluate_predicate("subdirs_exist()", &ctx).unwrap_err();
        assert!(matches!(err, PredicateError::Evaluation { .. }));
    }

    #[test]
    fn unknown_predicate_never_evaluates() {
        let dir = doc_dir();
        let err = evaluate_predicate(r#"always_true("x")"#, &context(&dir)).unwrap_err();
        assert!(matches!(err, PredicateError::Parse { .. }));
    }

    #[test]
    fn missing_required_argument_is_evaluation_error() {
        let dir = doc_dir();
        let err = evaluate_predicate("file_exists()", &context(&dir)).unwrap_err();
        assert!(matches!(err, PredicateError::Evaluation { .. }));
        assert!(err.message().contains("path"));
    }
}

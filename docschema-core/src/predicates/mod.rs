//! Predicate engine
//!
//! A predicate is a named boolean check over the filesystem around a document
//! (or over the document's own sections), written in schemas as a restricted
//! call expression such as `md_files_exist(exclude=["README.md"])`.
//!
//! Evaluation happens in two stages:
//! 1. [`parse_expression`] turns text into a [`ParsedExpression`] (name + keyword args).
//!    Unknown names and malformed syntax are [`PredicateError::Parse`].
//! 2. [`Predicate::bind`] checks the arguments against the predicate's
//!    signature and [`Predicate::evaluate`] runs it against a [`PredicateContext`].
//!    Argument mismatches, missing context and I/O failures are
//!    [`PredicateError::Evaluation`].
//!
//! The set of predicates is fixed; see [`PredicateKind`].

pub mod builtins;
pub mod context;
pub mod parser;

pub use context::PredicateContext;
pub use parser::{parse_expression, ArgValue, ParsedExpression};

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("Failed to parse predicate '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("Failed to evaluate predicate '{expression}': {message}")]
    Evaluation { expression: String, message: String },
}

impl PredicateError {
    pub fn expression(&self) -> &str {
        match self {
            PredicateError::Parse { expression, .. } | PredicateError::Evaluation { expression, .. } => {
                expression
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PredicateError::Parse { message, .. } | PredicateError::Evaluation { message, .. } => message,
        }
    }

    fn evaluation(expression: &str, message: impl Into<String>) -> Self {
        PredicateError::Evaluation {
            expression: expression.to_string(),
            message: message.into(),
        }
    }
}

/// Registry of predicate names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    FileExists,
    MdFilesExist,
    SectionPresent,
    SubdirsExist,
}

impl PredicateKind {
    pub const ALL: [PredicateKind; 4] = [
        PredicateKind::FileExists,
        PredicateKind::MdFilesExist,
        PredicateKind::SectionPresent,
        PredicateKind::SubdirsExist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PredicateKind::FileExists => "file_exists",
            PredicateKind::MdFilesExist => "md_files_exist",
            PredicateKind::SectionPresent => "section_present",
            PredicateKind::SubdirsExist => "subdirs_exist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.name()).collect()
    }

    /// Parameter a single positional argument binds to, if the predicate takes one.
    pub fn positional_param(self) -> Option<&'static str> {
        match self {
            PredicateKind::FileExists => Some("path"),
            PredicateKind::SectionPresent => Some("name"),
            PredicateKind::MdFilesExist | PredicateKind::SubdirsExist => None,
        }
    }

    fn params(self) -> &'static [&'static str] {
        match self {
            PredicateKind::FileExists => &["path"],
            PredicateKind::MdFilesExist => &["exclude"],
            PredicateKind::SectionPresent => &["name"],
            PredicateKind::SubdirsExist => &[],
        }
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A predicate call with typed, validated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    FileExists { path: String },
    MdFilesExist { exclude: Vec<String> },
    SectionPresent { name: String },
    SubdirsExist,
}

impl Predicate {
    /// Parse and bind in one step.
    pub fn parse(expression: &str) -> Result<Self, PredicateError> {
        let parsed = parse_expression(expression)?;
        Self::bind(expression, parsed)
    }

    /// Check a parsed call against its predicate's signature.
    pub fn bind(expression: &str, parsed: ParsedExpression) -> Result<Self, PredicateError> {
        let kind = parsed.kind().ok_or_else(|| {
            PredicateError::evaluation(expression, format!("Unknown predicate function: {}", parsed.name))
        })?;

        if let Some(unexpected) = parsed.args.keys().find(|key| !kind.params().contains(&key.as_str())) {
            return Err(PredicateError::evaluation(
                expression,
                format!("Invalid arguments for predicate {kind}: unexpected argument '{unexpected}'"),
            ));
        }

        let mut args = parsed.args;
        let predicate = match kind {
            PredicateKind::FileExists => Predicate::FileExists {
                path: required_str(expression, kind, &mut args, "path")?,
            },
            PredicateKind::MdFilesExist => Predicate::MdFilesExist {
                exclude: match args.remove("exclude") {
                    None => Vec::new(),
                    Some(ArgValue::List(items)) => items,
                    Some(other) => return Err(wrong_type(expression, kind, "exclude", "list", &other)),
                },
            },
            PredicateKind::SectionPresent => Predicate::SectionPresent {
                name: required_str(expression, kind, &mut args, "name")?,
            },
            PredicateKind::SubdirsExist => Predicate::SubdirsExist,
        };

        Ok(predicate)
    }

    pub fn kind(&self) -> PredicateKind {
        match self {
            Predicate::FileExists { .. } => PredicateKind::FileExists,
            Predicate::MdFilesExist { .. } => PredicateKind::MdFilesExist,
            Predicate::SectionPresent { .. } => PredicateKind::SectionPresent,
            Predicate::SubdirsExist => PredicateKind::SubdirsExist,
        }
    }

    /// Whether evaluation reads the document's token stream.
    pub fn needs_ast(&self) -> bool {
        matches!(self, Predicate::SectionPresent { .. })
    }

    /// `expression` is only used to label errors.
    pub fn evaluate(&self, expression: &str, ctx: &PredicateContext) -> Result<bool, PredicateError> {
        let io_error = |err: std::io::Error| {
            PredicateError::evaluation(
                expression,
                format!("cannot read directory {}: {err}", ctx.doc_dir.display()),
            )
        };

        match self {
            Predicate::FileExists { path } => Ok(builtins::file_exists(ctx, path)),
            Predicate::MdFilesExist { exclude } => builtins::md_files_exist(ctx, exclude).map_err(io_error),
            Predicate::SectionPresent { name } => builtins::section_present(ctx, name)
                .ok_or_else(|| PredicateError::evaluation(expression, "section_present requires doc_ast in context")),
            Predicate::SubdirsExist => builtins::subdirs_exist(ctx).map_err(io_error),
        }
    }
}

fn required_str(
    expression: &str,
    kind: PredicateKind,
    args: &mut BTreeMap<String, ArgValue>,
    param: &str,
) -> Result<String, PredicateError> {
    match args.remove(param) {
        Some(ArgValue::Str(value)) => Ok(value),
        Some(other) => Err(wrong_type(expression, kind, param, "string", &other)),
        None => Err(PredicateError::evaluation(
            expression,
            format!("Invalid arguments for predicate {kind}: missing required argument '{param}'"),
        )),
    }
}

fn wrong_type(expression: &str, kind: PredicateKind, param: &str, expected: &str, got: &ArgValue) -> PredicateError {
    PredicateError::evaluation(
        expression,
        format!(
            "Invalid arguments for predicate {kind}: '{param}' must be a {expected}, got {}",
            got.type_name()
        ),
    )
}

/// Parse, bind and evaluate `expression` against `ctx`.
pub fn evaluate_predicate(expression: &str, ctx: &PredicateContext) -> Result<bool, PredicateError> {
    let predicate = Predicate::parse(expression)?;
    let result = predicate.evaluate(expression, ctx)?;
    tracing::trace!(expression, result, "predicate evaluated");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_round_trips_names() {
        for kind in PredicateKind::ALL {
            assert_eq!(PredicateKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PredicateKind::from_name("nope"), None);
    }

    #[test]
    fn test_bind_typed_arguments() {
        assert_eq!(
            Predicate::parse(r#"file_exists("README.md")"#).unwrap(),
            Predicate::FileExists { path: "README.md".into() }
        );
        assert_eq!(
            Predicate::parse("md_files_exist()").unwrap(),
            Predicate::MdFilesExist { exclude: vec![] }
        );
        assert!(Predicate::parse(r#"section_present(name="Files")"#).unwrap().needs_ast());
    }

    #[test]
    fn test_bad_arguments_are_evaluation_errors() {
        for expr in [
            r#"file_exists(name="README.md")"#,
            r#"file_exists(path=["a.md"])"#,
            r#"md_files_exist(exclude="a.md")"#,
            r#"section_present(title="Files")"#,
            r#"subdirs_exist(path="x")"#,
        ] {
            let err = Predicate::parse(expr).unwrap_err();
            assert!(matches!(err, PredicateError::Evaluation { .. }), "expected evaluation error for {expr}");
            assert_eq!(err.expression(), expr);
        }
    }

    #[test]
    fn test_section_present_without_ast_fails() {
        let ctx = PredicateContext::new("/tmp/nowhere/doc.md");
        let err = evaluate_predicate(r#"section_present("Files")"#, &ctx).unwrap_err();
        assert!(matches!(err, PredicateError::Evaluation { .. }));
        assert!(err.message().contains("doc_ast"));
    }
}

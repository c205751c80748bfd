// Predicate expression parser
//
// Grammar:  name '(' args? ')'
//   args := "quoted"                       (single positional argument)
//         | key=value (',' key=value)*     (keyword arguments)
//   value := "quoted" | '[' ("quoted" (',' "quoted")*)? ']'
//
// Only double quotes are recognised and there is no escaping. Anything outside
// this grammar is a parse error; nothing is coerced.

use super::{PredicateError, PredicateKind};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\((.*)\)$").expect("call regex is valid"));

static KWARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(\w+)\s*=\s*(\[[^\]]*\]|"[^"]*")\s*(?:,|$)"#).expect("kwarg regex is valid")
});

static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*"([^"]*)"\s*(?:,|$)"#).expect("list item regex is valid")
});

/// Argument value: a quoted string or a bracketed list of quoted strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    List(Vec<String>),
}

impl ArgValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Str(_) => "string",
            ArgValue::List(_) => "list",
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(s) => write!(f, "\"{s}\""),
            ArgValue::List(items) => {
                let quoted: Vec<String> = items.iter().map(|item| format!("\"{item}\"")).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
        }
    }
}

/// A syntactically valid call to a registered predicate, before its
/// arguments are checked against the predicate's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpression {
    pub name: String,
    pub args: BTreeMap<String, ArgValue>,
}

impl ParsedExpression {
    pub fn kind(&self) -> Option<PredicateKind> {
        PredicateKind::from_name(&self.name)
    }
}

/// Parse an expression into its function name and keyword arguments.
///
/// A positional argument is mapped onto the predicate's single positional
/// parameter (`path` for `file_exists`, `name` for `section_present`).
pub fn parse_expression(expression: &str) -> Result<ParsedExpression, PredicateError> {
    let trimmed = expression.trim();
    let parse_error = |message: String| PredicateError::Parse {
        expression: expression.to_string(),
        message,
    };

    let captures = CALL_RE.captures(trimmed).ok_or_else(|| {
        parse_error(format!(
            "Invalid predicate expression format: {trimmed}. Expected format: function_name(args)"
        ))
    })?;
    let name = &captures[1];
    let args_str = captures[2].trim();

    let kind = PredicateKind::from_name(name).ok_or_else(|| {
        parse_error(format!(
            "Unknown predicate function: {name}. Available predicates: {}",
            PredicateKind::names().join(", ")
        ))
    })?;

    let args = if args_str.is_empty() {
        BTreeMap::new()
    } else if let Some(value) = parse_quoted(args_str) {
        let param = kind.positional_param().ok_or_else(|| {
            parse_error(format!(
                "Function {name} does not accept positional arguments. Use keyword arguments instead."
            ))
        })?;
        BTreeMap::from([(param.to_string(), ArgValue::Str(value.to_string()))])
    } else if args_str.contains('=') {
        parse_keyword_args(args_str).map_err(parse_error)?
    } else {
        return Err(parse_error(format!(
            "Invalid value format in: {trimmed}. Expected quoted string or list, got: {args_str}"
        )));
    };

    Ok(ParsedExpression {
        name: name.to_string(),
        args,
    })
}

fn parse_keyword_args(args_str: &str) -> Result<BTreeMap<String, ArgValue>, String> {
    let mut args = BTreeMap::new();
    let mut rest = args_str;

    while !rest.trim().is_empty() {
        let captures = KWARG_RE
            .captures(rest)
            .ok_or_else(|| format!("Failed to parse keyword arguments near: {}", rest.trim()))?;
        let key = captures[1].to_string();
        let value = parse_value(&captures[2])?;
        if args.insert(key.clone(), value).is_some() {
            return Err(format!("Duplicate keyword argument: {key}"));
        }
        rest = &rest[captures[0].len()..];
        if captures[0].trim_end().ends_with(',') && rest.trim().is_empty() {
            return Err("Trailing comma in argument list".to_string());
        }
    }

    Ok(args)
}

fn parse_value(value_str: &str) -> Result<ArgValue, String> {
    let value_str = value_str.trim();

    if let Some(inner) = value_str.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        return parse_list(inner).map(ArgValue::List);
    }

    parse_quoted(value_str)
        .map(|s| ArgValue::Str(s.to_string()))
        .ok_or_else(|| format!("Expected quoted string or list, got: {value_str}"))
}

fn parse_list(inner: &str) -> Result<Vec<String>, String> {
    let mut items = Vec::new();
    let mut rest = inner;

    while !rest.trim().is_empty() {
        let captures = LIST_ITEM_RE
            .captures(rest)
            .ok_or_else(|| format!("List items must be quoted strings, got: {}", rest.trim()))?;
        items.push(captures[1].to_string());
        rest = &rest[captures[0].len()..];
    }

    Ok(items)
}

/// Contents of a `"..."` literal with no embedded quotes.
fn parse_quoted(value: &str) -> Option<&str> {
    let inner = value.strip_prefix('"')?.strip_suffix('"')?;
    (!inner.contains('"')).then_some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> ArgValue {
        ArgValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_positional_argument() {
        let parsed = parse_expression(r#"file_exists("README.md")"#).unwrap();
        assert_eq!(parsed.name, "file_exists");
        assert_eq!(parsed.args.get("path"), Some(&ArgValue::Str("README.md".to_string())));

        let parsed = parse_expression(r#"  section_present("Files")  "#).unwrap();
        assert_eq!(parsed.args.get("name"), Some(&ArgValue::Str("Files".to_string())));
    }

    #[test]
    fn test_keyword_list_argument() {
        let parsed = parse_expression(r#"md_files_exist(exclude=["a.md","b.md"])"#).unwrap();
        assert_eq!(parsed.name, "md_files_exist");
        assert_eq!(parsed.args.get("exclude"), Some(&list(&["a.md", "b.md"])));

        let parsed = parse_expression(r#"md_files_exist(exclude=[ "a.md" , "b.md" ])"#).unwrap();
        assert_eq!(parsed.args.get("exclude"), Some(&list(&["a.md", "b.md"])));

        let parsed = parse_expression(r#"md_files_exist(exclude=[])"#).unwrap();
        assert_eq!(parsed.args.get("exclude"), Some(&list(&[])));
    }

    #[test]
    fn test_keyword_string_argument() {
        let parsed = parse_expression(r#"file_exists(path="docs/index.md")"#).unwrap();
        assert_eq!(parsed.args.get("path"), Some(&ArgValue::Str("docs/index.md".to_string())));
    }

    #[test]
    fn test_empty_arguments() {
        let parsed = parse_expression("subdirs_exist()").unwrap();
        assert_eq!(parsed.name, "subdirs_exist");
        assert!(parsed.args.is_empty());
        assert!(parse_expression("subdirs_exist(  )").unwrap().args.is_empty());
    }

    #[test]
    fn test_malformed_expressions_fail_to_parse() {
        for bad in [
            "file_exists README.md)",
            "file_exists(\"README.md\"",
            "file_exists",
            "",
            "file_exists(README.md)",
            "file_exists('README.md')",
            "md_files_exist(exclude=[a.md])",
            "md_files_exist(exclude=\"a.md\" junk)",
            "md_files_exist(exclude=[\"a.md\"],)",
            "md_files_exist(exclude=[\"a.md\"], exclude=[\"b.md\"])",
            "md_files_exist(\"a.md\")",
            "subdirs_exist(\"x\")",
        ] {
            let err = parse_expression(bad).unwrap_err();
            assert!(matches!(err, PredicateError::Parse { .. }), "expected parse error for {bad:?}");
        }
    }

    #[test]
    fn test_unknown_function_is_parse_error() {
        let err = parse_expression(r#"dir_exists("x")"#).unwrap_err();
        match err {
            PredicateError::Parse { expression, message } => {
                assert_eq!(expression, r#"dir_exists("x")"#);
                assert!(message.contains("Unknown predicate function: dir_exists"));
                assert!(message.contains("file_exists"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_arg_value_display() {
        assert_eq!(ArgValue::Str("a".into()).to_string(), "\"a\"");
        assert_eq!(list(&["a", "b"]).to_string(), "[\"a\", \"b\"]");
    }
}

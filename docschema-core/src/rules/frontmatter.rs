// Frontmatter rules: required fields, per-field constraints and
// if-field-equals-then-required constraints. All errors are file-level.

use super::engine::{matches_at_start, DocumentPass};
use super::schema::{FieldConstraint, FieldType, FrontmatterRules};
use crate::types::RuleCategory;
use regex::Regex;
use serde_yaml::Value;

/// A document's parsed frontmatter block.
pub type Frontmatter = serde_yaml::Mapping;

pub(crate) fn check_frontmatter(pass: &mut DocumentPass, frontmatter: &Frontmatter, rules: &FrontmatterRules) {
    for field in &rules.required_fields {
        if !frontmatter.contains_key(field.as_str()) {
            pass.report(
                0,
                RuleCategory::Frontmatter,
                format!("Missing required frontmatter field: {field}"),
                format!("Field '{field}' present in frontmatter"),
                "Field not found",
            );
        }
    }

    for (field, constraint) in rules.field_constraints.iter() {
        // Absent fields are left to required_fields.
        if let Some(value) = frontmatter.get(field) {
            check_field(pass, field, value, constraint);
        }
    }

    for constraint in &rules.conditional_constraints {
        let triggered = frontmatter
            .get(constraint.if_field.as_str())
            .is_some_and(|value| *value == constraint.equals);
        if !triggered {
            continue;
        }

        let (if_field, equals) = (&constraint.if_field, display_value(&constraint.equals));
        for required in &constraint.then_required {
            if !frontmatter.contains_key(required.as_str()) {
                pass.report(
                    0,
                    RuleCategory::Frontmatter,
                    format!("Conditional constraint: if {if_field}={equals}, then {required} is required"),
                    format!("Field '{required}' present when {if_field}={equals}"),
                    "Field not found",
                );
            }
        }
    }
}

fn check_field(pass: &mut DocumentPass, field: &str, value: &Value, constraint: &FieldConstraint) {
    if let Some(allowed) = &constraint.allowed {
        if !allowed.contains(value) {
            let options: Vec<String> = allowed.iter().map(display_value).collect();
            pass.report(
                0,
                RuleCategory::Frontmatter,
                format!("Field '{field}' has invalid value"),
                format!("One of: {}", options.join(", ")),
                display_value(value),
            );
        }
    }

    if let Some(pattern) = &constraint.pattern {
        match Regex::new(pattern) {
            Ok(regex) => {
                let text = display_value(value);
                if !matches_at_start(&regex, &text) {
                    pass.report(
                        0,
                        RuleCategory::Frontmatter,
                        format!("Field '{field}' does not match required pattern"),
                        format!("Pattern: {pattern}"),
                        text,
                    );
                }
            }
            Err(err) => pass.report_invalid_pattern(
                0,
                RuleCategory::Frontmatter,
                format!("Invalid regex pattern for field '{field}': {err}"),
                pattern,
            ),
        }
    }

    match constraint.field_type {
        Some(FieldType::Array) => match value {
            Value::Sequence(items) => {
                if let Some(min_items) = constraint.min_items {
                    if items.len() < min_items {
                        pass.report(
                            0,
                            RuleCategory::Frontmatter,
                            format!("Field '{field}' has too few items"),
                            format!("Minimum {min_items} items"),
                            format!("{} items", items.len()),
                        );
                    }
                }
            }
            other => {
                pass.report(
                    0,
                    RuleCategory::Frontmatter,
                    format!("Field '{field}' must be an array"),
                    "Array/list type",
                    type_name(other),
                );
            }
        },
        Some(FieldType::String) => {
            if !matches!(value, Value::String(_)) {
                pass.report(
                    0,
                    RuleCategory::Frontmatter,
                    format!("Field '{field}' must be a string"),
                    "String type",
                    type_name(value),
                );
            }
        }
        Some(FieldType::Unchecked) | None => {}
    }
}

/// Plain rendering of a YAML value for messages and pattern matching:
/// strings without quotes, collections as compact JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => display_value(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_json::to_string(value)
            .unwrap_or_else(|_| serde_yaml::to_string(value).unwrap_or_default().trim_end().to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "array",
        Value::Mapping(_) => "mapping",
        Value::Tagged(tagged) => type_name(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&Value::from("hub")), "hub");
        assert_eq!(display_value(&Value::from(true)), "true");
        assert_eq!(display_value(&Value::from(3)), "3");
        let seq: Value = serde_yaml::from_str("[a, b]").unwrap();
        assert_eq!(display_value(&seq), r#"["a","b"]"#);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(&Value::from("x")), "string");
        assert_eq!(type_name(&Value::from(1.5)), "float");
        assert_eq!(type_name(&Value::from(2)), "integer");
        assert_eq!(type_name(&Value::Null), "null");
    }
}

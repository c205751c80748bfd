// Report rendering: one text block per error for terminals, a JSON document for tooling.

use anyhow::Result;
use chrono::{DateTime, Utc};
use docschema_core::types::{Severity, ValidationError};
use serde::Serialize;

/// `[SEVERITY] path:line: rule` followed by the non-empty detail lines.
/// File-level errors (line 0) show the path alone.
pub fn format_error(error: &ValidationError) -> String {
    let location = if error.is_file_level() {
        error.file_path.clone()
    } else {
        format!("{}:{}", error.file_path, error.line_number)
    };

    let mut text = format!(
        "[{}] {}: {}",
        error.severity.as_str().to_uppercase(),
        location,
        error.rule_violated
    );

    for (label, value) in [
        ("Detail", &error.detail),
        ("Expected", &error.expected),
        ("Found", &error.found),
    ] {
        if !value.is_empty() {
            text.push_str(&format!("\n  {label}: {value}"));
        }
    }

    text
}

/// Machine-readable result of one `validate` run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Digest of the validation block the documents were checked against.
    pub schema_digest: String,
    pub documents_checked: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub errors: Vec<ValidationError>,
}

impl JsonReport {
    pub fn new(
        template: Option<String>,
        schema_digest: impl Into<String>,
        documents_checked: usize,
        errors: Vec<ValidationError>,
    ) -> Self {
        let warning_count = errors.iter().filter(|e| e.severity == Severity::Warn).count();
        Self {
            generated_at: Utc::now(),
            template,
            schema_digest: schema_digest.into(),
            documents_checked,
            error_count: errors.len() - warning_count,
            warning_count,
            errors,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

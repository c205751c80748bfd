use serde::{Deserialize, Serialize};
use std::fmt;

// ===== VALIDATION OUTPUT TYPES =====
// ValidationError records are produced only by the rule evaluator and are
// never mutated afterwards. Output order follows rule-evaluation order.

/// Severity of a reported violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    #[serde(alias = "warning")]
    Warn,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule family a violation belongs to. Serialized with the schema key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    FilenamePattern,
    Frontmatter,
    TitlePattern,
    MaxLines,
    Forbidden,
    Conditions,
    RequiredSections,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::FilenamePattern => "filename_pattern",
            RuleCategory::Frontmatter => "frontmatter",
            RuleCategory::TitlePattern => "title_pattern",
            RuleCategory::MaxLines => "max_lines",
            RuleCategory::Forbidden => "forbidden",
            RuleCategory::Conditions => "conditions",
            RuleCategory::RequiredSections => "required_sections",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violation found in a document.
///
/// `line_number` is 1-based; 0 marks a file-level violation that is not tied
/// to a particular line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub file_path: String,
    pub line_number: usize,
    pub rule_violated: RuleCategory,
    pub detail: String,
    pub expected: String,
    pub found: String,
    pub severity: Severity,
}

impl ValidationError {
    pub fn new(
        file_path: impl Into<String>,
        line_number: usize,
        rule_violated: RuleCategory,
        detail: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
            rule_violated,
            detail: detail.into(),
            expected: expected.into(),
            found: found.into(),
            severity: Severity::Error,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_file_level(&self) -> bool {
        self.line_number == 0
    }
}

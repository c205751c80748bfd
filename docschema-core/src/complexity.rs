// Validation block complexity check
//
// Informational only: flags templates whose validation block has grown past
// the point where it is easy to review. Works on the raw YAML value so that it
// can run on blocks that do not deserialize into a schema.

use serde::{Deserialize, Serialize};
use std::fmt;

fn default_max_block_lines() -> usize {
    40
}

fn default_max_conditions() -> usize {
    5
}

fn default_max_required_sections() -> usize {
    10
}

fn default_max_forbidden_patterns() -> usize {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityLimits {
    /// Lines of the block when serialized as YAML.
    #[serde(default = "default_max_block_lines")]
    pub max_block_lines: usize,
    #[serde(default = "default_max_conditions")]
    pub max_conditions: usize,
    #[serde(default = "default_max_required_sections")]
    pub max_required_sections: usize,
    #[serde(default = "default_max_forbidden_patterns")]
    pub max_forbidden_patterns: usize,
}

impl Default for ComplexityLimits {
    fn default() -> Self {
        Self {
            max_block_lines: default_max_block_lines(),
            max_conditions: default_max_conditions(),
            max_required_sections: default_max_required_sections(),
            max_forbidden_patterns: default_max_forbidden_patterns(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityMeasure {
    BlockLines,
    Conditions,
    RequiredSections,
    ForbiddenPatterns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexityWarning {
    pub measure: ComplexityMeasure,
    pub found: usize,
    pub limit: usize,
}

impl fmt::Display for ComplexityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (found, limit) = (self.found, self.limit);
        match self.measure {
            ComplexityMeasure::BlockLines => {
                write!(f, "Validation block has {found} lines (limit: {limit})")
            }
            ComplexityMeasure::Conditions => write!(f, "{found} conditions (limit: {limit})"),
            ComplexityMeasure::RequiredSections => {
                write!(f, "{found} required sections (limit: {limit})")
            }
            ComplexityMeasure::ForbiddenPatterns => {
                write!(f, "{found} forbidden patterns (limit: {limit})")
            }
        }
    }
}

/// One warning per exceeded limit, in a fixed order.
pub fn check_complexity(block: &serde_yaml::Value, limits: &ComplexityLimits) -> Vec<ComplexityWarning> {
    let block_lines = serde_yaml::to_string(block)
        .map(|text| text.lines().count())
        .unwrap_or(0);

    let measures = [
        (ComplexityMeasure::BlockLines, block_lines, limits.max_block_lines),
        (ComplexityMeasure::Conditions, entry_count(block, "conditions"), limits.max_conditions),
        (
            ComplexityMeasure::RequiredSections,
            entry_count(block, "required_sections"),
            limits.max_required_sections,
        ),
        (
            ComplexityMeasure::ForbiddenPatterns,
            entry_count(block, "forbidden"),
            limits.max_forbidden_patterns,
        ),
    ];

    measures
        .into_iter()
        .filter(|(_, found, limit)| found > limit)
        .map(|(measure, found, limit)| ComplexityWarning { measure, found, limit })
        .collect()
}

fn entry_count(block: &serde_yaml::Value, key: &str) -> usize {
    match block.get(key) {
        Some(serde_yaml::Value::Mapping(map)) => map.len(),
        Some(serde_yaml::Value::Sequence(seq)) => seq.len(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_block_has_no_warnings() {
        let block: serde_yaml::Value = serde_yaml::from_str("max_lines: 10\ntitle_pattern: '^# '\n").unwrap();
        assert!(check_complexity(&block, &ComplexityLimits::default()).is_empty());
    }

    #[test]
    fn test_each_exceeded_limit_warns() {
        let mut text = String::from("conditions:\n");
        for i in 0..6 {
            text.push_str(&format!("  c{i}: subdirs_exist()\n"));
        }
        text.push_str("forbidden:\n");
        for i in 0..9 {
            text.push_str(&format!("  - pattern: p{i}\n"));
        }
        let block: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();

        let warnings = check_complexity(&block, &ComplexityLimits::default());
        let measures: Vec<_> = warnings.iter().map(|w| w.measure).collect();
        assert_eq!(measures, vec![ComplexityMeasure::Conditions, ComplexityMeasure::ForbiddenPatterns]);
        assert_eq!(warnings[0].to_string(), "6 conditions (limit: 5)");
        assert_eq!(warnings[1].found, 9);
    }

    #[test]
    fn test_block_line_limit() {
        let block: serde_yaml::Value = serde_yaml::from_str("a: 1\nb: 2\nc: 3\n").unwrap();
        let limits = ComplexityLimits {
            max_block_lines: 2,
            ..Default::default()
        };
        let warnings = check_complexity(&block, &limits);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].to_string(), "Validation block has 3 lines (limit: 2)");
    }
}

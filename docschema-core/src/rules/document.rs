// Whole-document rules: filename, title line, length and forbidden phrasing.

use super::engine::{excerpt, matches_at_start, DocumentPass};
use super::schema::ForbiddenRule;
use crate::types::RuleCategory;
use regex::{Regex, RegexBuilder};

pub(crate) fn check_filename_pattern(pass: &mut DocumentPass, pattern: &str) {
    let filename = pass
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match Regex::new(pattern) {
        Ok(regex) => {
            if !matches_at_start(&regex, &filename) {
                pass.report(
                    0,
                    RuleCategory::FilenamePattern,
                    "Filename does not match required pattern",
                    format!("Filename matching pattern: {pattern}"),
                    filename,
                );
            }
        }
        Err(err) => pass.report_invalid_pattern(
            0,
            RuleCategory::FilenamePattern,
            format!("Invalid regex pattern: {err}"),
            pattern,
        ),
    }
}

/// The title is the first line starting with `# `.
pub(crate) fn check_title_pattern(pass: &mut DocumentPass, pattern: &str) {
    let content = pass.content;
    let title = content
        .split('\n')
        .enumerate()
        .find(|(_, line)| line.starts_with("# "));

    let Some((index, title)) = title else {
        pass.report(
            1,
            RuleCategory::TitlePattern,
            "Document has no title (H1 heading)",
            format!("Title matching pattern: {pattern}"),
            "No H1 heading found",
        );
        return;
    };
    let line_number = index + 1;

    match Regex::new(pattern) {
        Ok(regex) => {
            if !matches_at_start(&regex, title) {
                pass.report(
                    line_number,
                    RuleCategory::TitlePattern,
                    "Title does not match required pattern",
                    format!("Title matching pattern: {pattern}"),
                    title,
                );
            }
        }
        Err(err) => pass.report_invalid_pattern(
            line_number,
            RuleCategory::TitlePattern,
            format!("Invalid regex pattern: {err}"),
            pattern,
        ),
    }
}

/// Lines are the newline-separated pieces of the content, so a trailing
/// newline counts as one more (empty) line. Exactly `limit` lines pass.
pub(crate) fn check_max_lines(pass: &mut DocumentPass, limit: usize) {
    let line_count = pass.content.split('\n').count();
    if line_count > limit {
        pass.report(
            0,
            RuleCategory::MaxLines,
            "Document exceeds maximum line limit",
            format!("Maximum {limit} lines"),
            format!("{line_count} lines"),
        );
    }
}

/// One error per non-overlapping, case-insensitive match, located by line.
pub(crate) fn check_forbidden(pass: &mut DocumentPass, rules: &[ForbiddenRule]) {
    let content = pass.content;
    let lines: Vec<&str> = content.split('\n').collect();
    let width = pass.config.excerpt_width;

    for rule in rules {
        if rule.pattern.is_empty() {
            tracing::warn!(file = %pass.file_path, reason = %rule.reason, "skipping forbidden rule with empty pattern");
            continue;
        }

        let regex = match RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
        {
            Ok(regex) => regex,
            Err(err) => {
                pass.report_invalid_pattern(
                    0,
                    RuleCategory::Forbidden,
                    format!("Invalid regex pattern: {err}"),
                    &rule.pattern,
                );
                continue;
            }
        };

        for found in regex.find_iter(content) {
            let line_number = content[..found.start()].matches('\n').count() + 1;
            let line = lines.get(line_number - 1).copied().unwrap_or_default();
            pass.report(
                line_number,
                RuleCategory::Forbidden,
                format!("Forbidden pattern found: {}", rule.reason),
                "Content without forbidden pattern",
                format!("Pattern '{}' found in: {}...", found.as_str(), excerpt(line, width)),
            )
            .severity = rule.severity;
        }
    }
}

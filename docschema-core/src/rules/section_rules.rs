// Section rules: existence (optionally gated by a condition), then content
// statistics, subsection counts and file-listing completeness for sections
// that exist. Errors about an existing section point at its heading line.

use super::engine::{excerpt, matches_at_start, ConditionResults, DocumentPass};
use super::schema::{FilesRules, SectionRule, SubsectionRule};
use crate::predicates::builtins::{markdown_files_in, subdirectories_in};
use crate::sections::{count_paragraphs, count_sentences, extract_sections, SectionInfo};
use crate::types::RuleCategory;
use regex::Regex;

const CATEGORY: RuleCategory = RuleCategory::RequiredSections;

pub(crate) fn check_required_sections(
    pass: &mut DocumentPass,
    rules: &[SectionRule],
    conditions: &ConditionResults,
) {
    let tokens = match pass.tokens() {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::warn!(file = %pass.file_path, error = %err, "markdown parse failed");
            pass.report(
                0,
                CATEGORY,
                format!("Failed to parse document: {err}"),
                "Parseable markdown document",
                "",
            );
            return;
        }
    };
    let sections = extract_sections(&tokens, pass.config.min_section_level);

    for rule in rules {
        let name = rule.name.as_str();

        if let Some(condition) = rule.gating_condition() {
            if !conditions.is_true(condition) {
                tracing::debug!(section = name, condition, "section rule skipped, condition not met");
                continue;
            }
        }

        let section = sections.get(name);

        if rule.must_exist && section.is_none() {
            pass.report(
                0,
                CATEGORY,
                format!("Required section '{name}' is missing"),
                format!("Section named '{name}'"),
                "Section not found",
            );
            continue;
        }

        if let (true, Some(section)) = (rule.must_not_exist, section) {
            let line = section.line_start + 1;
            pass.report(
                line,
                CATEGORY,
                format!("Forbidden section '{name}' is present"),
                format!("Section '{name}' should not exist"),
                format!("Section found at line {line}"),
            );
            continue;
        }

        let Some(section) = section else {
            continue;
        };

        check_section_content(pass, rule, section);

        if let Some(files_rules) = &rule.files_rules {
            check_files_rules(pass, name, section, files_rules);
        }
    }
}

fn check_section_content(pass: &mut DocumentPass, rule: &SectionRule, section: &SectionInfo) {
    let name = rule.name.as_str();
    let line = section.line_start + 1;

    if rule.min_paragraphs.is_some() || rule.max_paragraphs.is_some() {
        let paragraphs = count_paragraphs(section);

        if let Some(min) = rule.min_paragraphs.filter(|&min| paragraphs < min) {
            pass.report(
                line,
                CATEGORY,
                format!("Section '{name}' has too few paragraphs"),
                format!("Minimum {min} paragraphs"),
                format!("{paragraphs} paragraphs"),
            );
        }
        if let Some(max) = rule.max_paragraphs.filter(|&max| paragraphs > max) {
            pass.report(
                line,
                CATEGORY,
                format!("Section '{name}' exceeds paragraph limit"),
                format!("Maximum {max} paragraphs"),
                format!("{paragraphs} paragraphs"),
            );
        }
    }

    if let Some(max) = rule.max_sentences {
        let sentences = count_sentences(section);
        if sentences > max {
            pass.report(
                line,
                CATEGORY,
                format!("Section '{name}' exceeds sentence limit"),
                format!("Maximum {max} sentences"),
                format!("{sentences} sentences"),
            );
        }
    }

    if let Some(pattern) = &rule.content_pattern {
        match Regex::new(pattern) {
            Ok(regex) => {
                if !regex.is_match(&section.content) {
                    pass.report(
                        line,
                        CATEGORY,
                        format!("Section '{name}' content does not match required pattern"),
                        format!("Content matching pattern: {pattern}"),
                        "Pattern not found in section content",
                    );
                }
            }
            Err(err) => pass.report_invalid_pattern(
                line,
                CATEGORY,
                format!("Invalid regex pattern in content_pattern for section '{name}': {err}"),
                pattern,
            ),
        }
    }

    if let Some(subsections) = &rule.subsections_required {
        check_subsections(pass, name, section, subsections);
    }
}

/// Subsections are `### ` lines between the parent heading and the next `## `
/// line, counted from the raw document text.
fn check_subsections(pass: &mut DocumentPass, name: &str, section: &SectionInfo, rule: &SubsectionRule) {
    let line = section.line_start + 1;
    let pattern = rule
        .pattern
        .clone()
        .unwrap_or_else(|| pass.config.default_subsection_pattern.clone());

    let regex = match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(err) => {
            pass.report_invalid_pattern(
                line,
                CATEGORY,
                format!("Invalid regex pattern in subsections pattern for section '{name}': {err}"),
                &pattern,
            );
            return;
        }
    };

    let count = count_subsection_lines(pass.content, section.line_start, &regex);

    if let Some(min) = rule.min.filter(|&min| count < min) {
        pass.report(
            line,
            CATEGORY,
            format!("Section '{name}' has too few subsections"),
            format!("Minimum {min} subsections matching pattern: {pattern}"),
            format!("{count} subsections"),
        );
    }
    if let Some(max) = rule.max.filter(|&max| count > max) {
        pass.report(
            line,
            CATEGORY,
            format!("Section '{name}' has too many subsections"),
            format!("Maximum {max} subsections matching pattern: {pattern}"),
            format!("{count} subsections"),
        );
    }
}

fn count_subsection_lines(content: &str, parent_line: usize, regex: &Regex) -> usize {
    let mut count = 0;
    for line in content.split('\n').skip(parent_line + 1) {
        let line = line.trim();
        if line.starts_with("## ") {
            break;
        }
        if line.starts_with("### ") && matches_at_start(regex, line) {
            count += 1;
        }
    }
    count
}

fn check_files_rules(pass: &mut DocumentPass, name: &str, section: &SectionInfo, rules: &FilesRules) {
    let line = section.line_start + 1;
    let content_lines: Vec<&str> = section
        .content
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let excluded = |entry: &str| rules.exclude_globs.iter().any(|e| e == entry);

    if rules.must_list_all_md {
        match markdown_files_in(&pass.doc_dir) {
            Ok(files) => {
                for file in files.iter().filter(|f| !excluded(f.as_str())) {
                    if !content_lines.iter().any(|l| l.contains(file.as_str())) {
                        pass.report(
                            line,
                            CATEGORY,
                            format!("Section '{name}' missing required file entry"),
                            format!("File '{file}' listed in section"),
                            "File not mentioned in section",
                        );
                    }
                }
            }
            Err(err) => report_unreadable_dir(pass, name, line, err),
        }
    }

    if rules.must_list_all_subdirs {
        match subdirectories_in(&pass.doc_dir) {
            Ok(dirs) => {
                let listed = dirs
                    .iter()
                    .filter(|d| !d.starts_with('.') && !d.starts_with("__"))
                    .filter(|d| !excluded(d.as_str()));
                for dir in listed {
                    let with_slash = format!("{dir}/");
                    let as_code = format!("`{dir}`");
                    let mentioned = content_lines
                        .iter()
                        .any(|l| l.contains(&with_slash) || l.contains(&as_code));
                    if !mentioned {
                        pass.report(
                            line,
                            CATEGORY,
                            format!("Section '{name}' missing required subdirectory entry"),
                            format!("Subdirectory '{with_slash}' listed in section"),
                            "Subdirectory not mentioned in section",
                        );
                    }
                }
            }
            Err(err) => report_unreadable_dir(pass, name, line, err),
        }
    }

    if let Some(pattern) = &rules.entry_pattern {
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(err) => {
                pass.report_invalid_pattern(
                    line,
                    CATEGORY,
                    format!("Invalid regex pattern in entry_pattern for section '{name}': {err}"),
                    pattern,
                );
                return;
            }
        };

        let width = pass.config.entry_excerpt_width;
        for entry in content_lines.iter().filter(|l| l.starts_with("**")) {
            if !matches_at_start(&regex, entry) {
                pass.report(
                    line,
                    CATEGORY,
                    format!("Section '{name}' has incorrectly formatted entry"),
                    format!("Entry matching pattern: {pattern}"),
                    format!("'{}...'", excerpt(entry, width)),
                );
            }
        }
    }
}

fn report_unreadable_dir(pass: &mut DocumentPass, name: &str, line: usize, err: std::io::Error) {
    let dir = pass.doc_dir.display().to_string();
    tracing::warn!(file = %pass.file_path, dir = %dir, error = %err, "cannot list document directory");
    pass.report(
        line,
        CATEGORY,
        format!("Cannot list directory for section '{name}': {err}"),
        "Readable document directory",
        dir,
    );
}

// Docschema Core Library
//
// Template-driven validation of markdown documents.
// Main interface for checking a document against a validation schema:
// markdown -> sections -> predicate conditions -> rule checks -> errors.

pub mod complexity;
pub mod config;
pub mod markdown;
pub mod predicates;
pub mod rules;
pub mod sections;
pub mod template;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use config::EngineConfig;
pub use markdown::{parse_markdown, TokenCache};
pub use predicates::{evaluate_predicate, PredicateContext, PredicateError};
pub use rules::{Frontmatter, RuleEvaluator, ValidationSchema};
pub use sections::{extract_sections, SectionInfo, Sections};
pub use template::{load_template, read_validation_block, LoadedTemplate, TemplateCache, TemplateError};
pub use complexity::{check_complexity, ComplexityLimits, ComplexityWarning};

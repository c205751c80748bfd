// Rule evaluation - interprets a validation schema against one document
// This file wires the rule system together; implementations live in:
// - schema.rs: typed validation schema (what templates declare)
// - engine.rs: RuleEvaluator, condition evaluation and the per-document pass
// - document.rs: filename, title, max_lines and forbidden checks
// - frontmatter.rs: frontmatter field checks
// - section_rules.rs: required/forbidden sections, content, subsections, files

pub mod document;
pub mod engine;
pub mod frontmatter;
pub mod schema;
pub mod section_rules;

pub use engine::{ConditionResults, Evaluation, RuleEvaluator};
pub use frontmatter::Frontmatter;
pub use schema::{
    ConditionalConstraint, FieldConstraint, FieldType, FilesRules, ForbiddenRule, FrontmatterRules, OrderedMap,
    SectionRule, SubsectionRule, ValidationSchema,
};

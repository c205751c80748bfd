// All validation logic is in docschema-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod discovery;
pub mod report;
pub mod runner;

// Re-export core types for convenience
pub use docschema_core::*;

// Re-export CLI utilities
pub use discovery::collect_documents;
pub use report::{format_error, JsonReport};
pub use runner::{
    load_schema_file, predicate_context, validate_documents, RunSummary, SchemaSource, ValidateOptions,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

// Import from docschema-core
use docschema_core::predicates::Predicate;
use docschema_core::sections::{count_paragraphs, count_sentences, extract_list_items, extract_sections, LINE_END_OPEN};
use docschema_core::template::{read_validation_block, TemplateError};
use docschema_core::{check_complexity, parse_markdown, EngineConfig};

// Import CLI utilities
use docschema_cli::discovery::markdown_files_in_dir;
use docschema_cli::{
    collect_documents, format_error, predicate_context, validate_documents, JsonReport, SchemaSource, ValidateOptions,
};

#[derive(Parser)]
#[command(name = "docschema")]
#[command(about = "Validate markdown documents against template-driven rule schemas")]
#[command(version)]
struct Args {
    /// Path to engine config file (YAML format)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate documents against a template's validation block
    Validate {
        /// Template whose frontmatter carries the `validation:` block
        #[arg(short, long, required_unless_present = "schema", conflicts_with = "schema")]
        template: Option<PathBuf>,

        /// Standalone schema file (YAML, or JSON by .json extension)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Reject documents that start with a frontmatter block
        #[arg(long)]
        no_frontmatter: bool,

        /// Only check documents whose frontmatter doc_type matches
        #[arg(long)]
        doc_type: Option<String>,

        /// Markdown files or directories (walked recursively for *.md)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the effective validation block and its digest
    ShowRules {
        #[arg(short, long, required_unless_present = "schema", conflicts_with = "schema")]
        template: Option<PathBuf>,

        #[arg(short, long)]
        schema: Option<PathBuf>,
    },

    /// Warn about validation blocks that have grown too complex
    CheckComplexity {
        /// Template files, or directories of templates
        #[arg(required = true)]
        templates: Vec<PathBuf>,
    },

    /// Evaluate one predicate expression against a document
    Predicate {
        document: PathBuf,
        expression: String,
    },

    /// List the sections of a document with their statistics
    Sections { document: PathBuf },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = EngineConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        tracing::debug!(config = %config_path, "engine config loaded");
    }

    let result = match args.command {
        Command::Validate {
            template,
            schema,
            format,
            no_frontmatter,
            doc_type,
            paths,
        } => {
            let options = ValidateOptions {
                no_frontmatter,
                doc_type,
            };
            run_validate(template.as_deref(), schema.as_deref(), format, &options, &paths, &config)
        }
        Command::ShowRules { template, schema } => run_show_rules(template.as_deref(), schema.as_deref()),
        Command::CheckComplexity { templates } => run_check_complexity(&templates, &config),
        Command::Predicate { document, expression } => run_predicate(&document, &expression),
        Command::Sections { document } => run_sections(&document, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::from(2)
        }
    }
}

/// RUST_LOG wins unless --verbose is given; the default level is warn.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_schema_source(template: Option<&Path>, schema: Option<&Path>) -> Result<SchemaSource> {
    match (template, schema) {
        (_, Some(schema)) => SchemaSource::from_schema_file(schema),
        (Some(template), None) => SchemaSource::from_template(template),
        (None, None) => anyhow::bail!("either --template or --schema is required"),
    }
}

fn run_validate(
    template: Option<&Path>,
    schema: Option<&Path>,
    format: OutputFormat,
    options: &ValidateOptions,
    paths: &[PathBuf],
    config: &EngineConfig,
) -> Result<u8> {
    let source = load_schema_source(template, schema).context("Failed to load validation rules")?;
    let documents = collect_documents(paths)?;
    tracing::debug!(documents = documents.len(), digest = %source.digest, "starting validation");

    let summary = validate_documents(&source.schema, config, &documents, options)?;
    let code = if summary.passed() { 0 } else { 1 };

    match format {
        OutputFormat::Json => {
            let template = template.map(|t| t.display().to_string());
            let report = JsonReport::new(template, source.digest, summary.documents_checked, summary.errors);
            println!("{}", report.to_json_pretty()?);
        }
        OutputFormat::Text => {
            for error in &summary.errors {
                eprintln!("{}", format_error(error));
            }
            if summary.passed() {
                println!("✅ Validation passed: {} documents", summary.documents_checked);
            } else {
                eprintln!(
                    "❌ Validation failed: {} errors in {} documents",
                    summary.errors.len(),
                    summary.documents_checked
                );
            }
            if summary.documents_skipped > 0 {
                println!("   Skipped {} documents of another doc_type", summary.documents_skipped);
            }
        }
    }

    Ok(code)
}

fn run_show_rules(template: Option<&Path>, schema: Option<&Path>) -> Result<u8> {
    let source = load_schema_source(template, schema).context("Failed to load validation rules")?;

    println!("=== Effective Validation Rules ===");
    println!("📋 Source: {}", source.origin.display());
    println!("🔑 Digest: sha256:{}", source.digest);
    println!("\nParsed Validation Block:");
    print!("{}", serde_yaml::to_string(&source.block)?);
    println!("{}", "=".repeat(60));

    Ok(0)
}

fn run_check_complexity(inputs: &[PathBuf], config: &EngineConfig) -> Result<u8> {
    let mut templates = Vec::new();
    for input in inputs {
        if input.is_dir() {
            templates.extend(markdown_files_in_dir(input)?);
        } else {
            templates.push(input.clone());
        }
    }

    if templates.is_empty() {
        println!("[WARN] No template files found");
        return Ok(0);
    }

    let mut total_warnings = 0;
    let mut templates_checked = 0;
    let mut unreadable = false;

    for template in &templates {
        let block = match read_validation_block(template) {
            Ok(Some(block)) => block,
            Ok(None) => {
                tracing::debug!(template = %template.display(), "no validation block, skipping");
                continue;
            }
            Err(err @ TemplateError::Io { .. }) => {
                eprintln!("[ERROR] {err}");
                unreadable = true;
                continue;
            }
            Err(err) => {
                tracing::debug!(template = %template.display(), error = %err, "skipping template");
                continue;
            }
        };
        templates_checked += 1;

        let warnings = check_complexity(&block, &config.complexity);
        if !warnings.is_empty() {
            println!("[WARN] {}: Validation complexity high:", template.display());
            for warning in &warnings {
                println!("  - {warning}");
            }
        }
        total_warnings += warnings.len();
    }

    if total_warnings > 0 {
        println!("\n[SUMMARY] Found {total_warnings} complexity warnings across {templates_checked} templates");
        println!("[INFO] Consider simplifying validation rules or splitting templates");
    } else {
        println!("[SUCCESS] Complexity check passed: {templates_checked} templates validated");
    }

    Ok(if unreadable { 1 } else { 0 })
}

fn run_predicate(document: &Path, expression: &str) -> Result<u8> {
    let predicate = match Predicate::parse(expression) {
        Ok(predicate) => predicate,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(2);
        }
    };

    let ctx = match predicate_context(document, &predicate) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return Ok(2);
        }
    };

    match predicate.evaluate(expression, &ctx) {
        Ok(value) => {
            println!("Result: {value}");
            Ok(if value { 0 } else { 1 })
        }
        Err(e) => {
            eprintln!("Error: {e}");
            Ok(2)
        }
    }
}

fn run_sections(document: &Path, config: &EngineConfig) -> Result<u8> {
    let content = std::fs::read_to_string(document)
        .with_context(|| format!("reading document {}", document.display()))?;
    let tokens = parse_markdown(&content)?;
    let sections = extract_sections(&tokens, config.min_section_level);

    println!("📄 {}", document.display());
    if sections.is_empty() {
        println!("   No sections found");
        return Ok(0);
    }

    for section in &sections {
        let end = if section.line_end == LINE_END_OPEN {
            "end".to_string()
        } else {
            (section.line_end + 1).to_string()
        };
        println!(
            "   {} {} (lines {}-{}): {} paragraphs, {} sentences, {} list items",
            "#".repeat(section.level as usize),
            section.name,
            section.line_start + 1,
            end,
            count_paragraphs(section),
            count_sentences(section),
            extract_list_items(section).len()
        );
    }
    println!("📊 {} sections", sections.len());

    Ok(0)
}

// Built-in predicate implementations
//
// Filesystem predicates look only at the document's own directory, never
// recursively. Directory listings are returned sorted so that callers which
// report per-entry errors do so in a stable order.

use super::PredicateContext;
use crate::sections::{extract_sections, DEFAULT_MIN_LEVEL};
use std::fs;
use std::io;
use std::path::Path;

/// `doc_dir/path` is a regular file (symlinks followed, directories excluded).
pub fn file_exists(ctx: &PredicateContext, path: &str) -> bool {
    ctx.doc_dir.join(path).is_file()
}

/// At least one `*.md` file directly in `doc_dir` has a name not in `exclude`.
pub fn md_files_exist(ctx: &PredicateContext, exclude: &[String]) -> io::Result<bool> {
    Ok(markdown_files_in(&ctx.doc_dir)?
        .iter()
        .any(|name| !exclude.contains(name)))
}

/// A section with exactly this heading text exists in the attached AST.
/// `None` when no AST is attached.
pub fn section_present(ctx: &PredicateContext, name: &str) -> Option<bool> {
    let ast = ctx.doc_ast.as_ref()?;
    Some(extract_sections(ast, DEFAULT_MIN_LEVEL).contains(name))
}

/// `doc_dir` contains at least one directory.
pub fn subdirs_exist(ctx: &PredicateContext) -> io::Result<bool> {
    for entry in fs::read_dir(&ctx.doc_dir)? {
        if entry?.path().is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Names of the regular `*.md` files directly inside `dir`, sorted.
pub fn markdown_files_in(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".md") && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Names of the directories directly inside `dir`, sorted. Includes hidden ones.
pub fn subdirectories_in(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse_markdown;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context_in(dir: &TempDir) -> PredicateContext {
        PredicateContext::new(dir.path().join("CLAUDE.md"))
    }

    #[test]
    fn test_file_exists_ignores_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), "# Readme").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        let ctx = context_in(&dir);

        assert!(file_exists(&ctx, "README.md"));
        assert!(!file_exists(&ctx, "docs"));
        assert!(!file_exists(&ctx, "missing.md"));
    }

    #[test]
    fn test_markdown_listing_is_sorted_and_flat() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.md"), "").unwrap();
        fs::write(dir.path().join("a.md"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("dir.md")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.md"), "").unwrap();

        assert_eq!(markdown_files_in(dir.path()).unwrap(), vec!["a.md", "b.md"]);
        assert_eq!(subdirectories_in(dir.path()).unwrap(), vec!["dir.md", "sub"]);
    }

    #[test]
    fn test_section_present_requires_ast() {
        let dir = TempDir::new().unwrap();
        let ctx = context_in(&dir);
        assert_eq!(section_present(&ctx, "Files"), None);

        let ast = Arc::new(parse_markdown("# T\n\n## Files\n\ntext\n").unwrap());
        let ctx = ctx.with_ast(ast);
        assert_eq!(section_present(&ctx, "Files"), Some(true));
        assert_eq!(section_present(&ctx, "files"), Some(false));
    }
}

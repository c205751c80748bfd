// Document discovery: expands command-line paths into the markdown files to check.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Hidden (`.git`) and dunder (`__pycache__`) directories are never walked.
pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("__")
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

/// Files are taken as given; directories contribute every `*.md` file below
/// them, sorted. Argument order is kept and duplicates are dropped.
pub fn collect_documents(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    let mut seen = HashSet::new();

    for path in paths {
        let found = if path.is_dir() {
            let mut found = Vec::new();
            walk(path, &mut found)?;
            found.sort();
            found
        } else if path.is_file() {
            vec![path.clone()]
        } else {
            bail!("Path not found: {}", path.display());
        };

        for document in found {
            if seen.insert(document.clone()) {
                documents.push(document);
            }
        }
    }

    Ok(documents)
}

/// Markdown files directly inside `dir` (no recursion), sorted.
pub fn markdown_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_markdown(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if is_skipped_dir(&entry.file_name().to_string_lossy()) {
                tracing::trace!(dir = %path.display(), "skipping directory");
                continue;
            }
            walk(&path, found)?;
        } else if file_type.is_file() && is_markdown(&path) {
            found.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_dirs() {
        assert!(is_skipped_dir(".git"));
        assert!(is_skipped_dir("__pycache__"));
        assert!(!is_skipped_dir("_meta"));
        assert!(!is_skipped_dir("guides"));
    }

    #[test]
    fn test_markdown_extension() {
        assert!(is_markdown(Path::new("a/b.md")));
        assert!(!is_markdown(Path::new("a/b.markdown")));
        assert!(!is_markdown(Path::new("a/md")));
    }
}

use crate::markdown::TokenStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a predicate may look at: the document's location on disk and,
/// optionally, its parsed token stream.
///
/// Built once per document. The AST may be attached later, the first time a
/// predicate needs it; after that it is reused for the rest of the pass.
#[derive(Debug, Clone)]
pub struct PredicateContext {
    pub doc_path: PathBuf,
    pub doc_dir: PathBuf,
    pub doc_ast: Option<Arc<TokenStream>>,
}

impl PredicateContext {
    pub fn new(doc_path: impl AsRef<Path>) -> Self {
        let doc_path = doc_path.as_ref().to_path_buf();
        let doc_dir = match doc_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self {
            doc_path,
            doc_dir,
            doc_ast: None,
        }
    }

    pub fn with_ast(mut self, ast: Arc<TokenStream>) -> Self {
        self.doc_ast = Some(ast);
        self
    }

    /// Attach an AST unless one is already present.
    pub fn attach_ast(&mut self, ast: Arc<TokenStream>) {
        self.doc_ast.get_or_insert(ast);
    }

    pub fn has_ast(&self) -> bool {
        self.doc_ast.is_some()
    }
}

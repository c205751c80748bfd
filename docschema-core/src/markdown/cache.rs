use super::parser::{parse_markdown, MarkdownError};
use super::tokens::TokenStream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Parsed token streams keyed by a caller-chosen string (usually the document path).
///
/// The cache is owned by the caller and handed to whoever needs parsed
/// documents. A key, once parsed, keeps returning the same `Arc` until it is
/// invalidated or the cache is cleared; the text passed on later calls is not
/// re-checked. There is no eviction.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<String, Arc<TokenStream>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text`, reusing the cached stream for `key` when present.
    /// Without a key the text is always parsed and nothing is stored.
    pub fn parse(&self, text: &str, key: Option<&str>) -> Result<Arc<TokenStream>, MarkdownError> {
        let Some(key) = key else {
            return Ok(Arc::new(parse_markdown(text)?));
        };

        if let Some(hit) = self.get(key) {
            tracing::trace!(key, "token cache hit");
            return Ok(hit);
        }

        let tokens = Arc::new(parse_markdown(text)?);
        let mut entries = self.lock();
        // Another caller may have filled the slot while we were parsing; keep theirs.
        let stored = entries.entry(key.to_string()).or_insert(tokens);
        Ok(Arc::clone(stored))
    }

    pub fn get(&self, key: &str) -> Option<Arc<TokenStream>> {
        self.lock().get(key).cloned()
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<TokenStream>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

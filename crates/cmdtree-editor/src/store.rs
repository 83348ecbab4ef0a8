//! Persistence and canonicalization seams.
//!
//! The editor core never talks to storage or to a server itself. Hosts plug
//! in a [`MessageStore`] for favourites and, optionally, a [`Canonicalizer`]
//! that rewrites an exported message into the form the server would keep.

use cmdtree_core::Message;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Backend(String),

    #[error("stored data is not a list of messages: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("canonicalization failed: {0}")]
    Canonicalize(String),
}

/// Opaque key-value storage for a list of messages.
pub trait MessageStore {
    fn save(&mut self, messages: &[Message]) -> Result<(), StoreError>;

    /// Everything last saved, or nothing.
    fn load(&self) -> Result<Vec<Message>, StoreError>;
}

/// Keeps the serialized list in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw text, as a browser's local storage would hold.
    #[must_use]
    pub fn with_raw(text: impl Into<String>) -> Self {
        Self {
            saved: Some(text.into()),
        }
    }
}

impl MessageStore for MemoryStore {
    fn save(&mut self, messages: &[Message]) -> Result<(), StoreError> {
        self.saved = Some(serde_json::to_string(messages)?);
        Ok(())
    }

    fn load(&self) -> Result<Vec<Message>, StoreError> {
        match &self.saved {
            Some(text) => Ok(serde_json::from_str(text)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Rewrites a message into an equivalent, possibly differently shaped one.
/// The result is never assumed to match the editor's own encoding textually.
pub trait Canonicalizer {
    /// `context` names the command being edited.
    fn canonicalize(&self, msg: &Message, context: &str) -> Result<Message, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());
        store.save(&[json!({"message": "hi"}), json!("bare")]).unwrap();
        assert_eq!(store.load().unwrap(), vec![json!({"message": "hi"}), json!("bare")]);
    }

    #[test]
    fn corrupt_data_is_reported() {
        let store = MemoryStore::with_raw("{\"not\": \"a list\"}");
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }
}

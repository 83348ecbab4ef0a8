use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for node identities.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Monotonic counter shared by every document, so identities are never reused
/// even when the arena slot of a discarded node is.
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A stable identity for a node in the live document.
///
/// Arena indices are recycled after a node is removed; a `NodeId` is not.
/// Drag sessions and logs refer to nodes by `NodeId` for that reason.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a `NodeId`, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a fresh identity with a kind prefix (e.g. `delay_4`).
    pub fn fresh(prefix: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        let a = NodeId::fresh("text");
        let b = NodeId::fresh("text");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("text_"));
    }

    #[test]
    fn intern_is_idempotent() {
        assert_eq!(NodeId::intern("anchor_x"), NodeId::intern("anchor_x"));
        assert_eq!(format!("{:?}", NodeId::intern("anchor_x")), "@anchor_x");
    }
}

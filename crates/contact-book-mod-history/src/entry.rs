/// Core types for history entries.
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A state snapshot paired with a description of how it came to exist.
///
/// Entries are immutable once created. The label is for display only and
/// never influences undo/redo behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry<T> {
    value: T,
    label: String,
}

impl<T> HistoryEntry<T> {
    pub fn new(value: T, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consumes the entry, returning the stored value.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Reference-counted state handle compared by identity.
///
/// Two `Shared` values are equal only if they point at the same allocation,
/// so a structurally identical but newly built state still counts as a
/// change when passed to `HistoryManager::set`. Pass the existing handle
/// back (see [`Shared::clone`]) to express "nothing changed".
pub struct Shared<T>(Arc<T>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Whether both handles point at the same state.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<T> Eq for Shared<T> {}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shared").field(&*self.0).finish()
    }
}

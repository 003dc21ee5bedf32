/// Thread-safe handle around a `HistoryManager`.
///
/// Each method holds one lock for its whole read-modify-write, so `set`,
/// `undo` and `redo` calls from different threads never interleave.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::entry::HistoryEntry;
use crate::manager::HistoryManager;

/// Cloneable, lock-protected history shared between threads.
pub struct SharedHistory<T> {
    inner: Arc<Mutex<HistoryManager<T>>>,
}

impl<T> Clone for SharedHistory<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for SharedHistory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedHistory")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

impl<T: PartialEq> SharedHistory<T> {
    pub fn new(manager: HistoryManager<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    pub fn set(&self, value: T, label: Option<&str>) -> bool {
        self.lock().set(value, label)
    }

    /// Runs `updater` against the present value while holding the lock.
    pub fn set_with<F>(&self, updater: F, label: Option<&str>) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        self.lock().set_with(updater, label)
    }

    /// Returns `true` if a step was undone.
    pub fn undo(&self) -> bool {
        self.lock().undo().is_some()
    }

    /// Returns `true` if a step was redone.
    pub fn redo(&self) -> bool {
        self.lock().redo().is_some()
    }

    pub fn set_initial(&self, value: T, label: Option<&str>) {
        self.lock().set_initial(value, label);
    }

    pub fn clear_history(&self) {
        self.lock().clear_history();
    }
}

impl<T> SharedHistory<T> {
    pub fn can_undo(&self) -> bool {
        self.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().can_redo()
    }

    pub fn current_label(&self) -> String {
        self.lock().current_label().to_string()
    }

    /// Clones the present entry out of the lock.
    pub fn present(&self) -> HistoryEntry<T>
    where
        T: Clone,
    {
        self.lock().present().clone()
    }

    /// Runs `f` with exclusive access to the manager.
    pub fn with<R>(&self, f: impl FnOnce(&mut HistoryManager<T>) -> R) -> R {
        f(&mut self.lock())
    }

    /// Every operation leaves the state consistent before it can panic
    /// (updaters run before any mutation, listeners after), so a poisoned
    /// lock still guards valid history.
    fn lock(&self) -> MutexGuard<'_, HistoryManager<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Labelled undo/redo manager over an arbitrary state value.
///
/// State is split into three parts: `past` (oldest first), a single
/// `present` entry, and `future` (nearest redo first). Every operation
/// updates all three in one step.
use std::collections::VecDeque;
use std::fmt::{self, Write as _};

use chrono::Local;

use crate::config::{HistoryConfig, DEFAULT_TIMESTAMP_FORMAT};
use crate::entry::HistoryEntry;

/// Prefix of labels generated for unlabelled `set` calls.
const DEFAULT_UPDATE_PREFIX: &str = "Update at ";

/// Kind of state change reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A new present entry was committed by `set` or `set_with`.
    Set,
    Undo,
    Redo,
    /// The whole history was replaced by `set_initial`.
    Reset,
    /// Past and future were discarded by `clear_history`.
    Cleared,
}

type Listener<T> = Box<dyn FnMut(HistoryEvent, &HistoryEntry<T>) + Send>;

/// Undo/redo history for a single piece of application state.
///
/// The manager never mutates stored values. Callers own it explicitly and
/// may keep any number of independent instances.
pub struct HistoryManager<T> {
    /// Entries preceding the present one, oldest first.
    past: VecDeque<HistoryEntry<T>>,
    /// The currently active entry.
    present: HistoryEntry<T>,
    /// Undone entries, nearest redo first.
    future: VecDeque<HistoryEntry<T>>,
    config: HistoryConfig,
    /// Observers called after every state change.
    listeners: Vec<Listener<T>>,
}

impl<T: fmt::Debug> fmt::Debug for HistoryManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryManager")
            .field("past_len", &self.past.len())
            .field("present", &self.present)
            .field("future_len", &self.future.len())
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T: PartialEq> HistoryManager<T> {
    /// Creates a manager with default config.
    ///
    /// `label` defaults to `"Initial State"`.
    pub fn new(initial: T, label: Option<&str>) -> Self {
        Self::with_config(initial, label, HistoryConfig::default())
    }

    /// Creates a manager with the given config.
    ///
    /// The config is sanitized before use.
    pub fn with_config(initial: T, label: Option<&str>, mut config: HistoryConfig) -> Self {
        config.sanitize();
        let label = label.unwrap_or(&config.initial_label).to_string();
        Self {
            past: VecDeque::new(),
            present: HistoryEntry::new(initial, label),
            future: VecDeque::new(),
            config,
            listeners: Vec::new(),
        }
    }

    /// Commits `value` as the new present state.
    ///
    /// Returns `false` without touching the history if `value` equals the
    /// present value. Otherwise the present entry moves to the past, the
    /// redo history is discarded and `true` is returned. Without a label,
    /// one of the form `"Update at <time>"` is generated.
    pub fn set(&mut self, value: T, label: Option<&str>) -> bool {
        if &value == self.present.value() {
            tracing::trace!("Ignoring set with unchanged value");
            return false;
        }

        let label = match label {
            Some(label) => label.to_string(),
            None => self.default_label(),
        };
        let previous = std::mem::replace(&mut self.present, HistoryEntry::new(value, label));
        self.past.push_back(previous);
        self.future.clear();
        self.enforce_depth();

        tracing::debug!(
            "History set {:?} (undo depth {})",
            self.present.label(),
            self.past.len()
        );
        self.notify(HistoryEvent::Set);
        true
    }

    /// Computes the new state from the present value and commits it.
    ///
    /// Same semantics as [`set`](Self::set). A panic in `updater`
    /// propagates to the caller and leaves the history untouched.
    pub fn set_with<F>(&mut self, updater: F, label: Option<&str>) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let value = updater(self.present.value());
        self.set(value, label)
    }

    /// Steps back to the previous state.
    ///
    /// Returns the new present entry, or `None` if there is nothing to undo.
    pub fn undo(&mut self) -> Option<&HistoryEntry<T>> {
        let previous = self.past.pop_back()?;
        let undone = std::mem::replace(&mut self.present, previous);
        self.future.push_front(undone);

        tracing::debug!("History undo to {:?}", self.present.label());
        self.notify(HistoryEvent::Undo);
        Some(&self.present)
    }

    /// Steps forward to the most recently undone state.
    ///
    /// Returns the new present entry, or `None` if there is nothing to redo.
    pub fn redo(&mut self) -> Option<&HistoryEntry<T>> {
        let next = self.future.pop_front()?;
        let redone = std::mem::replace(&mut self.present, next);
        self.past.push_back(redone);

        tracing::debug!("History redo to {:?}", self.present.label());
        self.notify(HistoryEvent::Redo);
        Some(&self.present)
    }

    /// Replaces the whole history with a single new baseline entry.
    ///
    /// Used after loading or restoring state that should not itself be
    /// undoable. `label` defaults to the configured initial label.
    pub fn set_initial(&mut self, value: T, label: Option<&str>) {
        let label = label.unwrap_or(&self.config.initial_label).to_string();
        self.past.clear();
        self.future.clear();
        self.present = HistoryEntry::new(value, label);

        tracing::debug!("History reset to {:?}", self.present.label());
        self.notify(HistoryEvent::Reset);
    }

    /// Discards past and future, keeping the present entry.
    ///
    /// Listeners are only notified if there was something to discard.
    pub fn clear_history(&mut self) {
        if self.past.is_empty() && self.future.is_empty() {
            return;
        }
        let discarded = self.past.len() + self.future.len();
        self.past.clear();
        self.future.clear();

        tracing::debug!("History cleared ({discarded} entries discarded)");
        self.notify(HistoryEvent::Cleared);
    }
}

impl<T> HistoryManager<T> {
    /// Registers a listener called after every state change.
    ///
    /// No-op calls (`set` with an equal value, `undo`/`redo` at either end)
    /// never reach listeners.
    ///
    /// Listeners run in registration order after the state change is
    /// complete. A panicking listener propagates to the caller and the
    /// listeners registered after it are skipped for that change; the
    /// history itself stays committed.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(HistoryEvent, &HistoryEntry<T>) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Removes all registered listeners.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn present(&self) -> &HistoryEntry<T> {
        &self.present
    }

    /// The current state value.
    pub fn current(&self) -> &T {
        self.present.value()
    }

    pub fn current_label(&self) -> &str {
        self.present.label()
    }

    /// Label of the entry `undo` would restore.
    pub fn undo_label(&self) -> Option<&str> {
        self.past.back().map(HistoryEntry::label)
    }

    /// Label of the entry `redo` would restore.
    pub fn redo_label(&self) -> Option<&str> {
        self.future.front().map(HistoryEntry::label)
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Past entries, oldest first.
    pub fn past(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry<T>> + ExactSizeIterator {
        self.past.iter()
    }

    /// Future entries, nearest redo first.
    pub fn future(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry<T>> + ExactSizeIterator {
        self.future.iter()
    }

    /// Full chronological history: the past followed by the present entry.
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry<T>> {
        self.past.iter().chain(std::iter::once(&self.present))
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn default_label(&self) -> String {
        let now = Local::now();
        let mut label = String::from(DEFAULT_UPDATE_PREFIX);
        if write!(label, "{}", now.format(&self.config.timestamp_format)).is_err() {
            label.truncate(DEFAULT_UPDATE_PREFIX.len());
            let _ = write!(label, "{}", now.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        label
    }

    /// Evicts the oldest past entries beyond `max_depth`.
    fn enforce_depth(&mut self) {
        let Some(max) = self.config.max_depth else {
            return;
        };
        if self.past.len() > max {
            let excess = self.past.len() - max;
            self.past.drain(..excess);
            tracing::debug!("Evicted {excess} oldest history entries (max depth {max})");
        }
    }

    fn notify(&mut self, event: HistoryEvent) {
        let present = &self.present;
        for listener in self.listeners.iter_mut() {
            listener(event, present);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn past_values(mgr: &HistoryManager<i32>) -> Vec<i32> {
        mgr.past().map(|e| *e.value()).collect()
    }

    fn future_values(mgr: &HistoryManager<i32>) -> Vec<i32> {
        mgr.future().map(|e| *e.value()).collect()
    }

    fn history_values(mgr: &HistoryManager<i32>) -> Vec<i32> {
        mgr.history().map(|e| *e.value()).collect()
    }

    fn assert_history_is_past_plus_present(mgr: &HistoryManager<i32>) {
        let mut expected = past_values(mgr);
        expected.push(*mgr.current());
        assert_eq!(history_values(mgr), expected);
    }

    // --- Construction ---

    #[test]
    fn test_new_uses_initial_state_label() {
        let mgr = HistoryManager::new(0, None);
        assert_eq!(*mgr.current(), 0);
        assert_eq!(mgr.current_label(), "Initial State");
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
        assert_eq!(history_values(&mgr), vec![0]);
    }

    #[test]
    fn test_new_with_label() {
        let mgr = HistoryManager::new("contacts", Some("Loaded from disk"));
        assert_eq!(mgr.current_label(), "Loaded from disk");
    }

    #[test]
    fn test_with_config_uses_configured_initial_label() {
        let config = HistoryConfig {
            initial_label: "Empty book".to_string(),
            ..HistoryConfig::default()
        };
        let mgr = HistoryManager::with_config(0, None, config);
        assert_eq!(mgr.current_label(), "Empty book");
    }

    #[test]
    fn test_with_config_sanitizes() {
        let config = HistoryConfig {
            max_depth: Some(0),
            initial_label: String::new(),
            timestamp_format: "%Q".to_string(),
        };
        let mgr = HistoryManager::with_config(0, None, config);
        assert_eq!(mgr.config().max_depth, Some(1));
        assert_eq!(mgr.config().initial_label, "Initial State");
        assert_eq!(mgr.config().timestamp_format, "%H:%M:%S");
        assert_eq!(mgr.current_label(), "Initial State");
    }

    // --- set ---

    #[test]
    fn test_set_moves_present_to_past() {
        let mut mgr = HistoryManager::new(0, None);
        assert!(mgr.set(1, Some("inc")));
        assert_eq!(*mgr.current(), 1);
        assert_eq!(mgr.current_label(), "inc");
        assert_eq!(past_values(&mgr), vec![0]);
        assert!(mgr.can_undo());
        assert!(!mgr.can_redo());
    }

    #[test]
    fn test_set_equal_value_is_noop() {
        let mut mgr = HistoryManager::new(0, None);
        mgr.set(1, Some("inc"));
        mgr.set(2, Some("inc"));
        mgr.undo();

        assert!(!mgr.set(1, Some("same")));
        assert_eq!(*mgr.current(), 1);
        assert_eq!(mgr.current_label(), "inc");
        assert_eq!(past_values(&mgr), vec![0]);
        assert_eq!(future_values(&mgr), vec![2]);
    }

    #[test]
    fn test_set_with_applies_updater_to_present() {
        let mut mgr = HistoryManager::new(10, None);
        assert!(mgr.set_with(|n| n + 5, Some("add five")));
        assert_eq!(*mgr.current(), 15);
        assert!(!mgr.set_with(|n| *n, Some("identity")));
        assert_eq!(mgr.undo_depth(), 1);
    }

    #[test]
    fn test_set_with_panicking_updater_leaves_history_intact() {
        let mut mgr = HistoryManager::new(1, None);
        mgr.set(2, Some("two"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            mgr.set_with(|_| panic!("updater failed"), Some("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(*mgr.current(), 2);
        assert_eq!(past_values(&mgr), vec![1]);
    }

    #[test]
    fn test_default_label_is_generated() {
        let mut mgr = HistoryManager::new(0, None);
        mgr.set(1, None);
        let label = mgr.current_label();
        assert!(label.starts_with("Update at "), "unexpected label {label:?}");
        assert!(label.len() > "Update at ".len());
    }

    #[test]
    fn test_default_label_uses_configured_format() {
        let config = HistoryConfig {
            timestamp_format: "%Y".to_string(),
            ..HistoryConfig::default()
        };
        let mut mgr = HistoryManager::with_config(0, None, config);
        mgr.set(1, None);
        let year = mgr.current_label().trim_start_matches("Update at ");
        assert_eq!(year.len(), 4);
        assert!(year.chars().all(|c| c.is_ascii_digit()));
    }

    // --- undo / redo ---

    #[test]
    fn test_worked_example() {
        let mut mgr = HistoryManager::new(0, None);

        mgr.set(1, Some("inc"));
        assert_eq!((*mgr.current(), past_values(&mgr), future_values(&mgr)), (1, vec![0], vec![]));

        mgr.set(2, Some("inc"));
        assert_eq!((*mgr.current(), past_values(&mgr), future_values(&mgr)), (2, vec![0, 1], vec![]));

        mgr.undo();
        assert_eq!((*mgr.current(), past_values(&mgr), future_values(&mgr)), (1, vec![0], vec![2]));

        mgr.undo();
        assert_eq!((*mgr.current(), past_values(&mgr), future_values(&mgr)), (0, vec![], vec![1, 2]));

        mgr.redo();
        assert_eq!((*mgr.current(), past_values(&mgr), future_values(&mgr)), (1, vec![0], vec![2]));

        mgr.set(5, Some("jump"));
        assert_eq!((*mgr.current(), past_values(&mgr), future_values(&mgr)), (5, vec![0, 1], vec![]));
        assert!(!mgr.can_redo());
    }

    #[test]
    fn test_undo_redo_are_inverse() {
        let mut mgr = HistoryManager::new(0, Some("s0"));
        mgr.set(1, Some("s1"));
        mgr.set(2, Some("s2"));

        let labels_before: Vec<String> = mgr.history().map(|e| e.label().to_string()).collect();

        assert!(mgr.undo().is_some());
        assert!(mgr.undo().is_some());
        assert!(mgr.redo().is_some());
        assert!(mgr.redo().is_some());

        let labels_after: Vec<String> = mgr.history().map(|e| e.label().to_string()).collect();
        assert_eq!(labels_before, labels_after);
        assert_eq!(*mgr.current(), 2);
        assert_eq!(past_values(&mgr), vec![0, 1]);
        assert!(!mgr.can_redo());
    }

    #[test]
    fn test_undo_returns_new_present() {
        let mut mgr = HistoryManager::new(0, None);
        mgr.set(1, Some("Added John Doe"));
        let entry = mgr.undo().expect("undo");
        assert_eq!(*entry.value(), 0);
        assert_eq!(entry.label(), "Initial State");

        let entry = mgr.redo().expect("redo");
        assert_eq!(entry.label(), "Added John Doe");
    }

    #[test]
    fn test_undo_redo_on_empty_are_noops() {
        let mut mgr = HistoryManager::new(0, None);
        assert!(mgr.undo().is_none());
        assert!(mgr.redo().is_none());
        assert_eq!(*mgr.current(), 0);
        assert_eq!(history_values(&mgr), vec![0]);
    }

    #[test]
    fn test_new_set_discards_future() {
        let mut mgr = HistoryManager::new(0, None);
        mgr.set(1, None);
        mgr.set(2, None);
        mgr.undo();
        assert!(mgr.can_redo());

        mgr.set(3, None);
        assert!(!mgr.can_redo());
        assert!(mgr.redo().is_none());
        assert_eq!(*mgr.current(), 3);
    }

    #[test]
    fn test_undo_redo_labels() {
        let mut mgr = HistoryManager::new(0, None);
        assert_eq!(mgr.undo_label(), None);
        mgr.set(1, Some("Added Ada"));
        mgr.set(2, Some("Added Grace"));
        assert_eq!(mgr.undo_label(), Some("Added Ada"));
        assert_eq!(mgr.redo_label(), None);

        mgr.undo();
        assert_eq!(mgr.undo_label(), Some("Initial State"));
        assert_eq!(mgr.redo_label(), Some("Added Grace"));
    }

    // --- set_initial / clear_history ---

    #[test]
    fn test_set_initial_discards_everything() {
        let mut mgr = HistoryManager::new(0, None);
        for i in 1..=5 {
            mgr.set(i, None);
        }
        mgr.undo();
        mgr.undo();

        mgr.set_initial(42, Some("Restored from backup"));
        assert_eq!(*mgr.current(), 42);
        assert_eq!(mgr.current_label(), "Restored from backup");
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
        assert_eq!(history_values(&mgr), vec![42]);
    }

    #[test]
    fn test_set_initial_default_label() {
        let mut mgr = HistoryManager::new(0, Some("start"));
        mgr.set_initial(1, None);
        assert_eq!(mgr.current_label(), "Initial State");
    }

    #[test]
    fn test_clear_history_keeps_present() {
        let mut mgr = HistoryManager::new(0, None);
        mgr.set(1, Some("one"));
        mgr.set(2, Some("two"));
        mgr.undo();

        mgr.clear_history();
        assert_eq!(*mgr.current(), 1);
        assert_eq!(mgr.current_label(), "one");
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
    }

    // --- Invariants ---

    #[test]
    fn test_history_is_past_plus_present_throughout() {
        let mut mgr = HistoryManager::new(0, None);
        assert_history_is_past_plus_present(&mgr);
        for i in 1..=4 {
            mgr.set(i, None);
            assert_history_is_past_plus_present(&mgr);
        }
        for _ in 0..6 {
            mgr.undo();
            assert_history_is_past_plus_present(&mgr);
        }
        for _ in 0..2 {
            mgr.redo();
            assert_history_is_past_plus_present(&mgr);
        }
        mgr.set(9, None);
        assert_history_is_past_plus_present(&mgr);
        mgr.clear_history();
        assert_history_is_past_plus_present(&mgr);
    }

    #[test]
    fn test_history_iterates_in_reverse() {
        let mut mgr = HistoryManager::new(0, None);
        mgr.set(1, None);
        mgr.set(2, None);
        let newest_first: Vec<i32> = mgr.history().rev().map(|e| *e.value()).collect();
        assert_eq!(newest_first, vec![2, 1, 0]);
    }

    // --- Depth limit ---

    #[test]
    fn test_unbounded_by_default() {
        let mut mgr = HistoryManager::new(0, None);
        for i in 1..=1_000 {
            mgr.set(i, None);
        }
        assert_eq!(mgr.undo_depth(), 1_000);
    }

    #[test]
    fn test_max_depth_evicts_oldest() {
        let mut mgr = HistoryManager::with_config(0, None, HistoryConfig::bounded(3));
        for i in 1..=10 {
            mgr.set(i, None);
        }
        assert_eq!(past_values(&mgr), vec![7, 8, 9]);
        assert_eq!(*mgr.current(), 10);

        let mut undone = 0;
        while mgr.undo().is_some() {
            undone += 1;
        }
        assert_eq!(undone, 3);
        assert_eq!(*mgr.current(), 7);
    }

    #[test]
    fn test_max_depth_zero_still_allows_one_undo() {
        let config = HistoryConfig {
            max_depth: Some(0),
            ..HistoryConfig::default()
        };
        let mut mgr = HistoryManager::with_config(0, None, config);
        mgr.set(1, None);
        mgr.set(2, None);
        assert!(mgr.can_undo());
        assert_eq!(past_values(&mgr), vec![1]);
    }

    // --- Listeners ---

    #[test]
    fn test_listeners_see_every_change() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let mut mgr = HistoryManager::new(0, None);
        mgr.subscribe(move |event, entry: &HistoryEntry<i32>| {
            sink.lock().unwrap().push((event, *entry.value()));
        });

        mgr.set(1, None);
        mgr.set(1, None); // no-op
        mgr.undo();
        mgr.undo(); // no-op
        mgr.redo();
        mgr.redo(); // no-op
        mgr.clear_history();
        mgr.clear_history(); // no-op
        mgr.set_initial(7, None);

        let seen = events.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (HistoryEvent::Set, 1),
                (HistoryEvent::Undo, 0),
                (HistoryEvent::Redo, 1),
                (HistoryEvent::Cleared, 1),
                (HistoryEvent::Reset, 7),
            ]
        );
    }

    #[test]
    fn test_panicking_listener_keeps_change_and_skips_later_listeners() {
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);

        let mut mgr = HistoryManager::new(0, None);
        mgr.subscribe(|_, _| panic!("listener failed"));
        mgr.subscribe(move |_, _| *sink.lock().unwrap() += 1);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            mgr.set(1, Some("one"));
        }));
        assert!(result.is_err());
        assert_eq!(*mgr.current(), 1);
        assert_eq!(mgr.current_label(), "one");
        assert!(mgr.can_undo());
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn test_clear_listeners() {
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);

        let mut mgr = HistoryManager::new(0, None);
        mgr.subscribe(move |_, _| *sink.lock().unwrap() += 1);
        mgr.set(1, None);
        mgr.clear_listeners();
        mgr.set(2, None);

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_independent_managers() {
        let mut a = HistoryManager::new(0, None);
        let mut b = HistoryManager::new(100, None);
        a.set(1, None);
        b.set(101, None);
        b.set(102, None);
        a.undo();

        assert_eq!(*a.current(), 0);
        assert_eq!(*b.current(), 102);
        assert_eq!(b.undo_depth(), 2);
    }
}

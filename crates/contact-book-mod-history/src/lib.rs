/// Generic undo/redo history with labelled entries.
///
/// Provides a `HistoryManager` that tracks past, present and future states
/// of an arbitrary value. History lives in memory only and is owned by the
/// caller; nothing here touches the disk.
pub mod config;
pub mod entry;
pub mod manager;
pub mod shared;

pub use config::HistoryConfig;
pub use entry::{HistoryEntry, Shared};
pub use manager::{HistoryEvent, HistoryManager};
pub use shared::SharedHistory;

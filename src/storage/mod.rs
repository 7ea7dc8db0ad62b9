//! Participant history storage.
//!
//! Each participant has one plain-text record of past session and
//! exercise performances. The engine reads the last session performance
//! when a session starts and appends the new one when it ends.

pub mod file;
pub mod history;
pub mod memory;
pub mod traits;

pub use file::FileHistoryStore;
pub use history::{ExerciseRecord, ParticipantHistory};
pub use memory::MemoryHistoryStore;
pub use traits::HistoryStore;

//! In-memory history storage for testing.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{CoachError, Result};
use crate::storage::{HistoryStore, ParticipantHistory};

/// In-memory history store.
///
/// Records are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: RwLock<HashMap<String, ParticipantHistory>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = ParticipantHistory>) -> Self {
        let records = records
            .into_iter()
            .map(|h| (h.participant_id.clone(), h))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Number of stored participants.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CoachError {
    CoachError::history("history store lock poisoned")
}

impl HistoryStore for MemoryHistoryStore {
    fn get(&self, participant_id: &str) -> Result<Option<ParticipantHistory>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(participant_id).cloned())
    }

    fn put(&self, history: &ParticipantHistory) -> Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.insert(history.participant_id.clone(), history.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut ids: Vec<String> = records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_history_store_crud;
    use std::sync::Arc;

    #[test]
    fn test_memory_history_store_crud() {
        let store = MemoryHistoryStore::new();
        test_history_store_crud(&store);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_arc_store_crud() {
        let store = Arc::new(MemoryHistoryStore::new());
        test_history_store_crud(&store);
    }

    #[test]
    fn test_with_records() {
        let store = MemoryHistoryStore::with_records(vec![
            ParticipantHistory::new("a"),
            ParticipantHistory::new("b"),
        ]);
        assert_eq!(store.len(), 2);
        assert!(store.exists("b").unwrap());
        assert!(!store.is_empty());
    }

    #[test]
    fn test_concurrent_puts() {
        let store = Arc::new(MemoryHistoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.put(&ParticipantHistory::new(format!("P{:02}", i))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}

//! History storage trait.

use std::sync::Arc;

use crate::error::Result;
use crate::storage::ParticipantHistory;

/// Backend holding participant history records.
pub trait HistoryStore: Send + Sync {
    /// Retrieve a participant's history.
    ///
    /// Returns `Ok(None)` if the participant has no record.
    fn get(&self, participant_id: &str) -> Result<Option<ParticipantHistory>>;

    /// Save a participant's history, replacing any existing record.
    fn put(&self, history: &ParticipantHistory) -> Result<()>;

    /// Identifiers of all stored participants, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Check if a participant has a record.
    fn exists(&self, participant_id: &str) -> Result<bool> {
        Ok(self.get(participant_id)?.is_some())
    }

    /// Retrieve a participant's history, creating an empty record if none exists.
    fn get_or_create(&self, participant_id: &str) -> Result<ParticipantHistory> {
        if let Some(history) = self.get(participant_id)? {
            return Ok(history);
        }
        let history = ParticipantHistory::new(participant_id);
        self.put(&history)?;
        tracing::info!("created history for participant {}", participant_id);
        Ok(history)
    }
}

impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    fn get(&self, participant_id: &str) -> Result<Option<ParticipantHistory>> {
        (**self).get(participant_id)
    }

    fn put(&self, history: &ParticipantHistory) -> Result<()> {
        (**self).put(history)
    }

    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }
}

impl<T: HistoryStore + ?Sized> HistoryStore for &T {
    fn get(&self, participant_id: &str) -> Result<Option<ParticipantHistory>> {
        (**self).get(participant_id)
    }

    fn put(&self, history: &ParticipantHistory) -> Result<()> {
        (**self).put(history)
    }

    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }
}

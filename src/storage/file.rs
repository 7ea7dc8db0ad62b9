//! File-based history storage.
//!
//! Records live as `<participant id>.txt` in the history directory
//! (`~/.coach/history/` unless configured). Writes go through a temp file
//! and rename so a crash mid-write never leaves a truncated record.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{CoachError, Result};
use crate::storage::{HistoryStore, ParticipantHistory};

const EXTENSION: &str = "txt";

/// Flat-file history store.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    history_dir: PathBuf,
}

impl FileHistoryStore {
    /// Create a store in the configured history directory.
    pub fn new(config: &Config) -> Result<Self> {
        let dir = config.history_dir().ok_or_else(|| {
            CoachError::config("Could not determine history directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        if !history_dir.exists() {
            fs::create_dir_all(&history_dir).map_err(|e| CoachError::storage(&history_dir, e))?;
        }
        Ok(Self { history_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.history_dir
    }

    /// Path of a participant's record.
    pub fn record_path(&self, participant_id: &str) -> Result<PathBuf> {
        validate_id(participant_id)?;
        Ok(self
            .history_dir
            .join(format!("{}.{}", participant_id, EXTENSION)))
    }

    fn temp_path(&self, participant_id: &str) -> PathBuf {
        self.history_dir
            .join(format!(".{}.{}.tmp", participant_id, EXTENSION))
    }

    fn atomic_write(&self, history: &ParticipantHistory) -> Result<()> {
        let final_path = self.record_path(&history.participant_id)?;
        let temp_path = self.temp_path(&history.participant_id);
        let content = history.render();

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| CoachError::storage(&temp_path, e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| CoachError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| CoachError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| CoachError::storage(&final_path, e))?;
        Ok(())
    }
}

/// Participant ids become file names, so they must stay inside the directory.
fn validate_id(participant_id: &str) -> Result<()> {
    let bad = participant_id.is_empty()
        || participant_id.starts_with('.')
        || participant_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control());
    if bad {
        return Err(CoachError::history(format!(
            "invalid participant id '{}'",
            participant_id
        )));
    }
    Ok(())
}

impl HistoryStore for FileHistoryStore {
    fn get(&self, participant_id: &str) -> Result<Option<ParticipantHistory>> {
        let path = self.record_path(participant_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| CoachError::storage(&path, e))?;
        let history = ParticipantHistory::parse(&content)
            .map_err(|e| CoachError::history(format!("{}: {}", path.display(), e)))?;

        if history.participant_id != participant_id {
            tracing::warn!(
                "{} records participant '{}'",
                path.display(),
                history.participant_id
            );
        }
        Ok(Some(history))
    }

    fn put(&self, history: &ParticipantHistory) -> Result<()> {
        self.atomic_write(history)
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.history_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.history_dir)
            .map_err(|e| CoachError::storage(&self.history_dir, e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoachError::storage(&self.history_dir, e))?;
            let path = entry.path();
            if path.extension().map(|e| e != EXTENSION).unwrap_or(true) {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            ids.push(stem);
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PerformanceLevel;
    use crate::storage::traits::tests::test_history_store_crud;
    use tempfile::TempDir;

    fn create_test_store() -> (FileHistoryStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileHistoryStore::with_dir(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_file_history_store_crud() {
        let (store, _dir) = create_test_store();
        test_history_store_crud(&store);
    }

    #[test]
    fn test_with_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let history_path = dir.path().join("history");
        assert!(!history_path.exists());

        let _store = FileHistoryStore::with_dir(&history_path).unwrap();
        assert!(history_path.is_dir());
    }

    #[test]
    fn test_new_record_on_disk() {
        let (store, _dir) = create_test_store();
        store.get_or_create("P01").unwrap();

        let content = fs::read_to_string(store.record_path("P01").unwrap()).unwrap();
        assert_eq!(content, "P01\n0\n");
    }

    #[test]
    fn test_reads_externally_prepared_record() {
        let (store, dir) = create_test_store();
        fs::write(dir.path().join("P02.txt"), "P02\n2\n1\n3\nserve\n1\n0").unwrap();

        let history = store.get("P02").unwrap().unwrap();
        assert_eq!(history.session_performances, vec![1, 3]);
        assert_eq!(history.last_performance(), Some(PerformanceLevel::VeryFast));
        assert_eq!(history.exercises[0].name, "serve");
    }

    #[test]
    fn test_put_appends_session() {
        let (store, _dir) = create_test_store();
        let mut history = store.get_or_create("P03").unwrap();
        history.record_session(PerformanceLevel::Good);
        store.put(&history).unwrap();
        history.record_session(PerformanceLevel::Fast);
        store.put(&history).unwrap();

        let content = fs::read_to_string(store.record_path("P03").unwrap()).unwrap();
        assert_eq!(content, "P03\n2\n0\n1\n");
    }

    #[test]
    fn test_corrupt_record_is_error() {
        let (store, dir) = create_test_store();
        fs::write(dir.path().join("P04.txt"), "P04\nlots\n").unwrap();

        let err = store.get("P04").unwrap_err();
        assert!(matches!(err, CoachError::History { .. }));
        assert!(err.to_string().contains("P04.txt"));
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let (store, _dir) = create_test_store();
        for id in ["", "../escape", ".hidden", "a/b", "with space"] {
            assert!(store.get(id).is_err(), "id {:?} should be rejected", id);
        }
        assert!(store.put(&ParticipantHistory::new("../escape")).is_err());
    }

    #[test]
    fn test_temp_file_cleaned_up() {
        let (store, _dir) = create_test_store();
        store.put(&ParticipantHistory::new("P05")).unwrap();
        assert!(!store.temp_path("P05").exists());
    }

    #[test]
    fn test_list_ignores_other_files() {
        let (store, dir) = create_test_store();
        store.put(&ParticipantHistory::new("P06")).unwrap();
        fs::write(dir.path().join(".P07.txt.tmp"), "P07\n0").unwrap();
        fs::write(dir.path().join("notes.md"), "hello").unwrap();

        assert_eq!(store.list().unwrap(), vec!["P06".to_string()]);
    }
}

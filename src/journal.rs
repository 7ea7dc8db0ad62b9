//! Decision journal.
//!
//! Every decision and goal transition of a session is appended to a JSONL
//! file so a session can be audited or replayed offline. The journal is
//! optional; the runner treats write failures as fail-open.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Behaviour, Decision, EndedGoal, GoalLevel, PerformanceLevel, Phase, Resolution};
use crate::error::{CoachError, Result};

/// Schema version for journal events.
pub const JOURNAL_SCHEMA_VERSION: u8 = 1;

/// One line of the journal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEvent {
    pub v: u8,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: JournalEventType,
}

impl JournalEvent {
    /// Create an event stamped with the current time.
    pub fn new(data: JournalEventType) -> Self {
        Self::with_timestamp(data, Utc::now())
    }

    pub fn with_timestamp(data: JournalEventType, ts: DateTime<Utc>) -> Self {
        Self {
            v: JOURNAL_SCHEMA_VERSION,
            ts,
            data,
        }
    }
}

/// Kinds of journal events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEventType {
    /// A session was initialised for a participant.
    SessionStarted {
        participant_id: String,
        style: usize,
        start_state: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_performance: Option<PerformanceLevel>,
    },

    /// The decision step chose a behaviour.
    BehaviourSelected {
        goal: GoalLevel,
        phase: Phase,
        #[serde(skip_serializing_if = "Option::is_none")]
        performance: Option<PerformanceLevel>,
        state: usize,
        behaviour: Behaviour,
        /// Set when repetition suppression replaced the wrapper's choice.
        #[serde(skip_serializing_if = "Option::is_none")]
        suppressed: Option<Behaviour>,
        observation: usize,
        attempts: usize,
        resolution: Resolution,
    },

    /// A subgoal was opened.
    SubgoalCreated { parent: GoalLevel, level: GoalLevel },

    /// A subgoal was closed.
    SubgoalEnded {
        level: GoalLevel,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_level: Option<GoalLevel>,
        feedback_owed: bool,
    },

    /// The session performance was written to the participant history.
    SessionRecorded {
        participant_id: String,
        performance: PerformanceLevel,
        session_count: usize,
    },
}

impl JournalEventType {
    pub fn session_started(
        participant_id: impl Into<String>,
        style: usize,
        start_state: usize,
        previous_performance: Option<PerformanceLevel>,
    ) -> Self {
        Self::SessionStarted {
            participant_id: participant_id.into(),
            style,
            start_state,
            previous_performance,
        }
    }

    pub fn behaviour_selected(decision: &Decision) -> Self {
        Self::BehaviourSelected {
            goal: decision.context.goal,
            phase: decision.context.phase,
            performance: decision.context.performance,
            state: decision.context.state,
            behaviour: decision.behaviour,
            suppressed: decision.suppressed.then_some(decision.proposed),
            observation: decision.observation,
            attempts: decision.attempts,
            resolution: decision.resolution,
        }
    }

    pub fn subgoal_created(parent: GoalLevel, level: GoalLevel) -> Self {
        Self::SubgoalCreated { parent, level }
    }

    pub fn subgoal_ended(ended: &EndedGoal) -> Self {
        Self::SubgoalEnded {
            level: ended.ended,
            new_level: ended.new_level,
            feedback_owed: ended.feedback_owed,
        }
    }

    pub fn session_recorded(
        participant_id: impl Into<String>,
        performance: PerformanceLevel,
        session_count: usize,
    ) -> Self {
        Self::SessionRecorded {
            participant_id: participant_id.into(),
            performance,
            session_count,
        }
    }

    /// Event name as written in the `event` field.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::BehaviourSelected { .. } => "behaviour_selected",
            Self::SubgoalCreated { .. } => "subgoal_created",
            Self::SubgoalEnded { .. } => "subgoal_ended",
            Self::SessionRecorded { .. } => "session_recorded",
        }
    }
}

/// Append-only JSONL journal writer.
#[derive(Debug, Clone)]
pub struct JournalLogger {
    path: PathBuf,
}

impl JournalLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append one event.
    pub fn append(&self, event: &JournalEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CoachError::storage(parent, e))?;
            }
        }

        let json = serde_json::to_string(event)
            .map_err(|e| CoachError::serde(format!("Failed to serialize journal event: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CoachError::storage(&self.path, e))?;
        writeln!(file, "{}", json).map_err(|e| CoachError::storage(&self.path, e))?;
        Ok(())
    }

    /// Append an event stamped with the current time.
    pub fn record(&self, data: JournalEventType) -> Result<()> {
        self.append(&JournalEvent::new(data))
    }

    /// Read every event in the journal.
    pub fn read_all(&self) -> Result<Vec<JournalEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| CoachError::storage(&self.path, e))?;

        let mut events = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event: JournalEvent = serde_json::from_str(line).map_err(|e| {
                CoachError::serde(format!(
                    "Failed to parse journal event on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            events.push(event);
        }
        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

//! History command.
//!
//! Shows one participant's recorded sessions and exercises, or lists every
//! participant in the history store.

use serde::Serialize;

use crate::core::PerformanceLevel;
use crate::error::Result;
use crate::storage::{HistoryStore, ParticipantHistory};

/// Options for the history command.
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Summary of one participant for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSummary {
    pub participant_id: String,
    pub sessions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_performance: Option<PerformanceLevel>,
}

impl From<&ParticipantHistory> for ParticipantSummary {
    fn from(history: &ParticipantHistory) -> Self {
        Self {
            participant_id: history.participant_id.clone(),
            sessions: history.session_count(),
            last_performance: history.last_performance(),
        }
    }
}

/// Output format for the history command.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryOutput {
    pub success: bool,
    /// Full record when a single participant was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<ParticipantHistory>,
    /// Summaries when listing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<ParticipantSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryOutput {
    pub fn participant(history: ParticipantHistory) -> Self {
        Self {
            success: true,
            participant: Some(history),
            participants: Vec::new(),
            error: None,
        }
    }

    pub fn listing(participants: Vec<ParticipantSummary>) -> Self {
        Self {
            success: true,
            participant: None,
            participants,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            participant: None,
            participants: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "History failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        if let Some(history) = &self.participant {
            let mut lines = vec![format!(
                "Participant {} ({} sessions)",
                history.participant_id,
                history.session_count()
            )];
            for (i, perf) in history.session_performances.iter().enumerate() {
                lines.push(format!("  session {:>3}: {}", i + 1, describe(*perf)));
            }
            for exercise in &history.exercises {
                let values: Vec<String> =
                    exercise.performances.iter().map(|&p| describe(p)).collect();
                lines.push(format!("  {}: {}", exercise.name, values.join(", ")));
            }
            return lines.join("\n");
        }

        if self.participants.is_empty() {
            return "No participants found.".to_string();
        }

        let mut lines = vec![format!("Participants ({} found):", self.participants.len())];
        lines.push(String::new());
        lines.push(format!("{:<20}  {:>8}  {}", "ID", "SESSIONS", "LAST"));
        lines.push("-".repeat(44));
        for summary in &self.participants {
            let last = summary
                .last_performance
                .map(|p| p.name())
                .unwrap_or("-");
            lines.push(format!(
                "{:<20}  {:>8}  {}",
                summary.participant_id, summary.sessions, last
            ));
        }
        lines.join("\n")
    }
}

fn describe(value: i64) -> String {
    match PerformanceLevel::from_value(value) {
        Some(level) => level.name().to_string(),
        None => value.to_string(),
    }
}

/// The history command implementation.
pub struct HistoryCommand<H: HistoryStore> {
    store: H,
}

impl<H: HistoryStore> HistoryCommand<H> {
    pub fn new(store: H) -> Self {
        Self { store }
    }

    /// Show one participant, or list all when `participant_id` is `None`.
    pub fn run(&self, participant_id: Option<&str>, _options: &HistoryOptions) -> HistoryOutput {
        match participant_id {
            Some(id) => match self.store.get(id) {
                Ok(Some(history)) => HistoryOutput::participant(history),
                Ok(None) => HistoryOutput::failure(format!("no history for participant '{}'", id)),
                Err(e) => HistoryOutput::failure(format!("Failed to read history: {}", e)),
            },
            None => match self.summaries() {
                Ok(summaries) => HistoryOutput::listing(summaries),
                Err(e) => HistoryOutput::failure(format!("Failed to list participants: {}", e)),
            },
        }
    }

    fn summaries(&self) -> Result<Vec<ParticipantSummary>> {
        let mut summaries = Vec::new();
        for id in self.store.list()? {
            match self.store.get(&id) {
                Ok(Some(history)) => summaries.push(ParticipantSummary::from(&history)),
                Ok(None) => {}
                Err(e) => tracing::warn!("skipping participant {}: {}", id, e),
            }
        }
        Ok(summaries)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &HistoryOutput, options: &HistoryOptions) -> String {
        if options.quiet {
            return String::new();
        }
        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            output.format_text()
        }
    }
}

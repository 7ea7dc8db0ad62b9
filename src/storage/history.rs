//! Participant history records.
//!
//! One plain-text record per participant, shared with the tooling that
//! prepares sessions, so the line layout is fixed:
//!
//! ```text
//! <participant id>
//! <number of sessions>
//! <performance for session 1>
//! ...
//! <performance for session n>
//! <exercise name>
//! <number of times the exercise has been played>
//! <exercise performance 1>
//! ...
//! ```
//!
//! Exercise blocks repeat until the end of the file.

use serde::{Deserialize, Serialize};

use crate::core::goal::PerformanceLevel;
use crate::error::{CoachError, Result};

/// Per-exercise performance block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub name: String,
    pub performances: Vec<i64>,
}

/// Everything recorded about one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantHistory {
    pub participant_id: String,
    /// One aggregate performance per completed session, oldest first.
    pub session_performances: Vec<i64>,
    pub exercises: Vec<ExerciseRecord>,
}

impl ParticipantHistory {
    /// A participant with no sessions yet.
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            session_performances: Vec::new(),
            exercises: Vec::new(),
        }
    }

    /// Number of completed sessions.
    pub fn session_count(&self) -> usize {
        self.session_performances.len()
    }

    /// Performance of the most recent session, if it maps to a known level.
    pub fn last_performance(&self) -> Option<PerformanceLevel> {
        self.session_performances
            .last()
            .and_then(|&v| PerformanceLevel::from_value(v))
    }

    /// Append the aggregate performance of a finished session.
    pub fn record_session(&mut self, performance: PerformanceLevel) {
        self.session_performances.push(i64::from(performance.value()));
    }

    /// Append one exercise performance, creating the block if needed.
    pub fn record_exercise(&mut self, name: &str, performance: PerformanceLevel) {
        let value = i64::from(performance.value());
        match self.exercises.iter_mut().find(|e| e.name == name) {
            Some(record) => record.performances.push(value),
            None => self.exercises.push(ExerciseRecord {
                name: name.to_string(),
                performances: vec![value],
            }),
        }
    }

    /// Parse the line layout.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().map(str::trim).enumerate();

        let participant_id = match lines.next() {
            Some((_, id)) if !id.is_empty() => id.to_string(),
            _ => return Err(CoachError::history("missing participant id")),
        };

        let session_count = next_count(&mut lines, "session count")?;
        let mut session_performances = Vec::new();
        for _ in 0..session_count {
            session_performances.push(next_value(&mut lines, "session performance")?);
        }

        let mut exercises = Vec::new();
        while let Some((_, name)) = lines.next() {
            if name.is_empty() {
                continue;
            }
            let count = next_count(&mut lines, "exercise count")?;
            let mut performances = Vec::new();
            for _ in 0..count {
                performances.push(next_value(&mut lines, "exercise performance")?);
            }
            exercises.push(ExerciseRecord {
                name: name.to_string(),
                performances,
            });
        }

        Ok(Self {
            participant_id,
            session_performances,
            exercises,
        })
    }

    /// Render the line layout.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.participant_id);
        out.push('\n');
        out.push_str(&self.session_count().to_string());
        out.push('\n');
        for perf in &self.session_performances {
            out.push_str(&perf.to_string());
            out.push('\n');
        }
        for exercise in &self.exercises {
            out.push_str(&exercise.name);
            out.push('\n');
            out.push_str(&exercise.performances.len().to_string());
            out.push('\n');
            for perf in &exercise.performances {
                out.push_str(&perf.to_string());
                out.push('\n');
            }
        }
        out
    }
}

fn next_value<'a, I>(lines: &mut I, what: &str) -> Result<i64>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let (index, line) = lines
        .next()
        .ok_or_else(|| CoachError::history(format!("unexpected end of file reading {}", what)))?;
    line.parse::<i64>().map_err(|_| {
        CoachError::history(format!(
            "line {}: expected {} but found '{}'",
            index + 1,
            what,
            line
        ))
    })
}

fn next_count<'a, I>(lines: &mut I, what: &str) -> Result<usize>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let value = next_value(lines, what)?;
    usize::try_from(value)
        .map_err(|_| CoachError::history(format!("negative {}: {}", what, value)))
}

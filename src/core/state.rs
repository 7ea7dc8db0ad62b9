//! Session state types.
//!
//! Everything the coaching interaction mutates over a session lives in
//! [`SessionState`], owned by the caller and lent to the state machine and
//! decision driver one call at a time.

use serde::{Deserialize, Serialize};

use crate::core::behaviour::Behaviour;
use crate::core::goal::{mean_performance, mean_score, GoalLevel, PerformanceLevel, Phase};

/// Rolling performance data for one goal level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    /// Performance values in arrival order.
    pub performances: Vec<u8>,
    /// Scores in arrival order.
    pub scores: Vec<f64>,
}

impl LevelRecord {
    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.performances.is_empty() && self.scores.is_empty()
    }

    /// Append one observation. A missing performance or score is skipped.
    pub fn push(&mut self, performance: Option<PerformanceLevel>, score: Option<f64>) {
        if let Some(perf) = performance {
            self.performances.push(perf.value());
        }
        if let Some(score) = score {
            self.scores.push(score);
        }
    }

    /// Rounded mean performance.
    pub fn mean_performance(&self) -> Option<PerformanceLevel> {
        mean_performance(&self.performances)
    }

    /// Unrounded mean score.
    pub fn mean_score(&self) -> Option<f64> {
        mean_score(&self.scores)
    }

    /// Reset to empty.
    pub fn clear(&mut self) {
        self.performances.clear();
        self.scores.clear();
    }
}

/// Per-level accumulators, indexed by [`GoalLevel`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Accumulators {
    records: [LevelRecord; 5],
}

impl Accumulators {
    /// Record for one level.
    pub fn level(&self, level: GoalLevel) -> &LevelRecord {
        &self.records[level.index()]
    }

    /// Mutable record for one level.
    pub fn level_mut(&mut self, level: GoalLevel) -> &mut LevelRecord {
        &mut self.records[level.index()]
    }

    /// Fold `level`'s aggregate into its parent's record and clear it.
    ///
    /// Person has no parent; its record is left as is.
    pub fn fold_into_parent(&mut self, level: GoalLevel) {
        let Some(parent) = level.parent() else {
            return;
        };
        let record = self.level(level);
        let performance = record.mean_performance();
        let score = record.mean_score();
        self.level_mut(parent).push(performance, score);
        self.level_mut(level).clear();
    }
}

/// Mutable state of one coaching session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Level the guide currently has data for. `None` before the guide
    /// has reported anything.
    pub tracking: Option<GoalLevel>,
    /// Phase the guide is in at the tracking level.
    pub phase: Phase,
    /// Set by goal and set completion, cleared by every timestep cue.
    pub completed: bool,
    /// Deepest subgoal that has been created and not yet ended.
    pub deepest_open: Option<GoalLevel>,
    /// Sets finished in the current exercise.
    pub sets_in_exercise: u32,
    /// Sets finished in the whole session.
    pub sets_in_session: u32,
    /// Actions observed in the current set.
    pub repetitions: u32,
    /// Session clock: exercises completed so far.
    pub session_time: u32,
    pub latest_performance: Option<PerformanceLevel>,
    pub latest_score: Option<f64>,
    pub latest_target: Option<f64>,
    /// Performance from the participant's previous session, if any.
    pub previous_session_performance: Option<PerformanceLevel>,
    pub accumulators: Accumulators,
    /// Behaviours emitted since the last category confirmation.
    pub used_behaviours: Vec<Behaviour>,
    /// The session has ended above the Person level.
    pub complete: bool,
}

impl SessionState {
    /// Fresh state for a new session.
    pub fn new(previous_session_performance: Option<PerformanceLevel>) -> Self {
        Self {
            deepest_open: Some(GoalLevel::Person),
            previous_session_performance,
            ..Default::default()
        }
    }

    /// Whether `behaviour` has been used since the last confirmation.
    pub fn has_used(&self, behaviour: Behaviour) -> bool {
        self.used_behaviours.contains(&behaviour)
    }
}

/// Tri-state result of one driver or cue step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum NodeStatus {
    Success,
    /// Nothing to do yet; poll again.
    Waiting,
    Failed(String),
}

impl NodeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, NodeStatus::Success)
    }
}

/// Data a timestep cue hands to the decision step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuePayload {
    pub phase: Phase,
    pub performance: Option<PerformanceLevel>,
    pub score: Option<f64>,
    pub target: Option<f64>,
}

/// One action reported by the guide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideAction {
    pub performance: PerformanceLevel,
    pub score: f64,
    pub target: f64,
}

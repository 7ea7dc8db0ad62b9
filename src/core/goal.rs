//! Goal levels, phases and performance levels.
//!
//! The coaching interaction is a five-level hierarchy. Each level runs an
//! introductory (Start) sequence, its children, and a feedback (End)
//! sequence before it is popped.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One layer of the coaching hierarchy.
///
/// Lower numeric value is higher in the hierarchy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GoalLevel {
    Person = 0,
    Session = 1,
    Exercise = 2,
    Set = 3,
    Action = 4,
}

impl GoalLevel {
    /// All levels, outermost first.
    pub const ALL: [GoalLevel; 5] = [
        GoalLevel::Person,
        GoalLevel::Session,
        GoalLevel::Exercise,
        GoalLevel::Set,
        GoalLevel::Action,
    ];

    /// Numeric index of this level.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Level for a numeric index, if in range.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// The next level down, or `None` for Action (a leaf).
    pub fn child(self) -> Option<Self> {
        Self::from_index(self as i64 + 1)
    }

    /// The next level up, or `None` for Person.
    pub fn parent(self) -> Option<Self> {
        Self::from_index(self as i64 - 1)
    }

    /// Whether repetition suppression applies at this level.
    pub fn suppresses_repetition(self) -> bool {
        matches!(self, GoalLevel::Session | GoalLevel::Exercise | GoalLevel::Set)
    }

    /// Parse a level from its name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "person" => Some(Self::Person),
            "session" => Some(Self::Session),
            "exercise" => Some(Self::Exercise),
            "set" => Some(Self::Set),
            "action" => Some(Self::Action),
            _ => None,
        }
    }

    /// Lowercase name of this level.
    pub fn name(self) -> &'static str {
        match self {
            GoalLevel::Person => "person",
            GoalLevel::Session => "session",
            GoalLevel::Exercise => "exercise",
            GoalLevel::Set => "set",
            GoalLevel::Action => "action",
        }
    }
}

impl fmt::Display for GoalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-stage of a goal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Introductory sequence.
    #[default]
    Start,
    /// Feedback sequence.
    End,
}

impl Phase {
    /// Parse a phase from its name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => f.write_str("start"),
            Phase::End => f.write_str("end"),
        }
    }
}

/// Discretized deviation of the last action (or aggregate) from its target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    /// Within tolerance of the target timing.
    Good = 0,
    /// Ahead of the target timing.
    Fast = 1,
    /// Behind the target timing.
    Slow = 2,
    VeryFast = 3,
    VerySlow = 4,
    Inaccurate = 5,
    Incomplete = 6,
    /// Sensor produced no usable measurement.
    Unmeasured = 7,
}

impl PerformanceLevel {
    /// All levels in numeric order.
    pub const ALL: [PerformanceLevel; 8] = [
        PerformanceLevel::Good,
        PerformanceLevel::Fast,
        PerformanceLevel::Slow,
        PerformanceLevel::VeryFast,
        PerformanceLevel::VerySlow,
        PerformanceLevel::Inaccurate,
        PerformanceLevel::Incomplete,
        PerformanceLevel::Unmeasured,
    ];

    /// Numeric value of this level.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Level for a numeric value, if in range.
    pub fn from_value(value: i64) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Whether this level unlocks praise behaviours.
    pub fn is_good(self) -> bool {
        self == PerformanceLevel::Good
    }

    /// Whether this level unlocks scold/console behaviours.
    pub fn is_off_pace(self) -> bool {
        matches!(self, PerformanceLevel::Fast | PerformanceLevel::Slow)
    }

    /// Parse a level from its name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "good" => Some(Self::Good),
            "fast" => Some(Self::Fast),
            "slow" => Some(Self::Slow),
            "very_fast" => Some(Self::VeryFast),
            "very_slow" => Some(Self::VerySlow),
            "inaccurate" => Some(Self::Inaccurate),
            "incomplete" => Some(Self::Incomplete),
            "unmeasured" => Some(Self::Unmeasured),
            _ => None,
        }
    }

    /// Snake-case name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fast => "fast",
            Self::Slow => "slow",
            Self::VeryFast => "very_fast",
            Self::VerySlow => "very_slow",
            Self::Inaccurate => "inaccurate",
            Self::Incomplete => "incomplete",
            Self::Unmeasured => "unmeasured",
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arithmetic mean of performance values, rounded to the nearest level.
///
/// Halves round to the even level. Returns `None` for an empty sequence.
pub fn mean_performance(values: &[u8]) -> Option<PerformanceLevel> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
    let mean = sum / values.len() as f64;
    PerformanceLevel::from_value(mean.round_ties_even() as i64)
}

/// Arithmetic mean of scores, unrounded. Returns `None` for an empty sequence.
pub fn mean_score(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

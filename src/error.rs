//! Unified error types for the coaching engine.
//!
//! Every error here is local and recoverable by the caller. The decision
//! driver turns them into a `Failed` node status; the caller decides whether
//! to retry the cycle or abandon the current goal level.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::goal::GoalLevel;

/// The main error type for coaching operations.
#[derive(Error, Debug)]
pub enum CoachError {
    /// A subgoal was requested below the Action level.
    #[error("invalid subgoal: cannot subdivide {level} goal")]
    InvalidSubgoal { level: GoalLevel },

    /// An end-subgoal was requested outside the open goal range.
    #[error("invalid end goal: {message}")]
    InvalidEndGoal { message: String },

    /// The policy wrapper hit its hard iteration ceiling.
    #[error("policy resolution exhausted after {iterations} iterations at {level} goal")]
    PolicyResolutionExhausted { level: GoalLevel, iterations: u32 },

    /// A required blackboard slot was absent or held the wrong type.
    #[error("missing context value: {key}")]
    MissingContextValue { key: String },

    /// I/O errors from history or journal files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Participant history file does not follow the expected layout.
    #[error("history error: {message}")]
    History { message: String },

    /// Malformed policy tables.
    #[error("policy error: {message}")]
    Policy { message: String },
}

/// A specialized Result type for coaching operations.
pub type Result<T> = std::result::Result<T, CoachError>;

impl CoachError {
    /// Create an invalid subgoal error.
    pub fn invalid_subgoal(level: GoalLevel) -> Self {
        Self::InvalidSubgoal { level }
    }

    /// Create an invalid end goal error.
    pub fn invalid_end_goal(message: impl Into<String>) -> Self {
        Self::InvalidEndGoal {
            message: message.into(),
        }
    }

    /// Create a missing context value error.
    pub fn missing_context(key: impl Into<String>) -> Self {
        Self::MissingContextValue { key: key.into() }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a history error.
    pub fn history(message: impl Into<String>) -> Self {
        Self::History {
            message: message.into(),
        }
    }

    /// Create a policy error.
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy {
            message: message.into(),
        }
    }

    /// Whether this error came from the goal state machine rather than
    /// infrastructure (files, config, tables).
    pub fn is_interaction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSubgoal { .. }
                | Self::InvalidEndGoal { .. }
                | Self::PolicyResolutionExhausted { .. }
                | Self::MissingContextValue { .. }
        )
    }
}

impl From<io::Error> for CoachError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CoachError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Used where a missing or broken optional input (user config, journal)
/// must not stop a coaching session.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the coach CLI.
pub mod exit_codes {
    /// The command completed.
    pub const SUCCESS: i32 = 0;

    /// The command failed (bad input, storage failure, resolution failure).
    pub const FAILURE: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

//! Coach - decision engine for robot-led coaching sessions.
//!
//! Given where a session is in its goal hierarchy (person, session,
//! exercise, set, action), whether it is introducing or giving feedback on
//! that goal, and how the participant last performed, the engine picks the
//! next coaching behaviour from a stochastic policy and guarantees the
//! choice is valid for the context.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod journal;
pub mod logging;
pub mod runner;
pub mod storage;

pub use config::Config;
pub use core::{
    Behaviour, Category, Decision, DecisionStep, GoalLevel, InteractionMachine, PerformanceLevel,
    Phase, PolicySampler, PolicyWrapper, SessionState, TablePolicy,
};
pub use error::{CoachError, Result};
pub use journal::{JournalEvent, JournalEventType, JournalLogger, JOURNAL_SCHEMA_VERSION};
pub use runner::{CoachRunner, CycleOutcome};
pub use storage::{FileHistoryStore, HistoryStore, MemoryHistoryStore, ParticipantHistory};

// CLI commands
pub use cli::{HistoryCommand, SimulateCommand, ValidCommand};

//! Blackboard access.
//!
//! The decision step exchanges its context with the rest of the interaction
//! through a key-value blackboard. Values are JSON so any store that can hold
//! [`serde_json::Value`] can back it.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::behaviour::Behaviour;
use crate::core::goal::{GoalLevel, PerformanceLevel, Phase};
use crate::error::{CoachError, Result};

/// Slot names.
pub mod keys {
    pub const GOAL: &str = "goal";
    pub const PHASE: &str = "phase";
    pub const PERFORMANCE: &str = "performance";
    pub const BELIEF: &str = "belief";
    pub const STATE: &str = "state";
    pub const FEEDBACK_STATE: &str = "feedback_state";
    pub const PREVIOUS_PHASE: &str = "previous_phase";
    pub const BEHAVIOUR: &str = "behaviour";
    pub const OBSERVATION: &str = "observation";
    pub const NEW_GOAL: &str = "new_goal";
    pub const SCORE: &str = "score";
    pub const TARGET: &str = "target";
    pub const SUPPRESSION_FIRED: &str = "suppression_fired";
}

/// Key-value store shared between interaction steps.
pub trait Blackboard {
    fn get(&self, key: &str) -> Option<&Value>;
    fn set(&mut self, key: &str, value: Value);
}

/// In-process blackboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryBlackboard {
    slots: HashMap<String, Value>,
}

impl MemoryBlackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Blackboard for MemoryBlackboard {
    fn get(&self, key: &str) -> Option<&Value> {
        self.slots.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.slots.insert(key.to_string(), value);
    }
}

/// Read a typed value. Absent, null and mistyped slots are all missing.
pub fn read<T: DeserializeOwned, B: Blackboard + ?Sized>(board: &B, key: &str) -> Result<T> {
    match board.get(key) {
        Some(Value::Null) | None => Err(CoachError::missing_context(key)),
        Some(value) => T::deserialize(value).map_err(|_| CoachError::missing_context(key)),
    }
}

/// Read a typed value, falling back to `default` when the slot is absent or null.
///
/// A present slot of the wrong type is still an error.
pub fn read_or<T: DeserializeOwned, B: Blackboard + ?Sized>(
    board: &B,
    key: &str,
    default: T,
) -> Result<T> {
    match board.get(key) {
        Some(Value::Null) | None => Ok(default),
        Some(value) => T::deserialize(value).map_err(|_| CoachError::missing_context(key)),
    }
}

/// Write a typed value.
pub fn write<T: Serialize, B: Blackboard + ?Sized>(board: &mut B, key: &str, value: &T) -> Result<()> {
    let value = serde_json::to_value(value)?;
    board.set(key, value);
    Ok(())
}

/// Per-cycle inputs of the decision step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionContext {
    pub goal: GoalLevel,
    pub phase: Phase,
    pub performance: Option<PerformanceLevel>,
    /// Latent state the policy samples from.
    pub state: usize,
    /// Phase the state was taken for; selects the `state` or
    /// `feedback_state` slot.
    pub previous_phase: Phase,
}

impl InteractionContext {
    /// Load the context from the blackboard.
    pub fn load<B: Blackboard + ?Sized>(board: &B) -> Result<Self> {
        let goal = read(board, keys::GOAL)?;
        let phase = read(board, keys::PHASE)?;
        let performance = read_or(board, keys::PERFORMANCE, None)?;
        let previous_phase = read_or(board, keys::PREVIOUS_PHASE, Phase::Start)?;
        let state = read(board, state_slot(previous_phase))?;
        Ok(Self {
            goal,
            phase,
            performance,
            state,
            previous_phase,
        })
    }

    /// Write the cue-supplied parts of the context.
    pub fn store<B: Blackboard + ?Sized>(&self, board: &mut B) -> Result<()> {
        write(board, keys::GOAL, &self.goal)?;
        write(board, keys::PHASE, &self.phase)?;
        write(board, keys::PERFORMANCE, &self.performance)?;
        write(board, keys::PREVIOUS_PHASE, &self.previous_phase)?;
        write(board, state_slot(self.previous_phase), &self.state)
    }
}

/// Slot holding the latent state for a phase.
pub fn state_slot(phase: Phase) -> &'static str {
    match phase {
        Phase::Start => keys::STATE,
        Phase::End => keys::FEEDBACK_STATE,
    }
}

/// Read the behaviour chosen on the last cycle, if any.
pub fn last_behaviour<B: Blackboard + ?Sized>(board: &B) -> Result<Option<Behaviour>> {
    read_or(board, keys::BEHAVIOUR, None)
}

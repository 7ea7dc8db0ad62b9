//! Core types and logic for the coaching engine.
//!
//! This module contains the behaviour catalog, the goal hierarchy and its
//! state machine, the validity rules, the policy contract with its
//! validating wrapper, and the per-tick decision driver.

pub mod behaviour;
pub mod blackboard;
pub mod driver;
pub mod goal;
pub mod machine;
pub mod policy;
pub mod state;
pub mod validity;
pub mod wrapper;

pub use behaviour::{Behaviour, Category, BEHAVIOUR_COUNT, CANONICAL_FORMS};
pub use blackboard::{Blackboard, InteractionContext, MemoryBlackboard};
pub use driver::{check_for_behaviour, Decision, DecisionStep};
pub use goal::{GoalLevel, PerformanceLevel, Phase};
pub use machine::{duration_reached, CueOutcome, EndedGoal, InteractionMachine};
pub use policy::{Belief, PolicySampler, PolicyTables, TablePolicy, Transition, START_STATES};
pub use state::{CuePayload, GuideAction, LevelRecord, NodeStatus, SessionState};
pub use validity::{is_valid, valid_behaviours};
pub use wrapper::{PolicyWrapper, Resolution, ResolutionStage, Selection};

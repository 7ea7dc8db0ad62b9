//! Decision step driver.
//!
//! One decision per cue: read the interaction context off the blackboard,
//! ask the policy wrapper for a behaviour, suppress repeats at the
//! Session/Exercise/Set levels, and write the result back.

use crate::core::behaviour::{Behaviour, Category};
use crate::core::blackboard::{self, keys, state_slot, Blackboard, InteractionContext};
use crate::core::goal::Phase;
use crate::core::policy::PolicySampler;
use crate::core::state::{NodeStatus, SessionState};
use crate::core::wrapper::{PolicyWrapper, Resolution};
use crate::error::Result;

/// Behaviour emitted in place of a repeat.
pub const SUPPRESSION_REPLACEMENT: Behaviour = Behaviour::PreInstruction;

/// A completed decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub context: InteractionContext,
    /// Behaviour to perform.
    pub behaviour: Behaviour,
    /// What the wrapper chose before repetition suppression.
    pub proposed: Behaviour,
    pub observation: usize,
    pub attempts: usize,
    pub resolution: Resolution,
    /// Whether `proposed` was a repeat and got replaced.
    pub suppressed: bool,
}

/// Per-tick decision entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionStep {
    wrapper: PolicyWrapper,
}

impl DecisionStep {
    pub fn new(wrapper: PolicyWrapper) -> Self {
        Self { wrapper }
    }

    /// Run one decision, mapping errors to [`NodeStatus::Failed`].
    pub fn run<B, P>(&self, board: &mut B, state: &mut SessionState, sampler: &mut P) -> NodeStatus
    where
        B: Blackboard + ?Sized,
        P: PolicySampler + ?Sized,
    {
        match self.decide(board, state, sampler) {
            Ok(_) => NodeStatus::Success,
            Err(err) => {
                tracing::warn!("decision step failed: {}", err);
                NodeStatus::Failed(err.to_string())
            }
        }
    }

    /// Run one decision and return what was decided.
    pub fn decide<B, P>(
        &self,
        board: &mut B,
        state: &mut SessionState,
        sampler: &mut P,
    ) -> Result<Decision>
    where
        B: Blackboard + ?Sized,
        P: PolicySampler + ?Sized,
    {
        let context = InteractionContext::load(&*board)?;
        let selection = self.wrapper.select(
            sampler,
            context.state,
            context.goal,
            context.performance,
            context.phase,
        )?;

        let proposed = selection.behaviour;
        let suppressed = context.goal.suppresses_repetition() && state.has_used(proposed);
        let behaviour = if suppressed {
            tracing::debug!(
                "{} already used this round, replacing with {}",
                proposed,
                SUPPRESSION_REPLACEMENT
            );
            state.used_behaviours.clear();
            blackboard::write(board, keys::SUPPRESSION_FIRED, &true)?;
            SUPPRESSION_REPLACEMENT
        } else {
            state.used_behaviours.push(proposed);
            proposed
        };

        blackboard::write(board, keys::BEHAVIOUR, &behaviour)?;
        blackboard::write(board, keys::OBSERVATION, &selection.observation)?;
        blackboard::write(
            board,
            state_slot(context.previous_phase),
            &selection.observation,
        )?;
        blackboard::write(board, keys::PREVIOUS_PHASE, &Phase::Start)?;

        tracing::info!(
            "{} {}: {}{}",
            context.goal,
            context.phase,
            behaviour,
            if suppressed { " (repeat suppressed)" } else { "" }
        );

        Ok(Decision {
            context,
            behaviour,
            proposed,
            observation: selection.observation,
            attempts: selection.attempts.len(),
            resolution: selection.resolution,
            suppressed,
        })
    }
}

/// Confirm that the last behaviour belongs to `category`.
///
/// A confirmed Pre-Instruction or Questioning behaviour starts a fresh
/// round of repetition suppression.
pub fn check_for_behaviour<B: Blackboard + ?Sized>(
    board: &B,
    state: &mut SessionState,
    category: Category,
) -> NodeStatus {
    match blackboard::last_behaviour(board) {
        Ok(Some(behaviour)) if behaviour.is_in(category) => {
            state.used_behaviours.clear();
            NodeStatus::Success
        }
        Ok(Some(behaviour)) => {
            NodeStatus::Failed(format!("{} is not a {:?} behaviour", behaviour, category))
        }
        Ok(None) => NodeStatus::Failed("no behaviour has been chosen".to_string()),
        Err(err) => NodeStatus::Failed(err.to_string()),
    }
}

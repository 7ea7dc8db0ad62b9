//! Policy wrapper.
//!
//! Samples a behaviour from the policy and makes sure it is legal for the
//! current context. Invalid samples are resolved in stages: silence at the
//! Action level, a bounded number of resamples, then canonicalization of
//! manual-manipulation compounds or a one-step advance of the latent state.
//! A hard iteration ceiling guarantees termination.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::core::behaviour::Behaviour;
use crate::core::goal::{GoalLevel, PerformanceLevel, Phase};
use crate::core::policy::PolicySampler;
use crate::core::validity::valid_behaviours;
use crate::error::{CoachError, Result};

/// Stage of the resolution loop for one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    /// First sample drawn, not yet checked.
    Sampling,
    /// Resampling from the same state; holds the number of resamples so far.
    Retrying(u32),
    /// Retries used up; collapsing compounds or advancing the latent state.
    Canonicalizing,
    /// A valid behaviour has been found.
    Resolved,
}

/// How the returned behaviour was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The first sample was valid.
    Sampled,
    /// Person feedback always ends the interaction; nothing was sampled.
    Bypassed,
    /// Replaced by silence at the Action level.
    Silenced,
    /// Found by resampling from the same state.
    Resampled,
    /// A manual-manipulation compound collapsed to its base behaviour.
    Canonicalized,
    /// Found after advancing the latent state.
    Advanced,
}

/// Result of one behaviour selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// The chosen behaviour, always valid for the context it was chosen in.
    pub behaviour: Behaviour,
    /// Latent state observed after `behaviour` from the starting state.
    pub observation: usize,
    /// Every behaviour proposed along the way, the chosen one last.
    pub attempts: Vec<Behaviour>,
    pub resolution: Resolution,
}

/// Validating front end to a [`PolicySampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyWrapper {
    max_retries: u32,
    resolution_ceiling: u32,
}

impl Default for PolicyWrapper {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

impl PolicyWrapper {
    /// Create a wrapper with explicit limits.
    pub fn new(max_retries: u32, resolution_ceiling: u32) -> Self {
        Self {
            max_retries,
            resolution_ceiling,
        }
    }

    /// Create a wrapper from the `[policy]` config section.
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.max_retries, config.resolution_ceiling)
    }

    /// Choose a valid behaviour for `state` in the given context.
    pub fn select<P: PolicySampler + ?Sized>(
        &self,
        sampler: &mut P,
        state: usize,
        goal: GoalLevel,
        performance: Option<PerformanceLevel>,
        phase: Phase,
    ) -> Result<Selection> {
        if goal == GoalLevel::Person && phase == Phase::End {
            let observation = sampler.sample_observation(state, Behaviour::End)?;
            tracing::debug!("person feedback: emitting end");
            return Ok(Selection {
                behaviour: Behaviour::End,
                observation,
                attempts: vec![Behaviour::End],
                resolution: Resolution::Bypassed,
            });
        }

        let valid = valid_behaviours(goal, performance, phase);
        let (behaviour, attempts, resolution) =
            self.resolve(sampler, &valid, state, goal)?;
        let observation = sampler.sample_observation(state, behaviour)?;

        tracing::debug!(
            "selected {} at {} {} after {} attempt(s) ({:?})",
            behaviour,
            goal,
            phase,
            attempts.len(),
            resolution
        );

        Ok(Selection {
            behaviour,
            observation,
            attempts,
            resolution,
        })
    }

    fn resolve<P: PolicySampler + ?Sized>(
        &self,
        sampler: &mut P,
        valid: &BTreeSet<Behaviour>,
        state: usize,
        goal: GoalLevel,
    ) -> Result<(Behaviour, Vec<Behaviour>, Resolution)> {
        let mut current_state = state;
        let mut behaviour = sampler.sample_action(current_state)?;
        let mut attempts = vec![behaviour];
        let mut resolution = Resolution::Sampled;
        let mut stage = ResolutionStage::Sampling;
        let mut iterations: u32 = 0;

        while !valid.contains(&behaviour) {
            if iterations >= self.resolution_ceiling {
                return Err(CoachError::PolicyResolutionExhausted {
                    level: goal,
                    iterations,
                });
            }
            iterations += 1;
            tracing::trace!("{} invalid at {} ({:?})", behaviour, goal, stage);

            let retries = match stage {
                ResolutionStage::Sampling => 0,
                ResolutionStage::Retrying(count) => count,
                ResolutionStage::Canonicalizing | ResolutionStage::Resolved => self.max_retries,
            };

            if goal == GoalLevel::Action {
                behaviour = Behaviour::Silence;
                resolution = Resolution::Silenced;
            } else if retries < self.max_retries {
                behaviour = sampler.sample_action(current_state)?;
                resolution = Resolution::Resampled;
                stage = ResolutionStage::Retrying(retries + 1);
            } else if let Some(base) = behaviour.canonical_form() {
                behaviour = base;
                resolution = Resolution::Canonicalized;
                stage = ResolutionStage::Canonicalizing;
            } else {
                let seed = if behaviour == Behaviour::End {
                    Behaviour::Start
                } else {
                    behaviour
                };
                current_state = sampler.sample_observation(current_state, seed)?;
                behaviour = sampler.sample_action(current_state)?;
                resolution = Resolution::Advanced;
                stage = ResolutionStage::Retrying(0);
                tracing::debug!("advanced latent state to {}", current_state);
            }
            attempts.push(behaviour);
        }

        Ok((behaviour, attempts, resolution))
    }
}

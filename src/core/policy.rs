//! Policy sampler contract and the table-driven implementation.
//!
//! The sampler is the stochastic model underneath the policy wrapper: it
//! proposes a behaviour for a latent state and reports which latent state a
//! behaviour leads to. Probabilities are supplied, not learned here.

use std::path::Path;

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::core::behaviour::{Behaviour, BEHAVIOUR_COUNT};
use crate::error::{CoachError, Result};

/// Stochastic policy over latent states.
pub trait PolicySampler {
    /// Sample a behaviour for the given latent state.
    fn sample_action(&mut self, state: usize) -> Result<Behaviour>;

    /// Sample the latent state reached after `behaviour` in `state`.
    fn sample_observation(&mut self, state: usize, behaviour: Behaviour) -> Result<usize>;

    /// The state × behaviour weight matrix.
    fn matrix(&self) -> &[Vec<f64>];

    /// Overwrite one weight in the matrix.
    fn update_matrix(&mut self, state: usize, behaviour: Behaviour, value: f64) -> Result<()>;
}

impl<T: PolicySampler + ?Sized> PolicySampler for &mut T {
    fn sample_action(&mut self, state: usize) -> Result<Behaviour> {
        (**self).sample_action(state)
    }

    fn sample_observation(&mut self, state: usize, behaviour: Behaviour) -> Result<usize> {
        (**self).sample_observation(state, behaviour)
    }

    fn matrix(&self) -> &[Vec<f64>] {
        (**self).matrix()
    }

    fn update_matrix(&mut self, state: usize, behaviour: Behaviour, value: f64) -> Result<()> {
        (**self).update_matrix(state, behaviour, value)
    }
}

// =========================================================================
// Table policy
// =========================================================================

/// Sparse transition row: where `behaviour` in `state` can lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: usize,
    pub behaviour: Behaviour,
    /// `(next_state, weight)` pairs.
    pub next: Vec<(usize, f64)>,
}

/// On-disk policy tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTables {
    /// One row per latent state, one column per behaviour.
    pub actions: Vec<Vec<f64>>,
    /// Missing entries keep the current state.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl PolicyTables {
    /// Check table shapes and weights.
    pub fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(CoachError::policy("action table has no states"));
        }
        for (state, row) in self.actions.iter().enumerate() {
            if row.len() != BEHAVIOUR_COUNT {
                return Err(CoachError::policy(format!(
                    "state {} has {} weights, expected {}",
                    state,
                    row.len(),
                    BEHAVIOUR_COUNT
                )));
            }
            check_weights(row.iter().copied(), || format!("state {}", state))?;
        }
        for t in &self.transitions {
            if t.state >= self.actions.len() {
                return Err(CoachError::policy(format!(
                    "transition from unknown state {}",
                    t.state
                )));
            }
            if let Some((next, _)) = t.next.iter().find(|(n, _)| *n >= self.actions.len()) {
                return Err(CoachError::policy(format!(
                    "transition from state {} on {} leads to unknown state {}",
                    t.state, t.behaviour, next
                )));
            }
            check_weights(t.next.iter().map(|(_, w)| *w), || {
                format!("transition from state {} on {}", t.state, t.behaviour)
            })?;
        }
        Ok(())
    }
}

fn check_weights(weights: impl Iterator<Item = f64>, context: impl Fn() -> String) -> Result<()> {
    let mut total = 0.0;
    for w in weights {
        if !w.is_finite() || w < 0.0 {
            return Err(CoachError::policy(format!("{} has invalid weight {}", context(), w)));
        }
        total += w;
    }
    if total <= 0.0 {
        return Err(CoachError::policy(format!("{} has no positive weight", context())));
    }
    Ok(())
}

/// Policy sampler backed by explicit weight tables.
#[derive(Debug, Clone)]
pub struct TablePolicy {
    tables: PolicyTables,
    rng: StdRng,
}

impl TablePolicy {
    /// Build a policy from validated tables.
    ///
    /// With no seed the generator is seeded from the OS.
    pub fn new(tables: PolicyTables, seed: Option<u64>) -> Result<Self> {
        tables.validate()?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { tables, rng })
    }

    /// Equal weight on every behaviour except the Start marker, no transitions.
    pub fn uniform(n_states: usize, seed: Option<u64>) -> Result<Self> {
        let mut row = vec![1.0; BEHAVIOUR_COUNT];
        row[Behaviour::Start.index()] = 0.0;
        let tables = PolicyTables {
            actions: vec![row; n_states],
            transitions: Vec::new(),
        };
        Self::new(tables, seed)
    }

    /// Load tables from a JSON file.
    pub fn load(path: &Path, seed: Option<u64>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CoachError::storage(path, e))?;
        let tables: PolicyTables = serde_json::from_str(&content)?;
        tracing::debug!(
            "loaded policy tables from {} ({} states)",
            path.display(),
            tables.actions.len()
        );
        Self::new(tables, seed)
    }

    /// Number of latent states.
    pub fn state_count(&self) -> usize {
        self.tables.actions.len()
    }

    /// The underlying tables.
    pub fn tables(&self) -> &PolicyTables {
        &self.tables
    }

    fn row(&self, state: usize) -> Result<&Vec<f64>> {
        self.tables.actions.get(state).ok_or_else(|| {
            CoachError::policy(format!(
                "state {} out of range ({} states)",
                state,
                self.tables.actions.len()
            ))
        })
    }
}

impl PolicySampler for TablePolicy {
    fn sample_action(&mut self, state: usize) -> Result<Behaviour> {
        let row = self.row(state)?;
        let dist = WeightedIndex::new(row)
            .map_err(|e| CoachError::policy(format!("state {}: {}", state, e)))?;
        let index = dist.sample(&mut self.rng);
        Behaviour::from_index(index)
            .ok_or_else(|| CoachError::policy(format!("no behaviour at column {}", index)))
    }

    fn sample_observation(&mut self, state: usize, behaviour: Behaviour) -> Result<usize> {
        self.row(state)?;
        let Some(transition) = self
            .tables
            .transitions
            .iter()
            .find(|t| t.state == state && t.behaviour == behaviour)
        else {
            return Ok(state);
        };
        let dist = WeightedIndex::new(transition.next.iter().map(|(_, w)| *w))
            .map_err(|e| CoachError::policy(format!("transition from state {}: {}", state, e)))?;
        Ok(transition.next[dist.sample(&mut self.rng)].0)
    }

    fn matrix(&self) -> &[Vec<f64>] {
        &self.tables.actions
    }

    fn update_matrix(&mut self, state: usize, behaviour: Behaviour, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(CoachError::policy(format!("invalid weight {}", value)));
        }
        let count = self.tables.actions.len();
        let row = self.tables.actions.get_mut(state).ok_or_else(|| {
            CoachError::policy(format!("state {} out of range ({} states)", state, count))
        })?;
        row[behaviour.index()] = value;
        Ok(())
    }
}

// =========================================================================
// Belief
// =========================================================================

/// Number of coaching styles a belief ranges over.
pub const STYLE_COUNT: usize = 12;

/// Entry state of each coaching style in the policy tables.
pub const START_STATES: [usize; STYLE_COUNT] =
    [0, 45, 90, 135, 180, 225, 270, 323, 376, 429, 482, 535];

/// Impairment score at or above which a participant counts as experienced.
pub const EXPERIENCED_IMPAIRMENT: u32 = 4;

const EXPERIENCED_STYLE: usize = 3;
const NOVICE_STYLE: usize = 8;

/// Distribution over coaching styles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Belief(Vec<f64>);

impl Belief {
    /// A belief from explicit weights, one per style.
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.len() != STYLE_COUNT {
            return Err(CoachError::policy(format!(
                "belief has {} entries, expected {}",
                weights.len(),
                STYLE_COUNT
            )));
        }
        Ok(Self(weights))
    }

    /// All weight on one style.
    pub fn one_hot(style: usize) -> Result<Self> {
        if style >= STYLE_COUNT {
            return Err(CoachError::policy(format!("unknown coaching style {}", style)));
        }
        let mut weights = vec![0.0; STYLE_COUNT];
        weights[style] = 1.0;
        Ok(Self(weights))
    }

    /// Belief for a participant: the forced style if given, otherwise the
    /// default for their experience level.
    pub fn for_participant(impairment: u32, style: Option<usize>) -> Result<Self> {
        match style {
            Some(style) => Self::one_hot(style),
            None if impairment >= EXPERIENCED_IMPAIRMENT => Self::one_hot(EXPERIENCED_STYLE),
            None => Self::one_hot(NOVICE_STYLE),
        }
    }

    /// Weights, one per style.
    pub fn weights(&self) -> &[f64] {
        &self.0
    }

    /// Most likely style. Ties go to the lowest style; an all-zero belief
    /// selects style 0.
    pub fn style(&self) -> usize {
        let mut best = 0;
        let mut best_weight = 0.0;
        for (style, &w) in self.0.iter().enumerate() {
            if w > best_weight {
                best_weight = w;
                best = style;
            }
        }
        best
    }

    /// Start state of the most likely style.
    pub fn start_state(&self) -> usize {
        START_STATES[self.style()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_behaviour_tables(states: usize, behaviour: Behaviour) -> PolicyTables {
        let mut row = vec![0.0; BEHAVIOUR_COUNT];
        row[behaviour.index()] = 1.0;
        PolicyTables {
            actions: vec![row; states],
            transitions: Vec::new(),
        }
    }

    #[test]
    fn test_sample_action_follows_weights() {
        let tables = single_behaviour_tables(3, Behaviour::Praise);
        let mut policy = TablePolicy::new(tables, Some(7)).unwrap();
        for state in 0..3 {
            assert_eq!(policy.sample_action(state).unwrap(), Behaviour::Praise);
        }
    }

    #[test]
    fn test_uniform_never_samples_start_marker() {
        let mut policy = TablePolicy::uniform(2, Some(1)).unwrap();
        for _ in 0..500 {
            assert_ne!(policy.sample_action(1).unwrap(), Behaviour::Start);
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = TablePolicy::uniform(1, Some(42)).unwrap();
        let mut b = TablePolicy::uniform(1, Some(42)).unwrap();
        for _ in 0..50 {
            assert_eq!(a.sample_action(0).unwrap(), b.sample_action(0).unwrap());
        }
    }

    #[test]
    fn test_out_of_range_state_is_error() {
        let mut policy = TablePolicy::uniform(2, Some(1)).unwrap();
        assert!(matches!(
            policy.sample_action(2),
            Err(CoachError::Policy { .. })
        ));
        assert!(policy.sample_observation(5, Behaviour::Praise).is_err());
    }

    #[test]
    fn test_missing_transition_keeps_state() {
        let mut policy = TablePolicy::uniform(4, Some(1)).unwrap();
        assert_eq!(policy.sample_observation(3, Behaviour::Praise).unwrap(), 3);
    }

    #[test]
    fn test_transition_is_followed() {
        let mut tables = single_behaviour_tables(4, Behaviour::Praise);
        tables.transitions.push(Transition {
            state: 1,
            behaviour: Behaviour::Praise,
            next: vec![(2, 0.0), (3, 1.0)],
        });
        let mut policy = TablePolicy::new(tables, Some(3)).unwrap();
        assert_eq!(policy.sample_observation(1, Behaviour::Praise).unwrap(), 3);
        assert_eq!(policy.sample_observation(1, Behaviour::Scold).unwrap(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_tables() {
        let short = PolicyTables {
            actions: vec![vec![1.0; 3]],
            transitions: Vec::new(),
        };
        assert!(TablePolicy::new(short, None).is_err());

        let zero = PolicyTables {
            actions: vec![vec![0.0; BEHAVIOUR_COUNT]],
            transitions: Vec::new(),
        };
        assert!(TablePolicy::new(zero, None).is_err());

        let mut dangling = single_behaviour_tables(2, Behaviour::Praise);
        dangling.transitions.push(Transition {
            state: 0,
            behaviour: Behaviour::Praise,
            next: vec![(9, 1.0)],
        });
        assert!(TablePolicy::new(dangling, None).is_err());
    }

    #[test]
    fn test_update_matrix() {
        let mut policy = TablePolicy::new(single_behaviour_tables(2, Behaviour::Praise), Some(0))
            .unwrap();
        policy.update_matrix(1, Behaviour::Praise, 0.0).unwrap();
        policy.update_matrix(1, Behaviour::Scold, 2.0).unwrap();
        assert_eq!(policy.matrix()[1][Behaviour::Scold.index()], 2.0);
        assert_eq!(policy.sample_action(1).unwrap(), Behaviour::Scold);
        assert!(policy.update_matrix(9, Behaviour::Scold, 1.0).is_err());
        assert!(policy.update_matrix(0, Behaviour::Scold, -1.0).is_err());
    }

    #[test]
    fn test_tables_json_format() {
        let mut tables = single_behaviour_tables(1, Behaviour::Silence);
        tables.transitions.push(Transition {
            state: 0,
            behaviour: Behaviour::Silence,
            next: vec![(0, 1.0)],
        });
        let json = serde_json::to_string(&tables).unwrap();
        assert!(json.contains("\"behaviour\":\"silence\""));
        assert!(json.contains("\"next\":[[0,1.0]]"));
        let parsed: PolicyTables = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tables);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        let tables = single_behaviour_tables(2, Behaviour::Hustle);
        std::fs::write(&path, serde_json::to_string(&tables).unwrap()).unwrap();

        let mut policy = TablePolicy::load(&path, Some(5)).unwrap();
        assert_eq!(policy.state_count(), 2);
        assert_eq!(policy.sample_action(0).unwrap(), Behaviour::Hustle);

        let missing = TablePolicy::load(&dir.path().join("nope.json"), None);
        assert!(matches!(missing, Err(CoachError::Storage { .. })));
    }

    // =========================================================================
    // Belief
    // =========================================================================

    #[test]
    fn test_default_belief_by_experience() {
        let novice = Belief::for_participant(2, None).unwrap();
        assert_eq!(novice.style(), 8);
        assert_eq!(novice.start_state(), 376);

        let experienced = Belief::for_participant(4, None).unwrap();
        assert_eq!(experienced.style(), 3);
        assert_eq!(experienced.start_state(), 135);
    }

    #[test]
    fn test_forced_style_overrides_experience() {
        let belief = Belief::for_participant(5, Some(11)).unwrap();
        assert_eq!(belief.start_state(), 535);
        assert!(Belief::for_participant(5, Some(12)).is_err());
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        let mut weights = vec![0.0; STYLE_COUNT];
        weights[2] = 0.4;
        weights[6] = 0.4;
        let belief = Belief::new(weights).unwrap();
        assert_eq!(belief.style(), 2);
    }

    #[test]
    fn test_all_zero_belief_selects_first_style() {
        let belief = Belief::new(vec![0.0; STYLE_COUNT]).unwrap();
        assert_eq!(belief.start_state(), 0);
    }

    #[test]
    fn test_belief_length_checked() {
        assert!(Belief::new(vec![1.0; 3]).is_err());
    }

    #[test]
    fn test_belief_serializes_as_list() {
        let belief = Belief::one_hot(1).unwrap();
        let json = serde_json::to_value(&belief).unwrap();
        assert_eq!(json.as_array().map(|a| a.len()), Some(STYLE_COUNT));
    }
}

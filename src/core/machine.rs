//! Interaction state machine.
//!
//! Sequences the coaching hierarchy: creating and ending subgoals, answering
//! timestep cues from the guide, and folding per-level performance into the
//! parent level when a goal ends. All mutation of [`SessionState`] goes
//! through this struct.

use crate::config::Config;
use crate::core::goal::{GoalLevel, Phase};
use crate::core::state::{CuePayload, GuideAction, SessionState};
use crate::error::{CoachError, Result};

/// Answer to a timestep cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueOutcome {
    /// The guide has not caught up with this level yet.
    Waiting,
    /// Context for the next decision.
    Ready(CuePayload),
}

/// Outcome of ending a subgoal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndedGoal {
    /// The level that was ended.
    pub ended: GoalLevel,
    /// The level the interaction returns to; `None` once Person has ended.
    pub new_level: Option<GoalLevel>,
    /// Whether feedback is owed at the tracking level.
    pub feedback_owed: bool,
}

/// Whether a session clock reading has passed the requested duration.
pub fn duration_reached(now: u32, start: u32, duration: u32) -> bool {
    now.saturating_sub(start) >= duration
}

/// Goal/phase state machine over one session.
#[derive(Debug)]
pub struct InteractionMachine<'a> {
    state: &'a mut SessionState,
    config: &'a Config,
}

impl<'a> InteractionMachine<'a> {
    pub fn new(state: &'a mut SessionState, config: &'a Config) -> Self {
        Self { state, config }
    }

    /// Level the guide currently has data for.
    pub fn tracking(&self) -> Option<GoalLevel> {
        self.state.tracking
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Whether the session has ended above Person.
    pub fn is_complete(&self) -> bool {
        self.state.complete
    }

    // =========================================================================
    // Subgoals
    // =========================================================================

    /// Open the child of `level`.
    pub fn create_subgoal(&mut self, level: GoalLevel) -> Result<GoalLevel> {
        let child = level
            .child()
            .ok_or_else(|| CoachError::invalid_subgoal(level))?;
        self.state.deepest_open = Some(child);
        tracing::info!("created subgoal: {} -> {}", level, child);
        Ok(child)
    }

    /// Close `level` and return to its parent.
    ///
    /// Ending a set that finishes the exercise, or ending an exercise or the
    /// session, owes feedback at the parent level: tracking moves up and the
    /// phase becomes End. Otherwise the next sibling starts.
    pub fn end_subgoal(&mut self, level: GoalLevel) -> Result<EndedGoal> {
        if self.state.complete {
            return Err(CoachError::invalid_end_goal(format!(
                "cannot end {} goal after the session has completed",
                level
            )));
        }
        match self.state.deepest_open {
            Some(deepest) if level <= deepest => {}
            Some(deepest) => {
                return Err(CoachError::invalid_end_goal(format!(
                    "cannot end {} goal while the deepest open goal is {}",
                    level, deepest
                )));
            }
            None => {
                return Err(CoachError::invalid_end_goal(format!(
                    "cannot end {} goal with no open goal",
                    level
                )));
            }
        }

        let feedback_owed = match level {
            GoalLevel::Set => self.state.sets_in_exercise >= self.config.session.sets_per_exercise,
            GoalLevel::Exercise | GoalLevel::Session => true,
            GoalLevel::Person | GoalLevel::Action => false,
        };

        if feedback_owed {
            self.state.tracking = self.state.tracking.and_then(GoalLevel::parent);
            self.state.phase = Phase::End;
        } else {
            self.state.phase = Phase::Start;
        }

        match level {
            GoalLevel::Set => self.state.accumulators.fold_into_parent(GoalLevel::Set),
            GoalLevel::Exercise => {
                self.state.accumulators.fold_into_parent(GoalLevel::Exercise);
                self.state.session_time += 1;
                self.state.sets_in_exercise = 0;
            }
            GoalLevel::Session => self.state.accumulators.fold_into_parent(GoalLevel::Session),
            GoalLevel::Person | GoalLevel::Action => {}
        }

        let new_level = level.parent();
        self.state.deepest_open = new_level;
        self.state.completed = true;
        if new_level.is_none() {
            self.state.complete = true;
            tracing::info!("session complete");
        } else {
            tracing::info!(
                "ended subgoal {}; new goal level {:?}, feedback owed: {}",
                level,
                new_level,
                feedback_owed
            );
        }

        Ok(EndedGoal {
            ended: level,
            new_level,
            feedback_owed,
        })
    }

    // =========================================================================
    // Timestep cues
    // =========================================================================

    /// Answer the guide's cue for `level`.
    pub fn timestep_cue(&mut self, level: GoalLevel) -> CueOutcome {
        self.state.completed = false;

        if self.state.tracking != Some(level) {
            if level == GoalLevel::Session {
                if let Some(previous) = self.state.previous_session_performance {
                    self.state.latest_performance = Some(previous);
                }
                self.state.tracking = Some(GoalLevel::Session);
                tracing::debug!("session cue: loaded previous performance, tracking session");
            }
            return CueOutcome::Waiting;
        }

        let target = self.state.latest_target;
        let payload = match (level, self.state.phase) {
            (GoalLevel::Action, _) => {
                let performance = self.state.latest_performance;
                let score = self.state.latest_score;
                self.state
                    .accumulators
                    .level_mut(GoalLevel::Set)
                    .push(performance, score);
                self.state.tracking = Some(GoalLevel::Set);
                CuePayload {
                    phase: Phase::End,
                    performance,
                    score,
                    target,
                }
            }
            (GoalLevel::Person, Phase::Start) => CuePayload {
                phase: Phase::Start,
                performance: None,
                score: None,
                target: None,
            },
            (GoalLevel::Session, Phase::Start) => CuePayload {
                phase: Phase::Start,
                performance: self
                    .state
                    .latest_performance
                    .or(self.state.previous_session_performance),
                score: None,
                target: None,
            },
            (GoalLevel::Exercise, Phase::Start) => {
                self.state.tracking = Some(GoalLevel::Set);
                CuePayload {
                    phase: Phase::Start,
                    performance: self.state.latest_performance,
                    score: None,
                    target: None,
                }
            }
            (GoalLevel::Set, Phase::Start) => {
                self.state.repetitions = 0;
                CuePayload {
                    phase: Phase::Start,
                    performance: self.state.latest_performance,
                    score: None,
                    target: None,
                }
            }
            (GoalLevel::Person | GoalLevel::Session, Phase::End) => {
                let record = self.state.accumulators.level(level);
                CuePayload {
                    phase: Phase::End,
                    performance: record.mean_performance(),
                    score: None,
                    target: None,
                }
            }
            (GoalLevel::Exercise | GoalLevel::Set, Phase::End) => {
                let record = self.state.accumulators.level(level);
                CuePayload {
                    phase: Phase::End,
                    performance: record.mean_performance(),
                    score: record.mean_score(),
                    target,
                }
            }
        };

        if payload.phase == Phase::End && level != GoalLevel::Action {
            tracing::info!(
                "feedback for {}: performance {:?}, score {:?}, target {:?}",
                level,
                payload.performance,
                payload.score,
                payload.target
            );
        }

        CueOutcome::Ready(payload)
    }

    // =========================================================================
    // Guide updates
    // =========================================================================

    /// The guide reports it has participant data.
    pub fn person_ready(&mut self) {
        self.state.tracking = Some(GoalLevel::Person);
        self.state.phase = Phase::Start;
    }

    /// The guide reports it has started a new goal at `level`.
    pub fn guide_enter(&mut self, level: GoalLevel) {
        self.state.tracking = Some(level);
        self.state.phase = Phase::Start;
    }

    /// The guide reports one completed action.
    pub fn observe_action(&mut self, action: GuideAction) {
        self.state.tracking = Some(GoalLevel::Action);
        self.state.repetitions += 1;
        self.state.latest_performance = Some(action.performance);
        self.state.latest_score = Some(action.score);
        self.state.latest_target = Some(action.target);
    }

    /// Whether the current set has enough repetitions to end.
    ///
    /// On success the set counters advance and set feedback is owed.
    pub fn end_set_event(&mut self) -> bool {
        let needed = if self.state.sets_in_session == 0 {
            self.config.session.first_set_repetitions
        } else {
            self.config.session.later_set_repetitions
        };
        if self.state.repetitions < needed {
            tracing::debug!("set at {} of {} repetitions", self.state.repetitions, needed);
            return false;
        }

        self.state.sets_in_exercise += 1;
        self.state.sets_in_session += 1;
        self.state.completed = true;
        self.state.tracking = Some(GoalLevel::Set);
        self.state.phase = Phase::End;
        tracing::info!(
            "set completed after {} repetitions ({} this exercise)",
            self.state.repetitions,
            self.state.sets_in_exercise
        );
        true
    }

    /// Whether the session clock has run `duration` past `start`.
    pub fn duration_check(&self, start: u32, duration: u32) -> bool {
        duration_reached(self.state.session_time, start, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::goal::PerformanceLevel;

    fn action(performance: PerformanceLevel, score: f64) -> GuideAction {
        GuideAction {
            performance,
            score,
            target: 0.8,
        }
    }

    fn ready(outcome: CueOutcome) -> CuePayload {
        match outcome {
            CueOutcome::Ready(payload) => payload,
            CueOutcome::Waiting => panic!("expected a ready cue"),
        }
    }

    // =========================================================================
    // Subgoals
    // =========================================================================

    #[test]
    fn test_create_subgoal_descends_one_level() {
        let mut state = SessionState::new(None);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        for (level, child) in GoalLevel::ALL.iter().zip(GoalLevel::ALL.iter().skip(1)) {
            assert_eq!(machine.create_subgoal(*level).unwrap(), *child);
        }
        assert_eq!(state.deepest_open, Some(GoalLevel::Action));
    }

    #[test]
    fn test_create_subgoal_of_action_fails() {
        let mut state = SessionState::new(None);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        let err = machine.create_subgoal(GoalLevel::Action).unwrap_err();
        assert!(matches!(
            err,
            CoachError::InvalidSubgoal {
                level: GoalLevel::Action
            }
        ));
    }

    #[test]
    fn test_end_subgoal_deeper_than_open_fails() {
        let mut state = SessionState::new(None);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);
        machine.create_subgoal(GoalLevel::Person).unwrap();

        let err = machine.end_subgoal(GoalLevel::Set).unwrap_err();
        assert!(matches!(err, CoachError::InvalidEndGoal { .. }));
    }

    #[test]
    fn test_end_subgoal_action_returns_to_set() {
        let mut state = SessionState::new(None);
        state.deepest_open = Some(GoalLevel::Action);
        state.tracking = Some(GoalLevel::Set);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        let ended = machine.end_subgoal(GoalLevel::Action).unwrap();
        assert_eq!(ended.new_level, Some(GoalLevel::Set));
        assert!(!ended.feedback_owed);
        assert_eq!(state.phase, Phase::Start);
        assert!(state.completed);
        assert_eq!(state.tracking, Some(GoalLevel::Set));
    }

    #[test]
    fn test_end_first_set_starts_next_set() {
        let mut state = SessionState::new(None);
        state.deepest_open = Some(GoalLevel::Set);
        state.tracking = Some(GoalLevel::Set);
        state.sets_in_exercise = 1;
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        let ended = machine.end_subgoal(GoalLevel::Set).unwrap();
        assert!(!ended.feedback_owed);
        assert_eq!(state.phase, Phase::Start);
        assert_eq!(state.tracking, Some(GoalLevel::Set));
    }

    #[test]
    fn test_end_final_set_owes_exercise_feedback() {
        let mut state = SessionState::new(None);
        state.deepest_open = Some(GoalLevel::Set);
        state.tracking = Some(GoalLevel::Set);
        state.sets_in_exercise = 2;
        state
            .accumulators
            .level_mut(GoalLevel::Set)
            .push(Some(PerformanceLevel::Slow), Some(0.4));
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        let ended = machine.end_subgoal(GoalLevel::Set).unwrap();
        assert!(ended.feedback_owed);
        assert_eq!(ended.new_level, Some(GoalLevel::Exercise));
        assert_eq!(state.tracking, Some(GoalLevel::Exercise));
        assert_eq!(state.phase, Phase::End);
        assert!(state.accumulators.level(GoalLevel::Set).is_empty());
        assert_eq!(
            state.accumulators.level(GoalLevel::Exercise).performances,
            vec![2]
        );
    }

    #[test]
    fn test_sets_per_exercise_is_configurable() {
        let mut state = SessionState::new(None);
        state.deepest_open = Some(GoalLevel::Set);
        state.tracking = Some(GoalLevel::Set);
        state.sets_in_exercise = 2;
        let mut config = Config::default();
        config.session.sets_per_exercise = 3;
        let mut machine = InteractionMachine::new(&mut state, &config);

        assert!(!machine.end_subgoal(GoalLevel::Set).unwrap().feedback_owed);
    }

    #[test]
    fn test_end_exercise_advances_clock() {
        let mut state = SessionState::new(None);
        state.deepest_open = Some(GoalLevel::Exercise);
        state.tracking = Some(GoalLevel::Exercise);
        state.sets_in_exercise = 2;
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        machine.end_subgoal(GoalLevel::Exercise).unwrap();
        assert!(machine.duration_check(0, 1));
        assert_eq!(state.session_time, 1);
        assert_eq!(state.sets_in_exercise, 0);
        assert_eq!(state.tracking, Some(GoalLevel::Session));
        assert_eq!(state.phase, Phase::End);
    }

    #[test]
    fn test_ending_person_completes_session() {
        let mut state = SessionState::new(None);
        state.tracking = Some(GoalLevel::Person);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        let ended = machine.end_subgoal(GoalLevel::Person).unwrap();
        assert_eq!(ended.new_level, None);
        assert!(machine.is_complete());
        assert!(machine.end_subgoal(GoalLevel::Person).is_err());
    }

    // =========================================================================
    // Timestep cues
    // =========================================================================

    #[test]
    fn test_cue_waits_until_guide_catches_up() {
        let mut state = SessionState::new(None);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        assert_eq!(machine.timestep_cue(GoalLevel::Person), CueOutcome::Waiting);
        machine.person_ready();
        let payload = ready(machine.timestep_cue(GoalLevel::Person));
        assert_eq!(payload.phase, Phase::Start);
        assert_eq!(payload.performance, None);
    }

    #[test]
    fn test_session_cue_loads_previous_performance() {
        let mut state = SessionState::new(Some(PerformanceLevel::Slow));
        state.tracking = Some(GoalLevel::Person);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        assert_eq!(machine.timestep_cue(GoalLevel::Session), CueOutcome::Waiting);
        assert_eq!(machine.tracking(), Some(GoalLevel::Session));
        let payload = ready(machine.timestep_cue(GoalLevel::Session));
        assert_eq!(payload.phase, Phase::Start);
        assert_eq!(payload.performance, Some(PerformanceLevel::Slow));
    }

    #[test]
    fn test_exercise_start_hands_over_to_set() {
        let mut state = SessionState::new(None);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        machine.guide_enter(GoalLevel::Exercise);
        ready(machine.timestep_cue(GoalLevel::Exercise));
        assert_eq!(machine.tracking(), Some(GoalLevel::Set));
    }

    #[test]
    fn test_set_start_resets_repetitions() {
        let mut state = SessionState::new(None);
        state.tracking = Some(GoalLevel::Set);
        state.repetitions = 7;
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        ready(machine.timestep_cue(GoalLevel::Set));
        assert_eq!(state.repetitions, 0);
    }

    #[test]
    fn test_action_cue_records_and_returns_to_set() {
        let mut state = SessionState::new(None);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        machine.observe_action(action(PerformanceLevel::Fast, 0.6));
        let payload = ready(machine.timestep_cue(GoalLevel::Action));
        assert_eq!(payload.phase, Phase::End);
        assert_eq!(payload.performance, Some(PerformanceLevel::Fast));
        assert_eq!(payload.score, Some(0.6));
        assert_eq!(payload.target, Some(0.8));
        assert_eq!(machine.tracking(), Some(GoalLevel::Set));
        assert_eq!(machine.timestep_cue(GoalLevel::Action), CueOutcome::Waiting);

        let set = state.accumulators.level(GoalLevel::Set);
        assert_eq!(set.performances, vec![1]);
        assert_eq!(state.repetitions, 1);
    }

    #[test]
    fn test_set_feedback_is_mean_of_actions() {
        let mut state = SessionState::new(None);
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);

        for (perf, score) in [
            (PerformanceLevel::Good, 0.5),
            (PerformanceLevel::Fast, 0.7),
            (PerformanceLevel::Slow, 0.6),
        ] {
            machine.observe_action(action(perf, score));
            ready(machine.timestep_cue(GoalLevel::Action));
        }

        machine.state.phase = Phase::End;
        let payload = ready(machine.timestep_cue(GoalLevel::Set));
        assert_eq!(payload.phase, Phase::End);
        assert_eq!(payload.performance, Some(PerformanceLevel::Fast));
        assert!((payload.score.unwrap() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_cue_clears_completed() {
        let mut state = SessionState::new(None);
        state.completed = true;
        let config = Config::default();
        let mut machine = InteractionMachine::new(&mut state, &config);
        machine.timestep_cue(GoalLevel::Exercise);
        assert!(!state.completed);
    }

    // =========================================================================
    // End-set threshold
    // =========================================================================

    fn state_with_reps(reps: u32, sets_in_session: u32) -> SessionState {
        let mut state = SessionState::new(None);
        state.repetitions = reps;
        state.sets_in_session = sets_in_session;
        state
    }

    #[test]
    fn test_first_set_needs_ten() {
        let config = Config::default();

        let mut state = state_with_reps(9, 0);
        assert!(!InteractionMachine::new(&mut state, &config).end_set_event());
        assert_eq!(state.sets_in_session, 0);

        let mut state = state_with_reps(10, 0);
        assert!(InteractionMachine::new(&mut state, &config).end_set_event());
        assert_eq!(state.sets_in_session, 1);
        assert_eq!(state.sets_in_exercise, 1);
        assert_eq!(state.phase, Phase::End);
        assert_eq!(state.tracking, Some(GoalLevel::Set));
        assert!(state.completed);
    }

    #[test]
    fn test_later_sets_need_five() {
        let config = Config::default();

        let mut state = state_with_reps(4, 1);
        assert!(!InteractionMachine::new(&mut state, &config).end_set_event());

        let mut state = state_with_reps(5, 1);
        assert!(InteractionMachine::new(&mut state, &config).end_set_event());
        assert_eq!(state.sets_in_session, 2);
    }

    #[test]
    fn test_duration_reached() {
        assert!(!duration_reached(1, 0, 2));
        assert!(duration_reached(2, 0, 2));
        assert!(duration_reached(5, 3, 2));
        assert!(!duration_reached(0, 3, 2));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn create_subgoal_is_monotonic(index in 0i64..4) {
                let level = GoalLevel::from_index(index).unwrap();
                let mut state = SessionState::new(None);
                let config = Config::default();
                let mut machine = InteractionMachine::new(&mut state, &config);
                let child = machine.create_subgoal(level).unwrap();
                prop_assert_eq!(child.index(), level.index() + 1);
            }

            #[test]
            fn end_set_threshold(reps in 0u32..20, later in any::<bool>()) {
                let config = Config::default();
                let mut state = state_with_reps(reps, u32::from(later));
                let needed = if later { 5 } else { 10 };
                let ended = InteractionMachine::new(&mut state, &config).end_set_event();
                prop_assert_eq!(ended, reps >= needed);
            }
        }
    }
}

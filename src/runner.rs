//! Coach runner.
//!
//! Owns one session: the state machine, the blackboard the decision step
//! reads from, the policy, the participant history and the optional journal.
//! The guide drives it with one [`CoachRunner::cycle`] per cue plus the
//! subgoal and action updates.

use crate::config::Config;
use crate::core::blackboard::{self, keys, MemoryBlackboard};
use crate::core::{
    check_for_behaviour, Belief, Category, CueOutcome, CuePayload, Decision, DecisionStep,
    EndedGoal, GoalLevel, GuideAction, InteractionMachine, Phase, PolicySampler, PolicyWrapper,
    SessionState,
};
use crate::error::{FailOpen, Result};
use crate::journal::{JournalEventType, JournalLogger};
use crate::storage::HistoryStore;

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The guide has not caught up with the requested level.
    Waiting,
    /// A behaviour was chosen.
    Decided(Decision),
    /// No behaviour could be chosen; the caller abandons this goal level.
    Failed(String),
}

impl CycleOutcome {
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Self::Waiting | Self::Failed(_) => None,
            Self::Decided(decision) => Some(decision),
        }
    }
}

/// One coaching session over a policy and a history store.
pub struct CoachRunner<P: PolicySampler, H: HistoryStore> {
    config: Config,
    policy: P,
    history: H,
    journal: Option<JournalLogger>,
    step: DecisionStep,
    state: SessionState,
    board: MemoryBlackboard,
    participant_id: Option<String>,
    exercise: Option<String>,
}

impl<P: PolicySampler, H: HistoryStore> CoachRunner<P, H> {
    pub fn new(config: Config, policy: P, history: H) -> Self {
        let journal = config.storage.journal.as_ref().map(JournalLogger::new);
        let step = DecisionStep::new(PolicyWrapper::from_config(&config.policy));
        Self {
            config,
            policy,
            history,
            journal,
            step,
            state: SessionState::new(None),
            board: MemoryBlackboard::new(),
            participant_id: None,
            exercise: None,
        }
    }

    /// Replace the journal configured in `config`.
    pub fn with_journal(mut self, journal: Option<JournalLogger>) -> Self {
        self.journal = journal;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn board(&self) -> &MemoryBlackboard {
        &self.board
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_complete(&self) -> bool {
        self.state.complete
    }

    fn machine(&mut self) -> InteractionMachine<'_> {
        InteractionMachine::new(&mut self.state, &self.config)
    }

    fn journal(&self, data: JournalEventType) {
        if let Some(journal) = &self.journal {
            journal.record(data).fail_open_default("appending to journal");
        }
    }

    // =========================================================================
    // Session setup
    // =========================================================================

    /// Start a session for a participant.
    ///
    /// Loads the previous session's performance (creating a history record
    /// on first contact), collapses the belief to a start state and marks
    /// the person goal as ready. Returns the start state.
    pub fn begin_session(
        &mut self,
        participant_id: &str,
        impairment: u32,
        style: Option<usize>,
    ) -> Result<usize> {
        let history = self.history.get_or_create(participant_id)?;
        let previous = history.last_performance();

        let belief = Belief::for_participant(impairment, style)?;
        let start_state = belief.start_state();

        self.state = SessionState::new(previous);
        self.board = MemoryBlackboard::new();
        blackboard::write(&mut self.board, keys::BELIEF, &belief)?;
        blackboard::write(&mut self.board, keys::STATE, &start_state)?;
        blackboard::write(&mut self.board, keys::FEEDBACK_STATE, &start_state)?;
        blackboard::write(&mut self.board, keys::PREVIOUS_PHASE, &Phase::Start)?;
        blackboard::write(&mut self.board, keys::SUPPRESSION_FIRED, &false)?;
        self.participant_id = Some(participant_id.to_string());
        self.exercise = None;
        self.machine().person_ready();

        tracing::info!(
            "session started for {}: style {}, start state {}, previous performance {:?}",
            participant_id,
            belief.style(),
            start_state,
            previous
        );
        self.journal(JournalEventType::session_started(
            participant_id,
            belief.style(),
            start_state,
            previous,
        ));
        Ok(start_state)
    }

    // =========================================================================
    // Cycle
    // =========================================================================

    /// Answer one cue at `level`: fetch the context and, if it is ready,
    /// decide a behaviour.
    ///
    /// Interaction errors (exhausted resolution, missing context) come back
    /// as [`CycleOutcome::Failed`]; infrastructure errors are returned.
    pub fn cycle(&mut self, level: GoalLevel) -> Result<CycleOutcome> {
        let payload = match self.machine().timestep_cue(level) {
            CueOutcome::Waiting => return Ok(CycleOutcome::Waiting),
            CueOutcome::Ready(payload) => payload,
        };

        self.write_payload(level, &payload)?;
        if payload.phase == Phase::End {
            self.record_feedback(level, &payload);
        }

        let decision = match self
            .step
            .decide(&mut self.board, &mut self.state, &mut self.policy)
        {
            Ok(decision) => decision,
            Err(err) if err.is_interaction_error() => {
                tracing::warn!("no behaviour for {} {}: {}", level, payload.phase, err);
                return Ok(CycleOutcome::Failed(err.to_string()));
            }
            Err(err) => return Err(err),
        };
        if decision.context.goal.suppresses_repetition() {
            self.confirm_round_start();
        }
        self.journal(JournalEventType::behaviour_selected(&decision));
        Ok(CycleOutcome::Decided(decision))
    }

    /// A confirmed Pre-Instruction or Questioning behaviour opens a new
    /// round of repetition suppression.
    fn confirm_round_start(&mut self) {
        for category in [Category::PreInstruction, Category::Questioning] {
            if check_for_behaviour(&self.board, &mut self.state, category).is_success() {
                tracing::debug!("{:?} confirmed, repetition round reset", category);
                return;
            }
        }
    }

    fn write_payload(&mut self, level: GoalLevel, payload: &CuePayload) -> Result<()> {
        let board = &mut self.board;
        blackboard::write(board, keys::GOAL, &level)?;
        blackboard::write(board, keys::PHASE, &payload.phase)?;
        blackboard::write(board, keys::PERFORMANCE, &payload.performance)?;
        blackboard::write(board, keys::SCORE, &payload.score)?;
        blackboard::write(board, keys::TARGET, &payload.target)?;
        blackboard::write(board, keys::PREVIOUS_PHASE, &payload.phase)
    }

    /// Persist end-of-goal performance for sessions and named exercises.
    fn record_feedback(&mut self, level: GoalLevel, payload: &CuePayload) {
        let Some(participant_id) = self.participant_id.clone() else {
            return;
        };
        let Some(performance) = payload.performance else {
            if level == GoalLevel::Session {
                tracing::warn!("session ended without performance data, history not updated");
            }
            return;
        };

        let exercise = match level {
            GoalLevel::Session => None,
            GoalLevel::Exercise => match self.exercise.take() {
                Some(name) => Some(name),
                None => return,
            },
            _ => return,
        };

        let recorded = self.history.get_or_create(&participant_id).and_then(|mut history| {
            match &exercise {
                Some(name) => history.record_exercise(name, performance),
                None => history.record_session(performance),
            }
            self.history.put(&history)?;
            Ok(history.session_count())
        });

        match (recorded, exercise) {
            (Ok(session_count), None) => {
                tracing::info!(
                    "recorded session {} for {}: {:?}",
                    session_count,
                    participant_id,
                    performance
                );
                self.journal(JournalEventType::session_recorded(
                    participant_id,
                    performance,
                    session_count,
                ));
            }
            (Ok(_), Some(name)) => {
                tracing::debug!("recorded exercise {} for {}", name, participant_id);
            }
            (Err(err), _) => {
                tracing::warn!("failed to update history for {}: {}", participant_id, err);
            }
        }
    }

    // =========================================================================
    // Goal transitions
    // =========================================================================

    /// Open the child of `level`.
    pub fn create_subgoal(&mut self, level: GoalLevel) -> Result<GoalLevel> {
        let child = self.machine().create_subgoal(level)?;
        blackboard::write(&mut self.board, keys::NEW_GOAL, &child)?;
        self.journal(JournalEventType::subgoal_created(level, child));
        Ok(child)
    }

    /// Close `level`.
    pub fn end_subgoal(&mut self, level: GoalLevel) -> Result<EndedGoal> {
        let ended = self.machine().end_subgoal(level)?;
        blackboard::write(&mut self.board, keys::NEW_GOAL, &ended.new_level)?;
        self.journal(JournalEventType::subgoal_ended(&ended));
        Ok(ended)
    }

    // =========================================================================
    // Guide updates
    // =========================================================================

    /// The guide has started a new goal at `level`.
    pub fn guide_enter(&mut self, level: GoalLevel) {
        self.machine().guide_enter(level);
    }

    /// The guide has started a named exercise.
    ///
    /// The exercise's aggregate performance is added to the participant
    /// history when its feedback is given.
    pub fn start_exercise(&mut self, name: &str) {
        self.exercise = Some(name.to_string());
        self.machine().guide_enter(GoalLevel::Exercise);
    }

    /// The guide has observed one action.
    pub fn observe_action(&mut self, action: GuideAction) {
        self.machine().observe_action(action);
    }

    /// Whether the current set is long enough to end.
    pub fn end_set(&mut self) -> bool {
        self.machine().end_set_event()
    }

    /// Whether the configured session duration has passed since `start`.
    pub fn duration_reached(&self, start: u32) -> bool {
        crate::core::duration_reached(self.state.session_time, start, self.config.session.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Behaviour, Blackboard, PerformanceLevel, PolicyTables, TablePolicy, BEHAVIOUR_COUNT,
        START_STATES,
    };
    use crate::journal::JournalLogger;
    use crate::storage::{MemoryHistoryStore, ParticipantHistory};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn runner(history: Arc<MemoryHistoryStore>) -> CoachRunner<TablePolicy, Arc<MemoryHistoryStore>> {
        let policy = TablePolicy::uniform(START_STATES[11] + 1, Some(7)).unwrap();
        CoachRunner::new(Config::default(), policy, history)
    }

    fn fixed_runner(behaviour: Behaviour) -> CoachRunner<TablePolicy, MemoryHistoryStore> {
        let mut row = vec![0.0; BEHAVIOUR_COUNT];
        row[behaviour.index()] = 1.0;
        let tables = PolicyTables {
            actions: vec![row],
            transitions: Vec::new(),
        };
        let policy = TablePolicy::new(tables, Some(0)).unwrap();
        let mut runner = CoachRunner::new(Config::default(), policy, MemoryHistoryStore::new());
        runner.begin_session("P10", 1, Some(0)).unwrap();
        runner
    }

    fn good_action() -> GuideAction {
        GuideAction {
            performance: PerformanceLevel::Good,
            score: 0.9,
            target: 0.8,
        }
    }

    #[test]
    fn test_begin_session_creates_history() {
        let history = Arc::new(MemoryHistoryStore::new());
        let mut runner = runner(Arc::clone(&history));

        let start = runner.begin_session("P01", 1, None).unwrap();
        assert_eq!(start, START_STATES[8]);
        assert!(history.exists("P01").unwrap());
        assert_eq!(runner.state().tracking, Some(GoalLevel::Person));
        assert_eq!(runner.board().get(keys::STATE), Some(&json!(start)));
        assert_eq!(runner.board().get(keys::FEEDBACK_STATE), Some(&json!(start)));
    }

    #[test]
    fn test_begin_session_loads_previous_performance() {
        let mut previous = ParticipantHistory::new("P02");
        previous.record_session(PerformanceLevel::Slow);
        let history = Arc::new(MemoryHistoryStore::with_records(vec![previous]));
        let mut runner = runner(history);

        let start = runner.begin_session("P02", 5, None).unwrap();
        assert_eq!(start, START_STATES[3]);
        assert_eq!(
            runner.state().previous_session_performance,
            Some(PerformanceLevel::Slow)
        );
    }

    #[test]
    fn test_person_start_cycle_decides() {
        let mut runner = runner(Arc::new(MemoryHistoryStore::new()));
        runner.begin_session("P03", 1, Some(0)).unwrap();

        let outcome = runner.cycle(GoalLevel::Person).unwrap();
        let decision = outcome.decision().unwrap();
        assert_eq!(decision.context.goal, GoalLevel::Person);
        assert_eq!(decision.context.phase, Phase::Start);
        assert_ne!(decision.behaviour, Behaviour::Start);
    }

    #[test]
    fn test_cycle_waits_for_guide() {
        let mut runner = runner(Arc::new(MemoryHistoryStore::new()));
        runner.begin_session("P04", 1, None).unwrap();
        assert_eq!(runner.cycle(GoalLevel::Exercise).unwrap(), CycleOutcome::Waiting);
    }

    #[test]
    fn test_action_cycle_is_feedback() {
        let mut runner = runner(Arc::new(MemoryHistoryStore::new()));
        runner.begin_session("P05", 1, None).unwrap();
        runner.observe_action(good_action());

        let outcome = runner.cycle(GoalLevel::Action).unwrap();
        let decision = outcome.decision().unwrap();
        assert_eq!(decision.context.phase, Phase::End);
        assert_eq!(decision.context.performance, Some(PerformanceLevel::Good));
        assert_eq!(runner.state().tracking, Some(GoalLevel::Set));
    }

    #[test]
    fn test_subgoals_written_to_board_and_journal() {
        let dir = TempDir::new().unwrap();
        let journal = JournalLogger::new(dir.path().join("journal.jsonl"));
        let mut runner = runner(Arc::new(MemoryHistoryStore::new()))
            .with_journal(Some(journal.clone()));
        runner.begin_session("P07", 1, None).unwrap();

        assert_eq!(runner.create_subgoal(GoalLevel::Person).unwrap(), GoalLevel::Session);
        assert_eq!(runner.board().get(keys::NEW_GOAL), Some(&json!("session")));
        assert!(runner.create_subgoal(GoalLevel::Action).is_err());

        let ended = runner.end_subgoal(GoalLevel::Session).unwrap();
        assert!(ended.feedback_owed);

        let names: Vec<_> = journal
            .read_all()
            .unwrap()
            .into_iter()
            .map(|e| e.data.event_name())
            .collect();
        assert_eq!(names, vec!["session_started", "subgoal_created", "subgoal_ended"]);
    }

    #[test]
    fn test_end_set_thresholds() {
        let mut runner = runner(Arc::new(MemoryHistoryStore::new()));
        runner.begin_session("P08", 1, None).unwrap();
        for _ in 0..9 {
            runner.observe_action(good_action());
        }
        assert!(!runner.end_set());
        runner.observe_action(good_action());
        assert!(runner.end_set());
    }

    #[test]
    fn test_duration_reached_uses_config() {
        let mut runner = runner(Arc::new(MemoryHistoryStore::new()));
        runner.begin_session("P09", 1, None).unwrap();
        assert!(!runner.duration_reached(0));
        runner.state.session_time = 2;
        assert!(runner.duration_reached(0));
        assert!(!runner.duration_reached(1));
    }

    #[test]
    fn test_pre_instruction_resets_repetition_round() {
        let mut runner = fixed_runner(Behaviour::PreInstructionQuestioning);
        runner.create_subgoal(GoalLevel::Person).unwrap();
        assert_eq!(runner.cycle(GoalLevel::Session).unwrap(), CycleOutcome::Waiting);

        let session = runner.cycle(GoalLevel::Session).unwrap();
        let session = session.decision().unwrap();
        assert_eq!(session.behaviour, Behaviour::PreInstructionQuestioning);
        assert!(runner.state().used_behaviours.is_empty());

        runner.create_subgoal(GoalLevel::Session).unwrap();
        runner.start_exercise("forehand");
        let exercise = runner.cycle(GoalLevel::Exercise).unwrap();
        let exercise = exercise.decision().unwrap();
        assert_eq!(exercise.context.goal, GoalLevel::Exercise);
        assert!(!exercise.suppressed);
        assert_eq!(exercise.behaviour, Behaviour::PreInstructionQuestioning);
    }

    #[test]
    fn test_repeat_of_other_category_still_suppressed() {
        let mut runner = fixed_runner(Behaviour::PostInstructionPositive);
        runner.create_subgoal(GoalLevel::Person).unwrap();
        runner.cycle(GoalLevel::Session).unwrap();

        let first = runner.cycle(GoalLevel::Session).unwrap();
        assert!(!first.decision().unwrap().suppressed);
        assert_eq!(runner.state().used_behaviours, vec![Behaviour::PostInstructionPositive]);

        runner.create_subgoal(GoalLevel::Session).unwrap();
        runner.start_exercise("forehand");
        let second = runner.cycle(GoalLevel::Exercise).unwrap();
        let second = second.decision().unwrap();
        assert!(second.suppressed);
        assert_eq!(second.behaviour, Behaviour::PreInstruction);
        assert!(runner.state().used_behaviours.is_empty());
    }

    #[test]
    fn test_exhausted_resolution_fails_only_the_cycle() {
        let mut runner = fixed_runner(Behaviour::Scold);

        let outcome = runner.cycle(GoalLevel::Person).unwrap();
        assert!(matches!(outcome, CycleOutcome::Failed(ref reason) if reason.contains("exhausted")));
        assert!(outcome.decision().is_none());

        runner.create_subgoal(GoalLevel::Person).unwrap();
        runner.observe_action(good_action());
        let action = runner.cycle(GoalLevel::Action).unwrap();
        assert_eq!(action.decision().unwrap().behaviour, Behaviour::Silence);
    }
}

//! Simulate command.
//!
//! Runs a full coaching session against a simulated guide: the participant
//! performs randomly drawn actions and the engine decides every behaviour
//! from the Person introduction through to the Person farewell. The session
//! performance is recorded in the participant's history as in a live run.

use std::path::PathBuf;

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::config::Config;
use crate::core::{
    Behaviour, GoalLevel, GuideAction, PerformanceLevel, Phase, Resolution, TablePolicy,
    START_STATES,
};
use crate::error::{CoachError, Result};
use crate::runner::{CoachRunner, CycleOutcome};
use crate::storage::HistoryStore;

/// Simulated participant: how often each performance level comes up.
const PERFORMANCE_WEIGHTS: [(PerformanceLevel, u32); 5] = [
    (PerformanceLevel::Good, 5),
    (PerformanceLevel::Fast, 2),
    (PerformanceLevel::Slow, 2),
    (PerformanceLevel::VeryFast, 1),
    (PerformanceLevel::VerySlow, 1),
];

/// Actions in one set can never exceed this, whatever the config says.
const MAX_ACTIONS_PER_SET: u32 = 1000;

/// Options for the simulate command.
#[derive(Debug, Clone, Default)]
pub struct SimulateOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Participant impairment score; 4 or more counts as experienced.
    pub impairment: u32,
    /// Force a coaching style instead of the experience default.
    pub style: Option<usize>,
    /// Number of exercises; defaults to the configured session duration.
    pub exercises: Option<u32>,
    /// Seed for both the policy and the simulated participant.
    pub seed: Option<u64>,
    /// Policy tables; overrides the configured tables.
    pub policy: Option<PathBuf>,
}

/// One decision as reported by the simulation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DecisionRecord {
    pub goal: GoalLevel,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceLevel>,
    pub behaviour: Behaviour,
    pub resolution: Resolution,
    pub suppressed: bool,
}

/// Output format for the simulate command.
#[derive(Debug, Clone, Serialize)]
pub struct SimulateOutput {
    pub success: bool,
    pub participant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_state: Option<usize>,
    pub decisions: Vec<DecisionRecord>,
    /// Performance written to the participant history at session end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_performance: Option<PerformanceLevel>,
    pub sessions_recorded: usize,
    /// Cues where no behaviour could be chosen.
    pub failed_cues: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SimulateOutput {
    pub fn failure(participant_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            participant_id: participant_id.into(),
            start_state: None,
            decisions: Vec::new(),
            session_performance: None,
            sessions_recorded: 0,
            failed_cues: 0,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Simulation failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![format!(
            "Session for {} (start state {}):",
            self.participant_id,
            self.start_state.map(|s| s.to_string()).unwrap_or_default()
        )];
        lines.push(String::new());
        lines.push(format!(
            "{:<9} {:<6} {:<11} {}",
            "GOAL", "PHASE", "PERFORMANCE", "BEHAVIOUR"
        ));
        lines.push("-".repeat(60));
        for decision in &self.decisions {
            let mut behaviour = decision.behaviour.to_string();
            if decision.suppressed {
                behaviour.push_str(" (repeat suppressed)");
            } else if decision.resolution != Resolution::Sampled {
                behaviour.push_str(&format!(" ({:?})", decision.resolution).to_lowercase());
            }
            lines.push(format!(
                "{:<9} {:<6} {:<11} {}",
                decision.goal.name(),
                decision.phase.to_string(),
                decision.performance.map(|p| p.name()).unwrap_or("-"),
                behaviour
            ));
        }
        lines.push(String::new());
        lines.push(format!(
            "{} decisions; session performance {}; {} sessions on record.",
            self.decisions.len(),
            self.session_performance.map(|p| p.name()).unwrap_or("-"),
            self.sessions_recorded
        ));
        if self.failed_cues > 0 {
            lines.push(format!("{} cues failed to choose a behaviour.", self.failed_cues));
        }
        lines.join("\n")
    }
}

/// The simulate command implementation.
pub struct SimulateCommand<H: HistoryStore> {
    store: H,
    config: Config,
}

impl<H: HistoryStore> SimulateCommand<H> {
    pub fn new(store: H, config: Config) -> Self {
        Self { store, config }
    }

    /// Run one simulated session for `participant_id`.
    pub fn run(&self, participant_id: &str, options: &SimulateOptions) -> SimulateOutput {
        match self.simulate(participant_id, options) {
            Ok(output) => output,
            Err(e) => SimulateOutput::failure(participant_id, e.to_string()),
        }
    }

    fn simulate(&self, participant_id: &str, options: &SimulateOptions) -> Result<SimulateOutput> {
        let mut config = self.config.clone();
        if let Some(exercises) = options.exercises {
            config.session.duration = exercises;
        }
        config.validate()?;

        let seed = options.seed.or(config.policy.seed);
        let tables = options.policy.clone().or_else(|| config.policy.tables.clone());
        let policy = match &tables {
            Some(path) => TablePolicy::load(path, seed)?,
            None => TablePolicy::uniform(START_STATES[START_STATES.len() - 1] + 1, seed)?,
        };

        let participant_rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let performance_dist = WeightedIndex::new(PERFORMANCE_WEIGHTS.iter().map(|(_, w)| *w))
            .map_err(|e| CoachError::policy(e.to_string()))?;

        let mut sim = Simulation {
            runner: CoachRunner::new(config, policy, &self.store),
            rng: participant_rng,
            performance_dist,
            decisions: Vec::new(),
            session_performance: None,
            failed_cues: 0,
        };

        let start_state = sim
            .runner
            .begin_session(participant_id, options.impairment, options.style)?;
        sim.run_session()?;

        let sessions_recorded = self
            .store
            .get(participant_id)?
            .map(|h| h.session_count())
            .unwrap_or(0);

        Ok(SimulateOutput {
            success: true,
            participant_id: participant_id.to_string(),
            start_state: Some(start_state),
            decisions: sim.decisions,
            session_performance: sim.session_performance,
            sessions_recorded,
            failed_cues: sim.failed_cues,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SimulateOutput, options: &SimulateOptions) -> String {
        if options.quiet {
            return String::new();
        }
        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            output.format_text()
        }
    }
}

/// Simulated guide driving one runner.
struct Simulation<'s, H: HistoryStore> {
    runner: CoachRunner<TablePolicy, &'s H>,
    rng: StdRng,
    performance_dist: WeightedIndex<u32>,
    decisions: Vec<DecisionRecord>,
    session_performance: Option<PerformanceLevel>,
    failed_cues: usize,
}

impl<H: HistoryStore> Simulation<'_, H> {
    fn run_session(&mut self) -> Result<()> {
        self.cue(GoalLevel::Person)?;
        self.runner.create_subgoal(GoalLevel::Person)?;
        // the first session cue only loads the previous session's performance
        self.cue(GoalLevel::Session)?;
        self.cue(GoalLevel::Session)?;

        let mut exercise = 0;
        loop {
            exercise += 1;
            self.runner.create_subgoal(GoalLevel::Session)?;
            self.runner.start_exercise(&format!("exercise-{}", exercise));
            self.cue(GoalLevel::Exercise)?;
            self.run_exercise()?;
            self.cue(GoalLevel::Exercise)?;
            self.runner.end_subgoal(GoalLevel::Exercise)?;
            if self.runner.duration_reached(0) {
                break;
            }
        }

        self.cue(GoalLevel::Session)?;
        self.runner.end_subgoal(GoalLevel::Session)?;
        self.cue(GoalLevel::Person)?;
        self.runner.end_subgoal(GoalLevel::Person)?;
        Ok(())
    }

    /// Sets until the exercise owes feedback.
    fn run_exercise(&mut self) -> Result<()> {
        loop {
            self.runner.create_subgoal(GoalLevel::Exercise)?;
            self.cue(GoalLevel::Set)?;
            self.runner.create_subgoal(GoalLevel::Set)?;

            let mut actions = 0;
            loop {
                let action = self.next_action();
                self.runner.observe_action(action);
                self.cue(GoalLevel::Action)?;
                self.runner.end_subgoal(GoalLevel::Action)?;
                actions += 1;
                if self.runner.end_set() || actions >= MAX_ACTIONS_PER_SET {
                    break;
                }
                self.runner.create_subgoal(GoalLevel::Set)?;
            }

            self.cue(GoalLevel::Set)?;
            if self.runner.end_subgoal(GoalLevel::Set)?.feedback_owed {
                return Ok(());
            }
        }
    }

    fn next_action(&mut self) -> GuideAction {
        let (performance, _) = PERFORMANCE_WEIGHTS[self.performance_dist.sample(&mut self.rng)];
        GuideAction {
            performance,
            score: self.rng.gen_range(0.0..=1.0),
            target: self.runner.config().session.default_target,
        }
    }

    fn cue(&mut self, level: GoalLevel) -> Result<()> {
        match self.runner.cycle(level)? {
            CycleOutcome::Waiting => {
                tracing::debug!("{} cue waiting on the guide", level);
            }
            // the guide moves on; the goal level goes without a behaviour
            CycleOutcome::Failed(reason) => {
                tracing::warn!("{} cue abandoned: {}", level, reason);
                self.failed_cues += 1;
            }
            CycleOutcome::Decided(decision) => {
                if level == GoalLevel::Session && decision.context.phase == Phase::End {
                    self.session_performance = decision.context.performance;
                }
                self.decisions.push(DecisionRecord {
                    goal: decision.context.goal,
                    phase: decision.context.phase,
                    performance: decision.context.performance,
                    behaviour: decision.behaviour,
                    resolution: decision.resolution,
                    suppressed: decision.suppressed,
                });
            }
        }
        Ok(())
    }
}

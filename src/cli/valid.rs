//! Valid command.
//!
//! Lists the behaviours the policy wrapper accepts for a goal level, phase
//! and performance, or checks a single behaviour against them.

use serde::Serialize;

use crate::core::{is_valid, valid_behaviours, Behaviour, GoalLevel, PerformanceLevel, Phase};

/// Options for the valid command.
#[derive(Debug, Clone, Default)]
pub struct ValidOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Performance of the last action or aggregate.
    pub performance: Option<String>,
    /// Check this behaviour instead of listing the set.
    pub behaviour: Option<String>,
}

/// Output format for the valid command.
#[derive(Debug, Clone, Serialize)]
pub struct ValidOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<GoalLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceLevel>,
    pub behaviours: Vec<Behaviour>,
    /// Verdict for a checked behaviour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<CheckedBehaviour>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single behaviour and whether it is valid.
#[derive(Debug, Clone, Serialize)]
pub struct CheckedBehaviour {
    pub behaviour: Behaviour,
    pub valid: bool,
}

impl ValidOutput {
    pub fn success(
        goal: GoalLevel,
        phase: Phase,
        performance: Option<PerformanceLevel>,
        behaviours: Vec<Behaviour>,
        checked: Option<CheckedBehaviour>,
    ) -> Self {
        Self {
            success: true,
            goal: Some(goal),
            phase: Some(phase),
            performance,
            behaviours,
            checked,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            goal: None,
            phase: None,
            performance: None,
            behaviours: Vec::new(),
            checked: None,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Valid failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        let context = format!(
            "{} {}{}",
            self.goal.map(GoalLevel::name).unwrap_or("-"),
            self.phase.map(|p| p.to_string()).unwrap_or_default(),
            self.performance
                .map(|p| format!(" ({})", p))
                .unwrap_or_default()
        );

        if let Some(checked) = &self.checked {
            let verdict = if checked.valid { "valid" } else { "not valid" };
            return format!("{} is {} for {}", checked.behaviour, verdict, context);
        }

        let mut lines = vec![format!(
            "Valid behaviours for {} ({}):",
            context,
            self.behaviours.len()
        )];
        lines.extend(self.behaviours.iter().map(|b| format!("  {}", b)));
        lines.join("\n")
    }
}

/// The valid command implementation.
#[derive(Debug, Default)]
pub struct ValidCommand;

impl ValidCommand {
    pub fn new() -> Self {
        Self
    }

    /// Run the valid command for a goal level and phase name.
    pub fn run(&self, goal: &str, phase: &str, options: &ValidOptions) -> ValidOutput {
        let Some(goal) = GoalLevel::parse(goal) else {
            return ValidOutput::failure(format!("unknown goal level '{}'", goal));
        };
        let Some(phase) = Phase::parse(phase) else {
            return ValidOutput::failure(format!("unknown phase '{}'", phase));
        };
        let performance = match options.performance.as_deref() {
            None => None,
            Some(name) => match PerformanceLevel::parse(name) {
                Some(level) => Some(level),
                None => {
                    return ValidOutput::failure(format!("unknown performance level '{}'", name))
                }
            },
        };

        let checked = match options.behaviour.as_deref() {
            None => None,
            Some(name) => match Behaviour::parse(name) {
                Some(behaviour) => Some(CheckedBehaviour {
                    behaviour,
                    valid: is_valid(behaviour, goal, performance, phase),
                }),
                None => return ValidOutput::failure(format!("unknown behaviour '{}'", name)),
            },
        };

        let behaviours = valid_behaviours(goal, performance, phase).into_iter().collect();
        ValidOutput::success(goal, phase, performance, behaviours, checked)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ValidOutput, options: &ValidOptions) -> String {
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

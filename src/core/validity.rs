//! Validity rules.
//!
//! Which behaviours may be emitted for a given goal level, phase and
//! performance. The whitelist is assembled from fixed slices; nothing here
//! has side effects.

use std::collections::BTreeSet;

use crate::core::behaviour::Behaviour;
use crate::core::goal::{GoalLevel, PerformanceLevel, Phase};

use Behaviour as B;

const PERSON_START: &[Behaviour] = &[B::PreInstruction, B::PreInstructionFirstName];

/// Feedback available at Session, Exercise and Set in either phase.
const FEEDBACK_BASE: &[Behaviour] = &[
    B::PostInstructionPositive,
    B::PostInstructionNegative,
    B::Questioning,
    B::PostInstructionPositiveQuestioning,
    B::PostInstructionPositiveFirstName,
    B::PostInstructionNegativeQuestioning,
    B::QuestioningFirstName,
    B::PostInstructionNegativeFirstName,
    B::QuestioningPositiveModeling,
    B::PositiveModelingQuestioning,
    B::PostInstructionPositivePositiveModeling,
    B::PostInstructionPositiveNegativeModeling,
    B::PostInstructionNegativePositiveModeling,
    B::PostInstructionNegativeNegativeModeling,
    B::QuestioningNegativeModeling,
    B::PositiveModelingPostInstructionPositive,
    B::NegativeModelingPostInstructionNegative,
];

const PRE_INSTRUCTION: &[Behaviour] = &[
    B::PreInstruction,
    B::PreInstructionQuestioning,
    B::PreInstructionFirstName,
    B::PreInstructionPositiveModeling,
    B::PreInstructionNegativeModeling,
    B::PositiveModelingPreInstruction,
];

const FEEDBACK_PRAISE: &[Behaviour] = &[B::Praise, B::PraiseFirstName, B::PositiveModelingPraise];

const FEEDBACK_CORRECTIVE: &[Behaviour] =
    &[B::Scold, B::Console, B::ScoldFirstName, B::ConsoleFirstName];

const ACTION_BASE: &[Behaviour] = &[
    B::Silence,
    B::ConcurrentInstructionPositive,
    B::Questioning,
    B::PositiveModeling,
    B::Hustle,
    B::ConcurrentInstructionPositiveQuestioning,
    B::ConcurrentInstructionPositiveFirstName,
    B::QuestioningFirstName,
    B::HustleFirstName,
    B::ConcurrentInstructionPositivePositiveModeling,
    B::PositiveModelingHustle,
    B::PositiveModelingConcurrentInstructionPositive,
];

const ACTION_PRAISE: &[Behaviour] = &[
    B::Praise,
    B::PraiseFirstName,
    B::ConcurrentInstructionPositivePraise,
    B::PositiveModelingPraise,
];

const ACTION_CORRECTIVE: &[Behaviour] = &[
    B::ConcurrentInstructionNegative,
    B::NegativeModeling,
    B::Scold,
    B::Console,
    B::QuestioningNegativeModeling,
    B::ScoldPositiveModeling,
    B::ScoldFirstName,
    B::ConsoleFirstName,
    B::ConcurrentInstructionNegativeNegativeModeling,
    B::ConcurrentInstructionNegativeFirstName,
];

/// The set of behaviours that may be emitted in this context.
///
/// `performance` is `None` before the guide has reported anything; only the
/// base families apply then. The Action level ignores `phase`.
pub fn valid_behaviours(
    goal: GoalLevel,
    performance: Option<PerformanceLevel>,
    phase: Phase,
) -> BTreeSet<Behaviour> {
    let mut valid = BTreeSet::new();

    match goal {
        GoalLevel::Person => match phase {
            Phase::Start => valid.extend(PERSON_START),
            Phase::End => {
                valid.insert(B::End);
            }
        },
        GoalLevel::Session | GoalLevel::Exercise | GoalLevel::Set => {
            valid.extend(FEEDBACK_BASE);
            match phase {
                Phase::Start => valid.extend(PRE_INSTRUCTION),
                Phase::End if goal == GoalLevel::Session => {
                    valid.insert(B::End);
                }
                Phase::End => {}
            }
            if let Some(perf) = performance {
                if perf.is_good() {
                    valid.extend(FEEDBACK_PRAISE);
                } else if perf.is_off_pace() {
                    valid.extend(FEEDBACK_CORRECTIVE);
                }
            }
        }
        GoalLevel::Action => {
            valid.extend(ACTION_BASE);
            if let Some(perf) = performance {
                if perf.is_good() {
                    valid.extend(ACTION_PRAISE);
                } else if perf.is_off_pace() {
                    valid.extend(ACTION_CORRECTIVE);
                }
            }
        }
    }

    valid
}

/// Whether `behaviour` may be emitted in this context.
pub fn is_valid(
    behaviour: Behaviour,
    goal: GoalLevel,
    performance: Option<PerformanceLevel>,
    phase: Phase,
) -> bool {
    valid_behaviours(goal, performance, phase).contains(&behaviour)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_start() {
        let valid = valid_behaviours(GoalLevel::Person, None, Phase::Start);
        assert_eq!(
            valid.into_iter().collect::<Vec<_>>(),
            vec![B::PreInstruction, B::PreInstructionFirstName]
        );
    }

    #[test]
    fn test_person_end_is_only_end() {
        for perf in PerformanceLevel::ALL {
            let valid = valid_behaviours(GoalLevel::Person, Some(perf), Phase::End);
            assert_eq!(valid.len(), 1);
            assert!(valid.contains(&B::End));
        }
    }

    #[test]
    fn test_session_start_without_performance() {
        let valid = valid_behaviours(GoalLevel::Session, None, Phase::Start);
        assert_eq!(valid.len(), FEEDBACK_BASE.len() + PRE_INSTRUCTION.len());
        assert!(valid.contains(&B::PreInstructionQuestioning));
        assert!(!valid.contains(&B::Praise));
        assert!(!valid.contains(&B::End));
    }

    #[test]
    fn test_end_only_valid_at_session_end() {
        assert!(is_valid(B::End, GoalLevel::Session, None, Phase::End));
        assert!(!is_valid(B::End, GoalLevel::Exercise, None, Phase::End));
        assert!(!is_valid(B::End, GoalLevel::Set, None, Phase::End));
        assert!(!is_valid(B::End, GoalLevel::Session, None, Phase::Start));
    }

    #[test]
    fn test_pre_instruction_only_at_start() {
        assert!(is_valid(B::PreInstruction, GoalLevel::Set, None, Phase::Start));
        assert!(!is_valid(B::PreInstruction, GoalLevel::Set, None, Phase::End));
    }

    #[test]
    fn test_good_unlocks_praise_at_set() {
        let valid = valid_behaviours(GoalLevel::Set, Some(PerformanceLevel::Good), Phase::End);
        for b in FEEDBACK_PRAISE {
            assert!(valid.contains(b));
        }
        assert!(!valid.contains(&B::Scold));
    }

    #[test]
    fn test_off_pace_unlocks_corrective_at_exercise() {
        for perf in [PerformanceLevel::Fast, PerformanceLevel::Slow] {
            let valid = valid_behaviours(GoalLevel::Exercise, Some(perf), Phase::Start);
            assert!(valid.contains(&B::ConsoleFirstName));
            assert!(!valid.contains(&B::Praise));
        }
    }

    #[test]
    fn test_other_levels_leave_only_base_set() {
        let base = valid_behaviours(GoalLevel::Set, None, Phase::End);
        for perf in [
            PerformanceLevel::VeryFast,
            PerformanceLevel::VerySlow,
            PerformanceLevel::Inaccurate,
            PerformanceLevel::Incomplete,
            PerformanceLevel::Unmeasured,
        ] {
            assert_eq!(valid_behaviours(GoalLevel::Set, Some(perf), Phase::End), base);
        }
    }

    #[test]
    fn test_action_ignores_phase() {
        for perf in PerformanceLevel::ALL {
            assert_eq!(
                valid_behaviours(GoalLevel::Action, Some(perf), Phase::Start),
                valid_behaviours(GoalLevel::Action, Some(perf), Phase::End)
            );
        }
    }

    #[test]
    fn test_action_families() {
        let base = valid_behaviours(GoalLevel::Action, None, Phase::Start);
        assert_eq!(base.len(), ACTION_BASE.len());

        let good = valid_behaviours(GoalLevel::Action, Some(PerformanceLevel::Good), Phase::Start);
        assert_eq!(good.len(), ACTION_BASE.len() + ACTION_PRAISE.len());
        assert!(good.contains(&B::ConcurrentInstructionPositivePraise));

        let slow = valid_behaviours(GoalLevel::Action, Some(PerformanceLevel::Slow), Phase::Start);
        assert_eq!(slow.len(), ACTION_BASE.len() + ACTION_CORRECTIVE.len());
        assert!(slow.contains(&B::ConcurrentInstructionNegativeFirstName));
    }

    #[test]
    fn test_manual_manipulation_never_valid() {
        for goal in GoalLevel::ALL {
            for phase in [Phase::Start, Phase::End] {
                let valid = valid_behaviours(goal, Some(PerformanceLevel::Slow), phase);
                assert!(!valid.contains(&B::ManualManipulation));
                assert!(!valid.contains(&B::ManualManipulationPraise));
            }
        }
    }

    #[test]
    fn test_start_marker_never_valid() {
        for goal in GoalLevel::ALL {
            for perf in PerformanceLevel::ALL {
                assert!(!is_valid(B::Start, goal, Some(perf), Phase::Start));
                assert!(!is_valid(B::Start, goal, Some(perf), Phase::End));
            }
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_performance() -> impl Strategy<Value = Option<PerformanceLevel>> {
            prop_oneof![
                Just(None),
                (0usize..PerformanceLevel::ALL.len()).prop_map(|i| Some(PerformanceLevel::ALL[i])),
            ]
        }

        fn arb_phase() -> impl Strategy<Value = Phase> {
            prop_oneof![Just(Phase::Start), Just(Phase::End)]
        }

        fn arb_goal() -> impl Strategy<Value = GoalLevel> {
            (0usize..GoalLevel::ALL.len()).prop_map(|i| GoalLevel::ALL[i])
        }

        proptest! {
            #[test]
            fn silence_always_valid_at_action(perf in arb_performance(), phase in arb_phase()) {
                prop_assert!(is_valid(B::Silence, GoalLevel::Action, perf, phase));
            }

            #[test]
            fn valid_set_is_never_empty(
                goal in arb_goal(),
                perf in arb_performance(),
                phase in arb_phase(),
            ) {
                prop_assert!(!valid_behaviours(goal, perf, phase).is_empty());
            }

            #[test]
            fn performance_only_adds(
                goal in arb_goal(),
                perf in arb_performance(),
                phase in arb_phase(),
            ) {
                let base = valid_behaviours(goal, None, phase);
                let with_perf = valid_behaviours(goal, perf, phase);
                prop_assert!(base.is_subset(&with_perf));
            }
        }
    }
}

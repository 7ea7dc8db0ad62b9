//! Behaviour catalog.
//!
//! Every coaching behaviour the policy can emit, the sixteen observation
//! categories they belong to, and the fixed table that folds
//! manual-manipulation compounds back to their base behaviour.
//!
//! A behaviour's position in [`Behaviour::ALL`] is its column index in the
//! policy tables, so the declaration order below is part of the table format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A coaching behaviour: an atomic cue, a session marker, or a pairwise
/// combination of two atomic cues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Behaviour {
    // Markers
    Start,
    End,
    Silence,

    // Atomic cues
    PreInstruction,
    ConcurrentInstructionPositive,
    ConcurrentInstructionNegative,
    PostInstructionPositive,
    PostInstructionNegative,
    ManualManipulation,
    Questioning,
    PositiveModeling,
    NegativeModeling,
    FirstName,
    Hustle,
    Praise,
    Scold,
    Console,

    // Pre-instruction combinations
    PreInstructionFirstName,
    PreInstructionQuestioning,
    PreInstructionPositiveModeling,
    PreInstructionNegativeModeling,
    PreInstructionPraise,
    PreInstructionManualManipulation,
    PositiveModelingPreInstruction,
    ManualManipulationPreInstruction,

    // Post-instruction combinations
    PostInstructionPositiveQuestioning,
    PostInstructionPositiveFirstName,
    PostInstructionPositivePositiveModeling,
    PostInstructionPositiveNegativeModeling,
    PostInstructionPositiveManualManipulation,
    PositiveModelingPostInstructionPositive,
    ManualManipulationPostInstructionPositive,
    PostInstructionNegativeQuestioning,
    PostInstructionNegativeFirstName,
    PostInstructionNegativePositiveModeling,
    PostInstructionNegativeNegativeModeling,
    PostInstructionNegativeManualManipulation,
    NegativeModelingPostInstructionNegative,
    ManualManipulationPostInstructionNegative,

    // Questioning combinations
    QuestioningFirstName,
    QuestioningPositiveModeling,
    QuestioningNegativeModeling,
    PositiveModelingQuestioning,
    ManualManipulationQuestioning,

    // Concurrent-instruction combinations
    ConcurrentInstructionPositiveQuestioning,
    ConcurrentInstructionPositiveFirstName,
    ConcurrentInstructionPositivePositiveModeling,
    ConcurrentInstructionPositivePraise,
    ConcurrentInstructionPositiveManualManipulation,
    PositiveModelingConcurrentInstructionPositive,
    ManualManipulationConcurrentInstructionPositive,
    ConcurrentInstructionNegativeNegativeModeling,
    ConcurrentInstructionNegativeFirstName,
    ConcurrentInstructionNegativeManualManipulation,
    ManualManipulationConcurrentInstructionNegative,

    // Praise, scold, console and hustle combinations
    PraiseFirstName,
    PositiveModelingPraise,
    ManualManipulationPraise,
    ScoldFirstName,
    ScoldPositiveModeling,
    ConsoleFirstName,
    ManualManipulationConsole,
    HustleFirstName,
    PositiveModelingHustle,
    ManualManipulationHustle,
    ManualManipulationPositiveModeling,
    ManualManipulationFirstName,
}

/// Number of behaviours in the catalog (policy table width).
pub const BEHAVIOUR_COUNT: usize = 67;

/// The sixteen categories of the coaching observation instrument.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PreInstruction,
    ConcurrentInstructionPositive,
    ConcurrentInstructionNegative,
    PostInstructionPositive,
    PostInstructionNegative,
    ManualManipulation,
    Questioning,
    PositiveModeling,
    NegativeModeling,
    FirstName,
    Hustle,
    Praise,
    Scold,
    Console,
    Silence,
    End,
}

impl Category {
    /// All categories.
    pub const ALL: [Category; 16] = [
        Category::PreInstruction,
        Category::ConcurrentInstructionPositive,
        Category::ConcurrentInstructionNegative,
        Category::PostInstructionPositive,
        Category::PostInstructionNegative,
        Category::ManualManipulation,
        Category::Questioning,
        Category::PositiveModeling,
        Category::NegativeModeling,
        Category::FirstName,
        Category::Hustle,
        Category::Praise,
        Category::Scold,
        Category::Console,
        Category::Silence,
        Category::End,
    ];

    /// Every behaviour that is a member of this category.
    pub fn members(self) -> Vec<Behaviour> {
        Behaviour::ALL
            .iter()
            .copied()
            .filter(|b| b.is_in(self))
            .collect()
    }

    /// The single atomic behaviour that names this category.
    pub fn base_behaviour(self) -> Behaviour {
        match self {
            Category::PreInstruction => Behaviour::PreInstruction,
            Category::ConcurrentInstructionPositive => Behaviour::ConcurrentInstructionPositive,
            Category::ConcurrentInstructionNegative => Behaviour::ConcurrentInstructionNegative,
            Category::PostInstructionPositive => Behaviour::PostInstructionPositive,
            Category::PostInstructionNegative => Behaviour::PostInstructionNegative,
            Category::ManualManipulation => Behaviour::ManualManipulation,
            Category::Questioning => Behaviour::Questioning,
            Category::PositiveModeling => Behaviour::PositiveModeling,
            Category::NegativeModeling => Behaviour::NegativeModeling,
            Category::FirstName => Behaviour::FirstName,
            Category::Hustle => Behaviour::Hustle,
            Category::Praise => Behaviour::Praise,
            Category::Scold => Behaviour::Scold,
            Category::Console => Behaviour::Console,
            Category::Silence => Behaviour::Silence,
            Category::End => Behaviour::End,
        }
    }
}

/// Manual-manipulation compounds and the base behaviour they collapse to
/// when the policy keeps proposing them in a context that forbids them.
pub const CANONICAL_FORMS: &[(Behaviour, Behaviour)] = &[
    (Behaviour::ManualManipulationQuestioning, Behaviour::Questioning),
    (Behaviour::ManualManipulationPreInstruction, Behaviour::PreInstruction),
    (Behaviour::PreInstructionManualManipulation, Behaviour::PreInstruction),
    (Behaviour::ManualManipulationPositiveModeling, Behaviour::PositiveModeling),
    (
        Behaviour::ManualManipulationConcurrentInstructionNegative,
        Behaviour::ConcurrentInstructionNegative,
    ),
    (
        Behaviour::ConcurrentInstructionNegativeManualManipulation,
        Behaviour::ConcurrentInstructionNegative,
    ),
    (
        Behaviour::ManualManipulationConcurrentInstructionPositive,
        Behaviour::ConcurrentInstructionPositive,
    ),
    (
        Behaviour::ConcurrentInstructionPositiveManualManipulation,
        Behaviour::ConcurrentInstructionPositive,
    ),
    (Behaviour::ManualManipulationConsole, Behaviour::Console),
    (Behaviour::ManualManipulationFirstName, Behaviour::FirstName),
    (Behaviour::ManualManipulationHustle, Behaviour::Hustle),
    (
        Behaviour::ManualManipulationPostInstructionNegative,
        Behaviour::PostInstructionNegative,
    ),
    (
        Behaviour::PostInstructionNegativeManualManipulation,
        Behaviour::PostInstructionNegative,
    ),
    (
        Behaviour::ManualManipulationPostInstructionPositive,
        Behaviour::PostInstructionPositive,
    ),
    (
        Behaviour::PostInstructionPositiveManualManipulation,
        Behaviour::PostInstructionPositive,
    ),
    (Behaviour::ManualManipulationPraise, Behaviour::Praise),
];

impl Behaviour {
    /// The full catalog, in table-index order.
    pub const ALL: [Behaviour; BEHAVIOUR_COUNT] = [
        Behaviour::Start,
        Behaviour::End,
        Behaviour::Silence,
        Behaviour::PreInstruction,
        Behaviour::ConcurrentInstructionPositive,
        Behaviour::ConcurrentInstructionNegative,
        Behaviour::PostInstructionPositive,
        Behaviour::PostInstructionNegative,
        Behaviour::ManualManipulation,
        Behaviour::Questioning,
        Behaviour::PositiveModeling,
        Behaviour::NegativeModeling,
        Behaviour::FirstName,
        Behaviour::Hustle,
        Behaviour::Praise,
        Behaviour::Scold,
        Behaviour::Console,
        Behaviour::PreInstructionFirstName,
        Behaviour::PreInstructionQuestioning,
        Behaviour::PreInstructionPositiveModeling,
        Behaviour::PreInstructionNegativeModeling,
        Behaviour::PreInstructionPraise,
        Behaviour::PreInstructionManualManipulation,
        Behaviour::PositiveModelingPreInstruction,
        Behaviour::ManualManipulationPreInstruction,
        Behaviour::PostInstructionPositiveQuestioning,
        Behaviour::PostInstructionPositiveFirstName,
        Behaviour::PostInstructionPositivePositiveModeling,
        Behaviour::PostInstructionPositiveNegativeModeling,
        Behaviour::PostInstructionPositiveManualManipulation,
        Behaviour::PositiveModelingPostInstructionPositive,
        Behaviour::ManualManipulationPostInstructionPositive,
        Behaviour::PostInstructionNegativeQuestioning,
        Behaviour::PostInstructionNegativeFirstName,
        Behaviour::PostInstructionNegativePositiveModeling,
        Behaviour::PostInstructionNegativeNegativeModeling,
        Behaviour::PostInstructionNegativeManualManipulation,
        Behaviour::NegativeModelingPostInstructionNegative,
        Behaviour::ManualManipulationPostInstructionNegative,
        Behaviour::QuestioningFirstName,
        Behaviour::QuestioningPositiveModeling,
        Behaviour::QuestioningNegativeModeling,
        Behaviour::PositiveModelingQuestioning,
        Behaviour::ManualManipulationQuestioning,
        Behaviour::ConcurrentInstructionPositiveQuestioning,
        Behaviour::ConcurrentInstructionPositiveFirstName,
        Behaviour::ConcurrentInstructionPositivePositiveModeling,
        Behaviour::ConcurrentInstructionPositivePraise,
        Behaviour::ConcurrentInstructionPositiveManualManipulation,
        Behaviour::PositiveModelingConcurrentInstructionPositive,
        Behaviour::ManualManipulationConcurrentInstructionPositive,
        Behaviour::ConcurrentInstructionNegativeNegativeModeling,
        Behaviour::ConcurrentInstructionNegativeFirstName,
        Behaviour::ConcurrentInstructionNegativeManualManipulation,
        Behaviour::ManualManipulationConcurrentInstructionNegative,
        Behaviour::PraiseFirstName,
        Behaviour::PositiveModelingPraise,
        Behaviour::ManualManipulationPraise,
        Behaviour::ScoldFirstName,
        Behaviour::ScoldPositiveModeling,
        Behaviour::ConsoleFirstName,
        Behaviour::ManualManipulationConsole,
        Behaviour::HustleFirstName,
        Behaviour::PositiveModelingHustle,
        Behaviour::ManualManipulationHustle,
        Behaviour::ManualManipulationPositiveModeling,
        Behaviour::ManualManipulationFirstName,
    ];

    /// Column index of this behaviour in the policy tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Behaviour at a table column index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The atomic behaviours this behaviour is made of, in utterance order.
    ///
    /// Atomic behaviours and markers return themselves.
    pub fn components(self) -> &'static [Behaviour] {
        use Behaviour as B;
        match self {
            B::Start => &[B::Start],
            B::End => &[B::End],
            B::Silence => &[B::Silence],
            B::PreInstruction => &[B::PreInstruction],
            B::ConcurrentInstructionPositive => &[B::ConcurrentInstructionPositive],
            B::ConcurrentInstructionNegative => &[B::ConcurrentInstructionNegative],
            B::PostInstructionPositive => &[B::PostInstructionPositive],
            B::PostInstructionNegative => &[B::PostInstructionNegative],
            B::ManualManipulation => &[B::ManualManipulation],
            B::Questioning => &[B::Questioning],
            B::PositiveModeling => &[B::PositiveModeling],
            B::NegativeModeling => &[B::NegativeModeling],
            B::FirstName => &[B::FirstName],
            B::Hustle => &[B::Hustle],
            B::Praise => &[B::Praise],
            B::Scold => &[B::Scold],
            B::Console => &[B::Console],

            B::PreInstructionFirstName => &[B::PreInstruction, B::FirstName],
            B::PreInstructionQuestioning => &[B::PreInstruction, B::Questioning],
            B::PreInstructionPositiveModeling => &[B::PreInstruction, B::PositiveModeling],
            B::PreInstructionNegativeModeling => &[B::PreInstruction, B::NegativeModeling],
            B::PreInstructionPraise => &[B::PreInstruction, B::Praise],
            B::PreInstructionManualManipulation => &[B::PreInstruction, B::ManualManipulation],
            B::PositiveModelingPreInstruction => &[B::PositiveModeling, B::PreInstruction],
            B::ManualManipulationPreInstruction => &[B::ManualManipulation, B::PreInstruction],

            B::PostInstructionPositiveQuestioning => {
                &[B::PostInstructionPositive, B::Questioning]
            }
            B::PostInstructionPositiveFirstName => &[B::PostInstructionPositive, B::FirstName],
            B::PostInstructionPositivePositiveModeling => {
                &[B::PostInstructionPositive, B::PositiveModeling]
            }
            B::PostInstructionPositiveNegativeModeling => {
                &[B::PostInstructionPositive, B::NegativeModeling]
            }
            B::PostInstructionPositiveManualManipulation => {
                &[B::PostInstructionPositive, B::ManualManipulation]
            }
            B::PositiveModelingPostInstructionPositive => {
                &[B::PositiveModeling, B::PostInstructionPositive]
            }
            B::ManualManipulationPostInstructionPositive => {
                &[B::ManualManipulation, B::PostInstructionPositive]
            }
            B::PostInstructionNegativeQuestioning => {
                &[B::PostInstructionNegative, B::Questioning]
            }
            B::PostInstructionNegativeFirstName => &[B::PostInstructionNegative, B::FirstName],
            B::PostInstructionNegativePositiveModeling => {
                &[B::PostInstructionNegative, B::PositiveModeling]
            }
            B::PostInstructionNegativeNegativeModeling => {
                &[B::PostInstructionNegative, B::NegativeModeling]
            }
            B::PostInstructionNegativeManualManipulation => {
                &[B::PostInstructionNegative, B::ManualManipulation]
            }
            B::NegativeModelingPostInstructionNegative => {
                &[B::NegativeModeling, B::PostInstructionNegative]
            }
            B::ManualManipulationPostInstructionNegative => {
                &[B::ManualManipulation, B::PostInstructionNegative]
            }

            B::QuestioningFirstName => &[B::Questioning, B::FirstName],
            B::QuestioningPositiveModeling => &[B::Questioning, B::PositiveModeling],
            B::QuestioningNegativeModeling => &[B::Questioning, B::NegativeModeling],
            B::PositiveModelingQuestioning => &[B::PositiveModeling, B::Questioning],
            B::ManualManipulationQuestioning => &[B::ManualManipulation, B::Questioning],

            B::ConcurrentInstructionPositiveQuestioning => {
                &[B::ConcurrentInstructionPositive, B::Questioning]
            }
            B::ConcurrentInstructionPositiveFirstName => {
                &[B::ConcurrentInstructionPositive, B::FirstName]
            }
            B::ConcurrentInstructionPositivePositiveModeling => {
                &[B::ConcurrentInstructionPositive, B::PositiveModeling]
            }
            B::ConcurrentInstructionPositivePraise => {
                &[B::ConcurrentInstructionPositive, B::Praise]
            }
            B::ConcurrentInstructionPositiveManualManipulation => {
                &[B::ConcurrentInstructionPositive, B::ManualManipulation]
            }
            B::PositiveModelingConcurrentInstructionPositive => {
                &[B::PositiveModeling, B::ConcurrentInstructionPositive]
            }
            B::ManualManipulationConcurrentInstructionPositive => {
                &[B::ManualManipulation, B::ConcurrentInstructionPositive]
            }
            B::ConcurrentInstructionNegativeNegativeModeling => {
                &[B::ConcurrentInstructionNegative, B::NegativeModeling]
            }
            B::ConcurrentInstructionNegativeFirstName => {
                &[B::ConcurrentInstructionNegative, B::FirstName]
            }
            B::ConcurrentInstructionNegativeManualManipulation => {
                &[B::ConcurrentInstructionNegative, B::ManualManipulation]
            }
            B::ManualManipulationConcurrentInstructionNegative => {
                &[B::ManualManipulation, B::ConcurrentInstructionNegative]
            }

            B::PraiseFirstName => &[B::Praise, B::FirstName],
            B::PositiveModelingPraise => &[B::PositiveModeling, B::Praise],
            B::ManualManipulationPraise => &[B::ManualManipulation, B::Praise],
            B::ScoldFirstName => &[B::Scold, B::FirstName],
            B::ScoldPositiveModeling => &[B::Scold, B::PositiveModeling],
            B::ConsoleFirstName => &[B::Console, B::FirstName],
            B::ManualManipulationConsole => &[B::ManualManipulation, B::Console],
            B::HustleFirstName => &[B::Hustle, B::FirstName],
            B::PositiveModelingHustle => &[B::PositiveModeling, B::Hustle],
            B::ManualManipulationHustle => &[B::ManualManipulation, B::Hustle],
            B::ManualManipulationPositiveModeling => {
                &[B::ManualManipulation, B::PositiveModeling]
            }
            B::ManualManipulationFirstName => &[B::ManualManipulation, B::FirstName],
        }
    }

    /// Whether this is a pairwise combination.
    pub fn is_compound(self) -> bool {
        self.components().len() > 1
    }

    /// Category of an atomic behaviour. Compounds and the Start marker have none.
    fn atomic_category(self) -> Option<Category> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.base_behaviour() == self)
    }

    /// Categories this behaviour belongs to.
    pub fn categories(self) -> Vec<Category> {
        self.components()
            .iter()
            .filter_map(|c| c.atomic_category())
            .collect()
    }

    /// Whether this behaviour is a member of `category`.
    pub fn is_in(self, category: Category) -> bool {
        self.components()
            .iter()
            .any(|c| c.atomic_category() == Some(category))
    }

    /// Base behaviour a manual-manipulation compound collapses to, if any.
    pub fn canonical_form(self) -> Option<Behaviour> {
        CANONICAL_FORMS
            .iter()
            .find(|(compound, _)| *compound == self)
            .map(|(_, base)| *base)
    }

    /// Snake-case name, matching the serialized form.
    pub fn name(self) -> String {
        let debug = format!("{:?}", self);
        let mut out = String::with_capacity(debug.len() + 8);
        for (i, ch) in debug.chars().enumerate() {
            if ch.is_ascii_uppercase() {
                if i > 0 {
                    out.push('_');
                }
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Parse a behaviour from its snake-case name.
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.iter().copied().find(|b| b.name() == wanted)
    }
}

impl fmt::Display for Behaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

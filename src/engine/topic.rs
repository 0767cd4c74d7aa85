use std::fmt;

use serde::{Deserialize, Serialize};

// --- Topic ---

/// Declaration order is the tie-break order used by the analysis engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "Mixed Practice", alias = "Mixed")]
    Mixed,
    Algebra,
    Geometry,
    #[serde(rename = "Number Theory")]
    NumberTheory,
    #[serde(rename = "Counting & Probability")]
    CountingProbability,
    #[serde(rename = "Logic & Word Problems", alias = "Logic")]
    Logic,
}

impl Topic {
    pub fn name(self) -> &'static str {
        match self {
            Topic::Mixed => "Mixed Practice",
            Topic::Algebra => "Algebra",
            Topic::Geometry => "Geometry",
            Topic::NumberTheory => "Number Theory",
            Topic::CountingProbability => "Counting & Probability",
            Topic::Logic => "Logic & Word Problems",
        }
    }

    pub fn to_key(self) -> &'static str {
        match self {
            Topic::Mixed => "mixed",
            Topic::Algebra => "algebra",
            Topic::Geometry => "geometry",
            Topic::NumberTheory => "number_theory",
            Topic::CountingProbability => "counting",
            Topic::Logic => "logic",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "mixed" => Some(Topic::Mixed),
            "algebra" => Some(Topic::Algebra),
            "geometry" => Some(Topic::Geometry),
            "number_theory" => Some(Topic::NumberTheory),
            "counting" => Some(Topic::CountingProbability),
            "logic" => Some(Topic::Logic),
            _ => None,
        }
    }

    /// Accepts either a key (`number_theory`) or a display name (`Number Theory`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_key(name).or_else(|| Self::all().iter().copied().find(|t| t.name() == name))
    }

    pub fn all() -> &'static [Topic] {
        &[
            Topic::Mixed,
            Topic::Algebra,
            Topic::Geometry,
            Topic::NumberTheory,
            Topic::CountingProbability,
            Topic::Logic,
        ]
    }

    /// Every scored topic, i.e. all but the `Mixed` wildcard.
    pub fn concrete() -> &'static [Topic] {
        &Self::all()[1..]
    }

    pub fn is_wildcard(self) -> bool {
        self == Topic::Mixed
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// --- Difficulty ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    /// Selection wildcard: ignore the difficulty filter.
    #[serde(rename = "Any Difficulty", alias = "Competition")]
    Competition,
}

impl Difficulty {
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Competition => "Any Difficulty",
        }
    }

    pub fn to_key(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Competition => "any",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            "any" | "competition" => Some(Difficulty::Competition),
            _ => None,
        }
    }

    pub fn all() -> &'static [Difficulty] {
        &[
            Difficulty::Easy,
            Difficulty::Medium,
            Difficulty::Hard,
            Difficulty::Competition,
        ]
    }

    pub fn is_wildcard(self) -> bool {
        self == Difficulty::Competition
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

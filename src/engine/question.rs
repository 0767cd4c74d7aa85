use serde::{Deserialize, Serialize};

use crate::engine::topic::{Difficulty, Topic};

pub const OPTION_COUNT: usize = 5;
pub const OPTION_LABELS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D', 'E'];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub year: u32,
    pub question_number: u32,
    pub problem_text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub explanation: String,
    pub hint: String,
    pub topic: Topic,
    pub difficulty: Difficulty,
}

impl Question {
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_option_index
    }

    /// Exactly five options, a correct index pointing at one of them, and a
    /// concrete topic/difficulty rather than a selection wildcard.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTION_COUNT
            && self.correct_option_index < self.options.len()
            && !self.difficulty.is_wildcard()
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_option_index).map(String::as_str)
    }

    /// Two questions count as the same mistake when either the id or the
    /// problem text matches. Distinct questions that share wording collide.
    pub fn same_problem(&self, other: &Question) -> bool {
        self.id == other.id || self.problem_text == other.problem_text
    }
}

pub fn option_label(index: usize) -> char {
    OPTION_LABELS.get(index).copied().unwrap_or('?')
}

pub fn option_index(label: char) -> Option<usize> {
    let upper = label.to_ascii_uppercase();
    OPTION_LABELS.iter().position(|&l| l == upper)
}

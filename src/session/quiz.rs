use crate::engine::progress::AnswerMode;
use crate::engine::question::Question;

/// One question on screen: pick an option, optionally peek at the hint,
/// submit once.
#[derive(Clone, Debug)]
pub struct QuizState {
    pub question: Question,
    pub mode: AnswerMode,
    pub selected: Option<usize>,
    pub hint_shown: bool,
    outcome: Option<bool>,
}

impl QuizState {
    pub fn new(question: Question, mode: AnswerMode) -> Self {
        Self {
            question,
            mode,
            selected: None,
            hint_shown: false,
            outcome: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.outcome.is_some()
    }

    /// Correctness of the submitted answer, once submitted.
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    pub fn select(&mut self, option: usize) -> bool {
        if self.is_submitted() || option >= self.question.options.len() {
            return false;
        }
        self.selected = Some(option);
        true
    }

    pub fn show_hint(&mut self) {
        self.hint_shown = true;
    }

    /// Lock in the selection. `None` without a selection or when already
    /// submitted, so the caller applies each answer exactly once.
    pub fn submit(&mut self) -> Option<bool> {
        if self.is_submitted() {
            return None;
        }
        let correct = self.question.is_correct(self.selected?);
        self.outcome = Some(correct);
        Some(correct)
    }
}

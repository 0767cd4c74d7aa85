use crate::engine::topic::{Difficulty, Topic};

/// One Medium question per concrete topic, in this order.
pub const DIAGNOSTIC_ORDER: [Topic; 5] = [
    Topic::Algebra,
    Topic::Geometry,
    Topic::NumberTheory,
    Topic::CountingProbability,
    Topic::Logic,
];

pub const DIAGNOSTIC_DIFFICULTY: Difficulty = Difficulty::Medium;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticStep {
    Next(Topic),
    Complete,
}

#[derive(Clone, Debug, Default)]
pub struct DiagnosticRun {
    index: usize,
}

impl DiagnosticRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_topic(&self) -> Option<Topic> {
        DIAGNOSTIC_ORDER.get(self.index).copied()
    }

    /// Move past the current question.
    pub fn advance(&mut self) -> DiagnosticStep {
        if self.index < DIAGNOSTIC_ORDER.len() {
            self.index += 1;
        }
        match self.current_topic() {
            Some(topic) => DiagnosticStep::Next(topic),
            None => DiagnosticStep::Complete,
        }
    }

    /// True while the final topic is on screen.
    pub fn is_last(&self) -> bool {
        self.index + 1 == DIAGNOSTIC_ORDER.len()
    }

    /// (1-based position, total), for "Question 2 of 5".
    pub fn position(&self) -> (usize, usize) {
        (
            (self.index + 1).min(DIAGNOSTIC_ORDER.len()),
            DIAGNOSTIC_ORDER.len(),
        )
    }
}

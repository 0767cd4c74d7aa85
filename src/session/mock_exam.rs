use std::collections::HashMap;

use crate::engine::progress::{self, UserStats};
use crate::engine::question::Question;

pub const MOCK_DURATION_SECS: u32 = 40 * 60;
pub const LOW_TIME_SECS: u32 = 5 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockPhase {
    NotStarted,
    InProgress,
    Submitted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub selected: Option<usize>,
    pub correct_option: usize,
    pub correct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockReview {
    pub outcomes: Vec<QuestionOutcome>,
    pub correct_count: usize,
    pub total: usize,
}

/// A timed exam. The countdown is informational; only `submit` ends the
/// attempt.
#[derive(Clone, Debug)]
pub struct MockExam {
    phase: MockPhase,
    questions: Vec<Question>,
    answers: HashMap<String, usize>,
    remaining_secs: u32,
}

impl Default for MockExam {
    fn default() -> Self {
        Self {
            phase: MockPhase::NotStarted,
            questions: Vec::new(),
            answers: HashMap::new(),
            remaining_secs: MOCK_DURATION_SECS,
        }
    }
}

impl MockExam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MockPhase {
        self.phase
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &HashMap<String, usize> {
        &self.answers
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Begin with a freshly generated question set.
    pub fn start(&mut self, questions: Vec<Question>) -> bool {
        if self.phase != MockPhase::NotStarted {
            log::debug!("Ignoring mock start in {:?}", self.phase);
            return false;
        }
        self.questions = questions;
        self.answers.clear();
        self.remaining_secs = MOCK_DURATION_SECS;
        self.phase = MockPhase::InProgress;
        true
    }

    /// Record or overwrite the choice for a question in this exam.
    pub fn answer(&mut self, question_id: &str, option: usize) -> bool {
        if self.phase != MockPhase::InProgress {
            return false;
        }
        let Some(question) = self.questions.iter().find(|q| q.id == question_id) else {
            return false;
        };
        if option >= question.options.len() {
            return false;
        }
        self.answers.insert(question_id.to_string(), option);
        true
    }

    pub fn tick(&mut self) -> bool {
        if self.phase != MockPhase::InProgress {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        true
    }

    /// Score the exam against `stats`. Unanswered questions are allowed.
    pub fn submit(&mut self, stats: &UserStats) -> Option<UserStats> {
        if self.phase != MockPhase::InProgress {
            return None;
        }
        let next = progress::apply_mock_submission(stats, &self.questions, &self.answers);
        self.phase = MockPhase::Submitted;
        Some(next)
    }

    /// Leave the review, discarding the exam.
    pub fn exit(&mut self) -> bool {
        if self.phase != MockPhase::Submitted {
            return false;
        }
        *self = Self::default();
        true
    }

    pub fn review(&self) -> Option<MockReview> {
        if self.phase != MockPhase::Submitted {
            return None;
        }
        let outcomes: Vec<QuestionOutcome> = self
            .questions
            .iter()
            .map(|q| {
                let selected = self.answers.get(&q.id).copied();
                QuestionOutcome {
                    question_id: q.id.clone(),
                    selected,
                    correct_option: q.correct_option_index,
                    correct: selected.is_some_and(|s| q.is_correct(s)),
                }
            })
            .collect();
        Some(MockReview {
            correct_count: outcomes.iter().filter(|o| o.correct).count(),
            total: outcomes.len(),
            outcomes,
        })
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn unanswered_count(&self) -> usize {
        self.questions.len() - self.answered_count()
    }

    pub fn progress_percent(&self) -> u32 {
        if self.questions.is_empty() {
            return 0;
        }
        ((self.answered_count() as f64 / self.questions.len() as f64) * 100.0).round() as u32
    }

    pub fn is_low_time(&self) -> bool {
        self.remaining_secs < LOW_TIME_SECS
    }

    pub fn clock(&self) -> String {
        format_clock(self.remaining_secs)
    }
}

/// `m:ss`
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

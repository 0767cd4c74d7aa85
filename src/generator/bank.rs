use std::collections::HashSet;

use thiserror::Error;

use crate::engine::question::Question;
use crate::engine::topic::{Difficulty, Topic};

const QUESTIONS_JSON: &str = include_str!("../../assets/questions.json");

#[derive(Debug, Error)]
pub enum BankError {
    #[error("question bank is empty")]
    Empty,
    #[error("question {0} is malformed (needs 5 options, a valid answer index and a concrete difficulty)")]
    Malformed(String),
    #[error("duplicate question id {0}")]
    DuplicateId(String),
    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Immutable, non-empty question store.
#[derive(Clone, Debug)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        if questions.is_empty() {
            return Err(BankError::Empty);
        }
        let mut seen = HashSet::new();
        for q in &questions {
            if !q.is_well_formed() {
                return Err(BankError::Malformed(q.id.clone()));
            }
            if !seen.insert(q.id.as_str()) {
                return Err(BankError::DuplicateId(q.id.clone()));
            }
        }
        Ok(Self { questions })
    }

    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Self::new(questions)
    }

    /// The bundled problem set.
    pub fn builtin() -> Result<Self, BankError> {
        Self::from_json(QUESTIONS_JSON)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn all(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Questions of `topic` (any, when `Mixed`) and `difficulty` (any, when
    /// `Competition`).
    pub fn matching(&self, topic: Topic, difficulty: Difficulty) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| topic.is_wildcard() || q.topic == topic)
            .filter(|q| difficulty.is_wildcard() || q.difficulty == difficulty)
            .collect()
    }

    pub fn count(&self, topic: Topic, difficulty: Difficulty) -> usize {
        self.matching(topic, difficulty).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::question::fixtures::question;

    #[test]
    fn builtin_bank_supports_a_full_mock_exam() {
        let bank = QuestionBank::builtin().unwrap();
        assert!(bank.count(Topic::Mixed, Difficulty::Easy) >= 10);
        assert!(bank.count(Topic::Mixed, Difficulty::Medium) >= 10);
        assert!(bank.count(Topic::Mixed, Difficulty::Hard) >= 5);
        for &topic in Topic::concrete() {
            assert!(bank.count(topic, Difficulty::Competition) > 0, "{topic} has no questions");
        }
    }

    #[test]
    fn empty_bank_is_rejected() {
        assert!(matches!(QuestionBank::new(Vec::new()), Err(BankError::Empty)));
    }

    #[test]
    fn malformed_and_duplicate_questions_are_rejected() {
        let mut bad = question("bad", Topic::Algebra, Difficulty::Easy);
        bad.correct_option_index = 7;
        assert!(matches!(
            QuestionBank::new(vec![bad]),
            Err(BankError::Malformed(id)) if id == "bad"
        ));

        let a = question("same", Topic::Algebra, Difficulty::Easy);
        let b = question("same", Topic::Geometry, Difficulty::Hard);
        assert!(matches!(
            QuestionBank::new(vec![a, b]),
            Err(BankError::DuplicateId(_))
        ));
    }

    #[test]
    fn matching_honors_wildcards() {
        let bank = QuestionBank::new(vec![
            question("a-e", Topic::Algebra, Difficulty::Easy),
            question("a-h", Topic::Algebra, Difficulty::Hard),
            question("g-e", Topic::Geometry, Difficulty::Easy),
        ])
        .unwrap();
        assert_eq!(bank.count(Topic::Algebra, Difficulty::Easy), 1);
        assert_eq!(bank.count(Topic::Algebra, Difficulty::Competition), 2);
        assert_eq!(bank.count(Topic::Mixed, Difficulty::Easy), 2);
        assert_eq!(bank.count(Topic::Mixed, Difficulty::Competition), 3);
        assert!(bank.get("g-e").is_some());
    }
}

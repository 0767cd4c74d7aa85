use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::advice::StudyRecommendation;
use crate::engine::question::Question;
use crate::engine::scoring;
use crate::engine::topic::{Difficulty, Topic};

pub const MASTERY_MAX: u32 = 100;

// --- Answer modes and mastery steps ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerMode {
    Practice,
    Diagnostic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MasteryStep {
    pub correct: i32,
    pub incorrect: i32,
}

impl MasteryStep {
    pub fn delta(self, is_correct: bool) -> i32 {
        if is_correct { self.correct } else { self.incorrect }
    }
}

pub const PRACTICE_STEP: MasteryStep = MasteryStep {
    correct: 5,
    incorrect: -2,
};

/// Diagnostic answers move mastery in large steps, even when wrong, so a
/// fresh profile converges on a baseline quickly.
pub const DIAGNOSTIC_STEP: MasteryStep = MasteryStep {
    correct: 30,
    incorrect: 10,
};

pub const MOCK_STEP: MasteryStep = MasteryStep {
    correct: 3,
    incorrect: -1,
};

impl AnswerMode {
    pub fn mastery_step(self) -> MasteryStep {
        match self {
            AnswerMode::Practice => PRACTICE_STEP,
            AnswerMode::Diagnostic => DIAGNOSTIC_STEP,
        }
    }

    pub fn xp_for(self, difficulty: Difficulty, is_correct: bool) -> u32 {
        match (self, is_correct) {
            (_, false) => scoring::XP_CONSOLATION,
            (AnswerMode::Practice, true) => scoring::xp_for_correct(difficulty),
            (AnswerMode::Diagnostic, true) => scoring::XP_DIAGNOSTIC_CORRECT,
        }
    }
}

// --- Mastery map ---

/// Per-topic mastery in [0, 100]. Always holds an entry for every concrete
/// topic; `Mixed` never has one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, i64>", into = "BTreeMap<String, u32>")]
pub struct MasteryMap {
    scores: BTreeMap<Topic, u32>,
}

impl Default for MasteryMap {
    fn default() -> Self {
        Self {
            scores: Topic::concrete().iter().map(|&t| (t, 0)).collect(),
        }
    }
}

impl From<BTreeMap<String, i64>> for MasteryMap {
    fn from(raw: BTreeMap<String, i64>) -> Self {
        let mut map = MasteryMap::default();
        for (name, score) in raw {
            match Topic::from_name(&name) {
                Some(topic) if !topic.is_wildcard() => {
                    map.set(topic, score.clamp(0, MASTERY_MAX as i64) as u32);
                }
                Some(_) => {}
                None => log::warn!("Dropping mastery entry for unknown topic {name:?}"),
            }
        }
        map
    }
}

impl From<MasteryMap> for BTreeMap<String, u32> {
    fn from(map: MasteryMap) -> Self {
        map.scores
            .into_iter()
            .map(|(t, s)| (t.name().to_string(), s))
            .collect()
    }
}

impl MasteryMap {
    pub fn get(&self, topic: Topic) -> u32 {
        self.scores.get(&topic).copied().unwrap_or(0)
    }

    pub fn set(&mut self, topic: Topic, score: u32) {
        if topic.is_wildcard() {
            return;
        }
        self.scores.insert(topic, score.min(MASTERY_MAX));
    }

    /// Apply a signed change, clamping into [0, 100]. `Mixed` is ignored.
    pub fn adjust(&mut self, topic: Topic, delta: i32) {
        let next = (self.get(topic) as i64 + delta as i64).clamp(0, MASTERY_MAX as i64);
        self.set(topic, next as u32);
    }

    /// Concrete topics in declaration order with their scores.
    pub fn iter(&self) -> impl Iterator<Item = (Topic, u32)> + '_ {
        self.scores.iter().map(|(&t, &s)| (t, s))
    }

    pub fn any_mastered(&self) -> bool {
        self.scores.values().any(|&s| s >= MASTERY_MAX)
    }
}

// --- Attempt history ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub correct: bool,
}

impl Attempt {
    pub fn record(question: &Question, correct: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            topic: question.topic,
            difficulty: question.difficulty,
            correct,
        }
    }
}

// --- Mistake log ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placement {
    Front,
    Back,
}

pub fn is_logged(mistakes: &[Question], question: &Question) -> bool {
    mistakes.iter().any(|m| m.same_problem(question))
}

/// Insert a snapshot of `question` unless an entry with the same id or text
/// is already present. Returns whether it was inserted.
fn log_mistake(mistakes: &mut Vec<Question>, question: &Question, placement: Placement) -> bool {
    if is_logged(mistakes, question) {
        return false;
    }
    match placement {
        Placement::Front => mistakes.insert(0, question.clone()),
        Placement::Back => mistakes.push(question.clone()),
    }
    true
}

// --- User stats ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub correct: u32,
    pub total: u32,
    pub streak: u32,
    pub xp: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub mastery_by_topic: MasteryMap,
    #[serde(default)]
    pub history: Vec<Attempt>,
    #[serde(default)]
    pub mistakes: Vec<Question>,
    #[serde(default)]
    pub diagnostic_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_advice: Option<StudyRecommendation>,
}

fn default_level() -> u32 {
    1
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            correct: 0,
            total: 0,
            streak: 0,
            xp: 0,
            level: default_level(),
            mastery_by_topic: MasteryMap::default(),
            history: Vec::new(),
            mistakes: Vec::new(),
            diagnostic_completed: false,
            study_advice: None,
        }
    }
}

impl UserStats {
    fn gain_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(amount);
        self.level = scoring::level_from_xp(self.xp);
    }

    fn count_answer(&mut self, is_correct: bool) {
        self.total = self.total.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
            self.streak = self.streak.saturating_add(1);
        } else {
            self.streak = 0;
        }
    }

    pub fn overall_accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    /// Accuracy over the last `window` attempts, 0 with no history.
    pub fn recent_accuracy(&self, window: usize) -> f64 {
        let start = self.history.len().saturating_sub(window);
        let recent = &self.history[start..];
        if recent.is_empty() {
            return 0.0;
        }
        let correct = recent.iter().filter(|a| a.correct).count();
        correct as f64 / recent.len() as f64
    }

    /// Running accuracy percentage across the last `window` attempts, one
    /// point per attempt.
    pub fn accuracy_trend(&self, window: usize) -> Vec<u32> {
        let start = self.history.len().saturating_sub(window);
        let mut cumulative = 0u32;
        self.history[start..]
            .iter()
            .enumerate()
            .map(|(i, attempt)| {
                if attempt.correct {
                    cumulative += 1;
                }
                scoring::accuracy_percent(cumulative, i as u32 + 1)
            })
            .collect()
    }

    /// Repair values a snapshot may hold inconsistently. Returns true when
    /// anything changed.
    pub fn normalize(&mut self) -> bool {
        let mut repaired = false;
        let level = scoring::level_from_xp(self.xp);
        if self.level != level {
            self.level = level;
            repaired = true;
        }
        if self.correct > self.total {
            self.correct = self.total;
            repaired = true;
        }
        repaired
    }
}

// --- Reducers ---

/// Apply one answered question and return the next state.
pub fn apply_answer(
    stats: &UserStats,
    question: &Question,
    is_correct: bool,
    mode: AnswerMode,
) -> UserStats {
    let mut next = stats.clone();
    next.count_answer(is_correct);
    next.gain_xp(mode.xp_for(question.difficulty, is_correct));
    next.mastery_by_topic
        .adjust(question.topic, mode.mastery_step().delta(is_correct));
    next.history
        .push(Attempt::record(question, is_correct, Utc::now()));
    if !is_correct {
        log_mistake(&mut next.mistakes, question, Placement::Front);
    }
    next
}

/// Score a submitted mock exam. Unanswered questions count as incorrect.
pub fn apply_mock_submission(
    stats: &UserStats,
    questions: &[Question],
    answers: &HashMap<String, usize>,
) -> UserStats {
    let mut next = stats.clone();
    let submitted_at = Utc::now();
    let mut correct_count = 0u32;

    for question in questions {
        let is_correct = answers
            .get(&question.id)
            .is_some_and(|&choice| question.is_correct(choice));
        if is_correct {
            correct_count += 1;
        }
        next.count_answer(is_correct);
        next.mastery_by_topic
            .adjust(question.topic, MOCK_STEP.delta(is_correct));
        next.history
            .push(Attempt::record(question, is_correct, submitted_at));
        if !is_correct {
            log_mistake(&mut next.mistakes, question, Placement::Back);
        }
    }

    next.gain_xp(correct_count * scoring::XP_MOCK_CORRECT + scoring::XP_MOCK_COMPLETION_BONUS);
    next.diagnostic_completed = true;
    log::info!(
        "Mock exam scored {correct_count}/{} (+{} xp)",
        questions.len(),
        next.xp - stats.xp
    );
    next
}

pub fn mark_diagnostic_completed(stats: &UserStats) -> UserStats {
    UserStats {
        diagnostic_completed: true,
        ..stats.clone()
    }
}

pub fn remove_mistake(stats: &UserStats, question_id: &str) -> UserStats {
    let mut next = stats.clone();
    next.mistakes.retain(|m| m.id != question_id);
    next
}

pub fn with_study_advice(stats: &UserStats, advice: StudyRecommendation) -> UserStats {
    UserStats {
        study_advice: Some(advice),
        ..stats.clone()
    }
}

use std::sync::Arc;

use tempfile::TempDir;

use amc8_trainer::app::{App, AppScreen};
use amc8_trainer::config::Config;
use amc8_trainer::engine::advice::{self, StudyRecommendation};
use amc8_trainer::engine::progress::UserStats;
use amc8_trainer::engine::question::Question;
use amc8_trainer::engine::topic::{Difficulty, Topic};
use amc8_trainer::generator::bank::QuestionBank;
use amc8_trainer::generator::provider::{
    self, AdviceProvider, FALLBACK_QUESTION_ID, ProviderError, QuestionProvider,
};
use amc8_trainer::session::mistake_retry::RetryState;
use amc8_trainer::session::mock_exam::MockPhase;
use amc8_trainer::store::json_store::JsonStore;

fn make_app(config: Config) -> (TempDir, App) {
    let dir = TempDir::new().unwrap();
    let store = JsonStore::new(dir.path()).unwrap();
    let app = App::with_parts(config, QuestionBank::builtin().unwrap(), Some(store));
    (dir, app)
}

fn reload(dir: &TempDir) -> UserStats {
    JsonStore::new(dir.path()).unwrap().load_stats().unwrap()
}

/// Pick the right or a wrong option for the question on screen and submit.
fn answer_current(app: &mut App, correct: bool) -> Option<bool> {
    let question = app.quiz.as_ref()?.question.clone();
    let option = if correct {
        question.correct_option_index
    } else {
        (question.correct_option_index + 1) % question.options.len()
    };
    assert!(app.select_option(option));
    app.submit_answer()
}

struct Failing;

impl QuestionProvider for Failing {
    fn generate_question(&self, _: Topic, _: Difficulty) -> Result<Question, ProviderError> {
        Err(ProviderError::Invalid("question"))
    }
}

impl AdviceProvider for Failing {
    fn generate_advice(&self, _: &UserStats) -> Result<StudyRecommendation, ProviderError> {
        Err(ProviderError::EmptyResponse)
    }
}

#[test]
fn practice_answer_is_applied_once_and_saved() {
    let (dir, mut app) = make_app(Config::instant());
    app.start_quiz(Topic::Algebra, Difficulty::Easy);
    assert_eq!(app.screen, AppScreen::Quiz);
    app.settle();

    let question = app.quiz.as_ref().unwrap().question.clone();
    assert_eq!(question.topic, Topic::Algebra);
    assert_eq!(question.difficulty, Difficulty::Easy);

    assert_eq!(answer_current(&mut app, true), Some(true));
    assert_eq!(app.submit_answer(), None);
    assert_eq!(app.stats.xp, 10);
    assert_eq!(app.stats.total, 1);

    let saved = reload(&dir);
    assert_eq!(saved.xp, 10);
    assert_eq!(saved.mastery_by_topic.get(Topic::Algebra), 5);

    app.next_question();
    assert!(app.quiz.is_none());
    app.settle();
    assert!(app.quiz.is_some());
}

#[test]
fn question_arrives_only_after_polling() {
    let mut config = Config::instant();
    config.question_latency_ms = 100;
    let (_dir, mut app) = make_app(config);
    app.start_quiz(Topic::Mixed, Difficulty::Competition);
    app.poll();
    assert!(app.quiz.is_none());
    assert!(app.is_loading());
    app.settle();
    assert!(app.quiz.is_some());
    assert!(!app.is_loading());
}

#[test]
fn leaving_the_quiz_discards_the_pending_question() {
    let mut config = Config::instant();
    config.question_latency_ms = 100;
    let (_dir, mut app) = make_app(config);
    app.start_quiz(Topic::Geometry, Difficulty::Hard);
    app.go_to_menu();
    assert!(!app.is_loading());
    app.settle();
    assert!(app.quiz.is_none());
    assert_eq!(app.screen, AppScreen::Menu);
}

#[test]
fn leaving_during_generation_discards_the_mock_exam() {
    let mut config = Config::instant();
    config.mock_latency_ms = 100;
    let (_dir, mut app) = make_app(config);
    app.start_mock();
    assert!(app.is_loading());
    app.go_to_menu();
    assert!(!app.is_loading());
    app.settle();
    assert_eq!(app.mock.phase(), MockPhase::NotStarted);
    assert!(app.mock.questions().is_empty());
    assert_eq!(app.screen, AppScreen::Menu);
}

#[test]
fn reset_discards_the_running_analysis() {
    let mut config = Config::instant();
    config.analysis_latency_ms = 100;
    let (_dir, mut app) = make_app(config);
    app.stats.diagnostic_completed = true;
    assert!(app.maybe_recompute_advice());
    app.reset_data();
    app.settle();
    assert_eq!(app.stats.study_advice, None);
    assert_eq!(app.stats, UserStats::default());
}

#[test]
fn redelivered_question_gets_a_fresh_ticket() {
    let (_dir, mut app) = make_app(Config::instant());
    // The bundled bank holds a single Logic/Hard problem
    app.start_quiz(Topic::Logic, Difficulty::Hard);
    app.settle();
    let first_id = app.quiz.as_ref().unwrap().question.id.clone();
    let first_ticket = app.quiz_ticket().unwrap();

    app.next_question();
    assert_eq!(app.quiz_ticket(), None);
    app.settle();
    assert_eq!(app.quiz.as_ref().unwrap().question.id, first_id);
    let second_ticket = app.quiz_ticket().unwrap();
    assert_ne!(second_ticket, first_ticket);
}

#[test]
fn repeated_fallback_questions_are_distinct_deliveries() {
    let (_dir, app) = make_app(Config::instant());
    let mut app = app.with_providers(Arc::new(Failing), Arc::new(Failing));
    let mut tickets = Vec::new();
    app.start_quiz(Topic::Algebra, Difficulty::Easy);
    for _ in 0..3 {
        app.settle();
        assert_eq!(app.quiz.as_ref().unwrap().question.id, FALLBACK_QUESTION_ID);
        tickets.push(app.quiz_ticket().unwrap());
        app.next_question();
    }
    tickets.dedup();
    assert_eq!(tickets.len(), 3);
}

#[test]
fn diagnostic_latches_and_triggers_analysis() {
    let (dir, mut app) = make_app(Config::instant());
    app.start_diagnostic();

    let mut topics = Vec::new();
    for round in 0..5 {
        app.settle();
        let quiz = app.quiz.as_ref().unwrap();
        topics.push(quiz.question.topic);
        assert_eq!(quiz.question.difficulty, Difficulty::Medium);
        answer_current(&mut app, round % 2 == 0).unwrap();
        assert_eq!(app.stats.diagnostic_completed, round == 4);
        app.next_question();
    }

    assert_eq!(
        topics,
        vec![
            Topic::Algebra,
            Topic::Geometry,
            Topic::NumberTheory,
            Topic::CountingProbability,
            Topic::Logic
        ]
    );
    assert_eq!(app.screen, AppScreen::Menu);
    // Three correct diagnostic answers at 25 XP, two misses at 1 XP
    assert_eq!(app.stats.xp, 77);
    assert_eq!(app.stats.mastery_by_topic.get(Topic::Algebra), 30);
    assert_eq!(app.stats.mastery_by_topic.get(Topic::Geometry), 10);

    assert!(app.is_analyzing());
    app.settle();
    assert!(!app.is_analyzing());
    let advice = app.stats.study_advice.clone().unwrap();
    assert_eq!(advice.next_milestone, "Complete 10 Problems");
    assert_eq!(reload(&dir).study_advice, Some(advice));
}

#[test]
fn diagnostic_waits_for_an_answer_before_advancing() {
    let (_dir, mut app) = make_app(Config::instant());
    app.start_diagnostic();
    app.settle();
    let first = app.quiz.as_ref().unwrap().question.id.clone();
    app.next_question();
    assert_eq!(app.quiz.as_ref().unwrap().question.id, first);
    assert_eq!(app.diagnostic.as_ref().unwrap().position(), (1, 5));
}

#[test]
fn mock_exam_full_cycle() {
    let (dir, mut app) = make_app(Config::instant());
    app.start_mock();
    assert_eq!(app.screen, AppScreen::MockExam);
    app.settle();
    assert_eq!(app.mock.phase(), MockPhase::InProgress);
    assert_eq!(app.mock.questions().len(), 25);

    let correct: Vec<usize> = app
        .mock
        .questions()
        .iter()
        .map(|q| q.correct_option_index)
        .collect();
    for (i, &option) in correct.iter().enumerate().take(15) {
        assert!(app.mock_answer(i, option));
    }
    assert!(!app.mock_answer(25, 0));
    app.tick();
    assert_eq!(app.mock.clock(), "39:59");

    assert!(app.submit_mock());
    assert!(!app.submit_mock());
    assert_eq!(app.screen, AppScreen::MockReview);
    assert_eq!(app.stats.xp, 350);
    assert_eq!(app.stats.total, 25);
    assert!(app.stats.diagnostic_completed);
    assert_eq!(app.mock.review().unwrap().correct_count, 15);

    assert!(app.exit_mock());
    assert_eq!(app.screen, AppScreen::Menu);
    assert_eq!(app.mock.phase(), MockPhase::NotStarted);

    let saved = reload(&dir);
    assert_eq!(saved.xp, 350);
    assert_eq!(saved.mistakes.len(), 10);
}

#[test]
fn provider_failures_fall_back() {
    let (_dir, app) = make_app(Config::instant());
    let mut app = app.with_providers(Arc::new(Failing), Arc::new(Failing));

    app.start_quiz(Topic::Logic, Difficulty::Hard);
    app.settle();
    let quiz = app.quiz.as_ref().unwrap();
    assert_eq!(quiz.question.id, FALLBACK_QUESTION_ID);
    assert_eq!(quiz.question, provider::fallback_question());

    app.stats.diagnostic_completed = true;
    assert!(app.maybe_recompute_advice());
    assert!(!app.maybe_recompute_advice());
    app.settle();
    assert_eq!(
        app.stats.study_advice,
        Some(advice::fallback_recommendation())
    );
}

#[test]
fn mistake_retry_and_removal() {
    let (dir, mut app) = make_app(Config::instant());
    app.start_quiz(Topic::NumberTheory, Difficulty::Medium);
    app.settle();
    assert_eq!(answer_current(&mut app, false), Some(false));
    let missed = app.stats.mistakes[0].clone();
    let before = app.stats.clone();

    assert!(app.retry_mistake(&missed.id));
    assert_eq!(app.screen, AppScreen::MistakeRetry);
    let wrong = (missed.correct_option_index + 1) % 5;
    assert!(app.select_option(wrong));
    assert_eq!(app.submit_retry(), Some(RetryState::Incorrect));
    app.reset_retry();
    assert!(app.select_option(missed.correct_option_index));
    assert_eq!(app.submit_retry(), Some(RetryState::Correct));
    assert_eq!(app.stats, before);

    assert!(!app.retry_mistake("no-such-id"));
    assert!(app.remove_mistake(&missed.id));
    assert!(!app.remove_mistake(&missed.id));
    assert!(app.stats.mistakes.is_empty());
    assert_eq!(app.screen, AppScreen::Menu);
    assert!(reload(&dir).mistakes.is_empty());
}

#[test]
fn reset_erases_progress() {
    let (dir, mut app) = make_app(Config::instant());
    app.start_quiz(Topic::Mixed, Difficulty::Easy);
    app.settle();
    answer_current(&mut app, true).unwrap();
    assert!(dir.path().join("amc8_stats.json").exists());

    app.reset_data();
    assert_eq!(app.stats, UserStats::default());
    assert_eq!(app.screen, AppScreen::Menu);
    assert!(!dir.path().join("amc8_stats.json").exists());
}

#[test]
fn corrupt_snapshot_starts_fresh() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("amc8_stats.json"), "[1, 2").unwrap();
    let store = JsonStore::new(dir.path()).unwrap();
    let app = App::with_parts(
        Config::instant(),
        QuestionBank::builtin().unwrap(),
        Some(store),
    );
    assert_eq!(app.stats, UserStats::default());
}

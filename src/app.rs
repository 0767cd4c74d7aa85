use std::sync::Arc;

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::Config;
use crate::engine::advice::{self, StudyRecommendation};
use crate::engine::progress::{self, AnswerMode, UserStats};
use crate::engine::question::Question;
use crate::engine::topic::{Difficulty, Topic};
use crate::generator::bank::QuestionBank;
use crate::generator::provider::{self, AdviceProvider, LocalProvider, QuestionProvider};
use crate::generator::request::{PendingRequest, TicketCounter};
use crate::generator::selector;
use crate::session::diagnostic::{DIAGNOSTIC_DIFFICULTY, DiagnosticRun, DiagnosticStep};
use crate::session::mistake_retry::{MistakeRetry, RetryState};
use crate::session::mock_exam::{MockExam, MockPhase};
use crate::session::quiz::QuizState;
use crate::store::json_store::JsonStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Menu,
    Quiz,
    Diagnostic,
    MockExam,
    MockReview,
    MistakeRetry,
}

/// Owns the single `UserStats` instance and every session. All mutation
/// happens on the caller's thread; background requests only produce values
/// that `poll` applies.
pub struct App {
    pub screen: AppScreen,
    pub config: Config,
    pub stats: UserStats,
    pub store: Option<JsonStore>,
    pub quiz: Option<QuizState>,
    pub diagnostic: Option<DiagnosticRun>,
    pub mock: MockExam,
    pub retry: Option<MistakeRetry>,
    pub should_quit: bool,
    practice_target: (Topic, Difficulty),
    quiz_ticket: u64,
    bank: Arc<QuestionBank>,
    question_provider: Arc<dyn QuestionProvider>,
    advice_provider: Arc<dyn AdviceProvider>,
    tickets: TicketCounter,
    advice_tickets: TicketCounter,
    pending_question: Option<PendingRequest<Question>>,
    pending_mock: Option<PendingRequest<Vec<Question>>>,
    pending_advice: Option<PendingRequest<StudyRecommendation>>,
}

impl App {
    /// Build from config: the bundled bank, the configured provider and the
    /// snapshot under `config.data_dir`.
    pub fn new(config: Config) -> Result<Self> {
        let bank = QuestionBank::builtin()?;
        let store = match JsonStore::new(config.data_path()) {
            Ok(store) => Some(store),
            Err(e) => {
                log::warn!("Progress will not be saved: {e}");
                None
            }
        };
        Ok(Self::with_parts(config, bank, store))
    }

    pub fn with_parts(config: Config, bank: QuestionBank, store: Option<JsonStore>) -> Self {
        let stats = match store.as_ref().map(JsonStore::load_stats) {
            Some(Some(stats)) => stats,
            Some(None) => {
                log::warn!("Saved progress could not be read; starting fresh");
                UserStats::default()
            }
            None => UserStats::default(),
        };
        let bank = Arc::new(bank);
        let (question_provider, advice_provider) = build_providers(&config, &bank);

        Self {
            screen: AppScreen::Menu,
            config,
            stats,
            store,
            quiz: None,
            diagnostic: None,
            mock: MockExam::new(),
            retry: None,
            should_quit: false,
            practice_target: (Topic::Mixed, Difficulty::Competition),
            quiz_ticket: 0,
            bank,
            question_provider,
            advice_provider,
            tickets: TicketCounter::default(),
            advice_tickets: TicketCounter::default(),
            pending_question: None,
            pending_mock: None,
            pending_advice: None,
        }
    }

    /// Swap in other providers, e.g. a remote one or a test double.
    pub fn with_providers(
        mut self,
        questions: Arc<dyn QuestionProvider>,
        advice: Arc<dyn AdviceProvider>,
    ) -> Self {
        self.question_provider = questions;
        self.advice_provider = advice;
        self
    }

    pub fn is_loading(&self) -> bool {
        let current = |ticket: u64| self.tickets.is_current(ticket);
        self.pending_question
            .as_ref()
            .is_some_and(|p| current(p.ticket()))
            || self.pending_mock.as_ref().is_some_and(|p| current(p.ticket()))
    }

    /// Ticket of the request that delivered the question on screen. Differs
    /// for every delivery, even when the same question comes back.
    pub fn quiz_ticket(&self) -> Option<u64> {
        self.quiz.as_ref().map(|_| self.quiz_ticket)
    }

    pub fn is_analyzing(&self) -> bool {
        self.pending_advice.is_some()
    }

    // --- Practice and diagnostic ---

    pub fn start_quiz(&mut self, topic: Topic, difficulty: Difficulty) {
        self.leave_sessions();
        self.practice_target = (topic, difficulty);
        self.screen = AppScreen::Quiz;
        self.request_question(topic, difficulty);
    }

    pub fn start_diagnostic(&mut self) {
        self.leave_sessions();
        let run = DiagnosticRun::new();
        let first = run.current_topic();
        self.diagnostic = Some(run);
        self.screen = AppScreen::Diagnostic;
        if let Some(topic) = first {
            self.request_question(topic, DIAGNOSTIC_DIFFICULTY);
        }
    }

    fn request_question(&mut self, topic: Topic, difficulty: Difficulty) {
        self.quiz = None;
        let ticket = self.tickets.next();
        let source = Arc::clone(&self.question_provider);
        self.pending_question = Some(PendingRequest::spawn(
            ticket,
            self.config.question_latency(),
            move || provider::question_or_fallback(source.as_ref(), topic, difficulty),
        ));
    }

    pub fn select_option(&mut self, option: usize) -> bool {
        match self.screen {
            AppScreen::Quiz | AppScreen::Diagnostic => {
                self.quiz.as_mut().is_some_and(|quiz| quiz.select(option))
            }
            AppScreen::MistakeRetry => self.retry.as_mut().is_some_and(|r| r.select(option)),
            _ => false,
        }
    }

    pub fn show_hint(&mut self) {
        if let Some(quiz) = self.quiz.as_mut() {
            quiz.show_hint();
        }
    }

    /// Submit the current question. Returns its correctness the first time.
    pub fn submit_answer(&mut self) -> Option<bool> {
        let quiz = self.quiz.as_mut()?;
        let correct = quiz.submit()?;
        self.stats = progress::apply_answer(&self.stats, &quiz.question, correct, quiz.mode);
        if self.screen == AppScreen::Diagnostic
            && self.diagnostic.as_ref().is_some_and(DiagnosticRun::is_last)
        {
            self.stats = progress::mark_diagnostic_completed(&self.stats);
            log::info!("Diagnostic complete");
        }
        self.after_stats_change();
        Some(correct)
    }

    /// Practice: fetch another question for the same target. Diagnostic:
    /// move on once the current one is answered; past the last topic, back
    /// to the menu.
    pub fn next_question(&mut self) {
        match self.screen {
            AppScreen::Quiz => {
                let (topic, difficulty) = self.practice_target;
                self.request_question(topic, difficulty);
            }
            AppScreen::Diagnostic => {
                if !self.quiz.as_ref().is_some_and(QuizState::is_submitted) {
                    return;
                }
                let Some(run) = self.diagnostic.as_mut() else {
                    return;
                };
                match run.advance() {
                    DiagnosticStep::Next(topic) => {
                        self.request_question(topic, DIAGNOSTIC_DIFFICULTY);
                    }
                    DiagnosticStep::Complete => {
                        self.diagnostic = None;
                        self.quiz = None;
                        self.screen = AppScreen::Menu;
                    }
                }
            }
            _ => {}
        }
    }

    // --- Mock exam ---

    pub fn start_mock(&mut self) {
        let generating = self
            .pending_mock
            .as_ref()
            .is_some_and(|p| self.tickets.is_current(p.ticket()));
        if self.mock.phase() != MockPhase::NotStarted || generating {
            return;
        }
        self.leave_sessions();
        let ticket = self.tickets.next();
        let bank = Arc::clone(&self.bank);
        self.pending_mock = Some(PendingRequest::spawn(
            ticket,
            self.config.mock_latency(),
            move || selector::generate_mock_test(&bank, &mut SmallRng::from_entropy()),
        ));
        self.screen = AppScreen::MockExam;
    }

    /// Answer the question at `index` (0-based, exam order).
    pub fn mock_answer(&mut self, index: usize, option: usize) -> bool {
        let Some(id) = self.mock.questions().get(index).map(|q| q.id.clone()) else {
            return false;
        };
        self.mock.answer(&id, option)
    }

    pub fn tick(&mut self) {
        self.mock.tick();
    }

    pub fn submit_mock(&mut self) -> bool {
        let Some(next) = self.mock.submit(&self.stats) else {
            return false;
        };
        self.stats = next;
        self.screen = AppScreen::MockReview;
        self.after_stats_change();
        true
    }

    pub fn exit_mock(&mut self) -> bool {
        if !self.mock.exit() {
            return false;
        }
        self.screen = AppScreen::Menu;
        true
    }

    // --- Mistake log ---

    pub fn retry_mistake(&mut self, question_id: &str) -> bool {
        let Some(question) = self.stats.mistakes.iter().find(|m| m.id == question_id) else {
            return false;
        };
        let retry = MistakeRetry::new(question.clone());
        self.leave_sessions();
        self.retry = Some(retry);
        self.screen = AppScreen::MistakeRetry;
        true
    }

    pub fn submit_retry(&mut self) -> Option<RetryState> {
        self.retry.as_mut().map(MistakeRetry::submit)
    }

    pub fn reveal_retry(&mut self) {
        if let Some(retry) = self.retry.as_mut() {
            retry.reveal();
        }
    }

    pub fn reset_retry(&mut self) {
        if let Some(retry) = self.retry.as_mut() {
            retry.retry();
        }
    }

    pub fn remove_mistake(&mut self, question_id: &str) -> bool {
        if !self.stats.mistakes.iter().any(|m| m.id == question_id) {
            return false;
        }
        self.stats = progress::remove_mistake(&self.stats, question_id);
        if self.retry.as_ref().is_some_and(|r| r.question.id == question_id) {
            self.retry = None;
            self.screen = AppScreen::Menu;
        }
        self.save_data();
        true
    }

    // --- Navigation and data ---

    pub fn go_to_menu(&mut self) {
        self.leave_sessions();
        self.screen = AppScreen::Menu;
    }

    /// Drop every transient session. Outstanding question and mock requests
    /// become stale and are discarded when they land.
    fn leave_sessions(&mut self) {
        self.tickets.next();
        self.quiz = None;
        self.diagnostic = None;
        self.retry = None;
        if self.mock.phase() != MockPhase::NotStarted {
            log::debug!("Abandoning mock exam in {:?}", self.mock.phase());
            self.mock = MockExam::new();
        }
    }

    pub fn reset_data(&mut self) {
        self.go_to_menu();
        self.advice_tickets.next();
        self.stats = match self.store.as_ref().map(JsonStore::reset) {
            Some(Ok(stats)) => stats,
            Some(Err(e)) => {
                log::warn!("Could not delete saved progress: {e}");
                UserStats::default()
            }
            None => UserStats::default(),
        };
    }

    fn after_stats_change(&mut self) {
        self.save_data();
        self.maybe_recompute_advice();
    }

    /// Fire-and-forget; a failed save is logged and the session goes on.
    fn save_data(&self) {
        if let Some(ref store) = self.store
            && let Err(e) = store.save_stats(&self.stats)
        {
            log::warn!("Failed to save progress: {e}");
        }
    }

    pub fn maybe_recompute_advice(&mut self) -> bool {
        if !advice::should_recompute(&self.stats, self.pending_advice.is_some()) {
            return false;
        }
        let ticket = self.advice_tickets.next();
        let source = Arc::clone(&self.advice_provider);
        let snapshot = self.stats.clone();
        self.pending_advice = Some(PendingRequest::spawn(
            ticket,
            self.config.analysis_latency(),
            move || provider::advice_or_fallback(source.as_ref(), &snapshot),
        ));
        true
    }

    // --- Background results ---

    /// Apply whatever background work has finished. Call once per event.
    pub fn poll(&mut self) {
        if let Some(question) = self.pending_question.as_ref().and_then(PendingRequest::try_take)
            && let Some(pending) = self.pending_question.take()
        {
            self.apply_question(pending.ticket(), question);
        }
        if let Some(questions) = self.pending_mock.as_ref().and_then(PendingRequest::try_take)
            && let Some(pending) = self.pending_mock.take()
        {
            self.apply_mock(pending.ticket(), questions);
        }
        if let Some(advice) = self.pending_advice.as_ref().and_then(PendingRequest::try_take)
            && let Some(pending) = self.pending_advice.take()
        {
            self.apply_advice(pending.ticket(), advice);
        }
    }

    /// Block until every outstanding request has delivered, then apply.
    pub fn settle(&mut self) {
        if let Some(pending) = self.pending_question.take() {
            let ticket = pending.ticket();
            if let Some(question) = pending.wait() {
                self.apply_question(ticket, question);
            }
        }
        if let Some(pending) = self.pending_mock.take() {
            let ticket = pending.ticket();
            if let Some(questions) = pending.wait() {
                self.apply_mock(ticket, questions);
            }
        }
        if let Some(pending) = self.pending_advice.take() {
            let ticket = pending.ticket();
            if let Some(advice) = pending.wait() {
                self.apply_advice(ticket, advice);
            }
        }
    }

    fn apply_question(&mut self, ticket: u64, question: Question) {
        if !self.tickets.is_current(ticket) {
            log::debug!("Discarding stale question {} (ticket {ticket})", question.id);
            return;
        }
        let mode = match self.screen {
            AppScreen::Quiz => AnswerMode::Practice,
            AppScreen::Diagnostic => AnswerMode::Diagnostic,
            other => {
                log::debug!("Question arrived on {other:?}; ignoring");
                return;
            }
        };
        self.quiz = Some(QuizState::new(question, mode));
        self.quiz_ticket = ticket;
    }

    fn apply_mock(&mut self, ticket: u64, questions: Vec<Question>) {
        if !self.tickets.is_current(ticket) || self.screen != AppScreen::MockExam {
            log::debug!("Discarding stale mock exam (ticket {ticket})");
            return;
        }
        self.mock.start(questions);
    }

    fn apply_advice(&mut self, ticket: u64, advice: StudyRecommendation) {
        if !self.advice_tickets.is_current(ticket) {
            log::debug!("Discarding stale study analysis (ticket {ticket})");
            return;
        }
        self.stats = progress::with_study_advice(&self.stats, advice);
        self.save_data();
    }
}

fn build_providers(
    config: &Config,
    bank: &QuestionBank,
) -> (Arc<dyn QuestionProvider>, Arc<dyn AdviceProvider>) {
    #[cfg(feature = "network")]
    if config.provider == "gemini" {
        match provider::GeminiProvider::from_env(&config.question_model, &config.advice_model) {
            Ok(gemini) => {
                let gemini = Arc::new(gemini);
                return (gemini.clone(), gemini);
            }
            Err(e) => log::warn!("Gemini provider unavailable, using local: {e}"),
        }
    }
    #[cfg(not(feature = "network"))]
    if config.provider == "gemini" {
        log::warn!("Built without the network feature; using the local provider");
    }

    let local = Arc::new(LocalProvider::new(bank.clone()));
    (local.clone(), local)
}

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Deserialize;
use thiserror::Error;

use crate::engine::advice::{self, StudyRecommendation};
use crate::engine::progress::UserStats;
use crate::engine::question::{OPTION_COUNT, Question};
use crate::engine::scoring;
use crate::engine::topic::{Difficulty, Topic};
use crate::generator::bank::QuestionBank;
use crate::generator::selector;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("provider returned no content")]
    EmptyResponse,
    #[error("provider returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("provider returned an invalid {0}")]
    Invalid(&'static str),
}

pub trait QuestionProvider: Send + Sync {
    fn generate_question(
        &self,
        topic: Topic,
        difficulty: Difficulty,
    ) -> Result<Question, ProviderError>;
}

pub trait AdviceProvider: Send + Sync {
    fn generate_advice(&self, stats: &UserStats) -> Result<StudyRecommendation, ProviderError>;
}

// --- Fallbacks ---

pub const FALLBACK_QUESTION_ID: &str = "fallback-1";

/// Served whenever question generation fails.
pub fn fallback_question() -> Question {
    Question {
        id: FALLBACK_QUESTION_ID.to_string(),
        year: 2024,
        question_number: 5,
        problem_text: "A rectangular garden has a length that is 3 times its width. If the \
            perimeter is 48 meters, what is the area of the garden in square meters?"
            .to_string(),
        options: ["27", "54", "108", "144", "216"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        correct_option_index: 2,
        explanation: "Let w be the width, so the length is 3w. The perimeter is 2(w + 3w) = 8w \
            = 48, so w = 6 and the length is 18. The area is 6 * 18 = 108."
            .to_string(),
        hint: "Use P = 2(L + W) and substitute L = 3W.".to_string(),
        topic: Topic::Geometry,
        difficulty: Difficulty::Medium,
    }
}

pub fn question_or_fallback(
    provider: &dyn QuestionProvider,
    topic: Topic,
    difficulty: Difficulty,
) -> Question {
    provider
        .generate_question(topic, difficulty)
        .unwrap_or_else(|e| {
            log::warn!("Question generation failed, using fallback: {e}");
            fallback_question()
        })
}

pub fn advice_or_fallback(provider: &dyn AdviceProvider, stats: &UserStats) -> StudyRecommendation {
    provider.generate_advice(stats).unwrap_or_else(|e| {
        log::warn!("Study analysis failed, using fallback: {e}");
        advice::fallback_recommendation()
    })
}

// --- Local provider ---

/// Serves questions from the bundled bank and rule-based advice. Never fails.
pub struct LocalProvider {
    bank: QuestionBank,
}

impl LocalProvider {
    pub fn new(bank: QuestionBank) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }
}

impl QuestionProvider for LocalProvider {
    fn generate_question(
        &self,
        topic: Topic,
        difficulty: Difficulty,
    ) -> Result<Question, ProviderError> {
        let mut rng = SmallRng::from_entropy();
        Ok(selector::select_question(&self.bank, topic, difficulty, &mut rng))
    }
}

impl AdviceProvider for LocalProvider {
    fn generate_advice(&self, stats: &UserStats) -> Result<StudyRecommendation, ProviderError> {
        Ok(advice::analyze(stats))
    }
}

// --- Prompts and response parsing for remote providers ---

fn difficulty_guidance(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "Questions 1-5 level (basic arithmetic, simple geometry, direct logic).",
        Difficulty::Medium => {
            "Questions 6-15 level (multi-step algebra, area/perimeter puzzles, basic probability)."
        }
        Difficulty::Hard => {
            "Questions 16-25 level (complex number theory, 3D geometry, advanced counting)."
        }
        Difficulty::Competition => {
            "Random mix: pick Easy, Medium or Hard at random and report which one you chose."
        }
    }
}

pub fn question_prompt(topic: Topic, difficulty: Difficulty) -> String {
    format!(
        "You are an expert AMC 8 problem writer. Write one new multiple-choice problem in the \
         style of AMC 8 contests from 1999-2024.\n\
         Topic: {topic}\n\
         Difficulty: {difficulty} - {}\n\
         Requirements: exactly {OPTION_COUNT} options with plausible distractors; concise MAA \
         wording; do not copy an existing problem.\n\
         Respond with JSON only: {{\"problemText\": string, \"options\": [string x5], \
         \"correctOptionIndex\": 0-4, \"explanation\": string, \"hint\": string, \
         \"year\": int, \"questionNumber\": int, \"difficulty\": \"Easy\"|\"Medium\"|\"Hard\"}}",
        difficulty_guidance(difficulty)
    )
}

pub fn advice_prompt(stats: &UserStats) -> String {
    let mastery = stats
        .mastery_by_topic
        .iter()
        .map(|(t, s)| format!("{t}: {s}/100"))
        .collect::<Vec<_>>()
        .join(", ");
    let start = stats.history.len().saturating_sub(advice::TREND_WINDOW);
    let recent = stats.history[start..]
        .iter()
        .map(|a| {
            let outcome = if a.correct { "Correct" } else { "Incorrect" };
            format!("{} ({}): {outcome}", a.topic, a.difficulty)
        })
        .collect::<Vec<_>>()
        .join("; ");
    let recent_pct = (stats.recent_accuracy(advice::TREND_WINDOW) * 100.0).round() as i64;
    let overall_pct = scoring::accuracy_percent(stats.correct, stats.total) as i64;
    let trend = if recent_pct > overall_pct + 10 {
        "Significantly Improving"
    } else if recent_pct < overall_pct - 10 {
        "Declining"
    } else {
        "Stable"
    };

    format!(
        "Analyze this student's AMC 8 performance and suggest a study path.\n\
         Current mastery: {mastery}\n\
         Recent activity: {recent}\n\
         Total problems solved: {}\n\
         Recent accuracy (last {}): {recent_pct}%\n\
         Overall accuracy: {overall_pct}%\n\
         Trend: {trend}\n\
         Respond with JSON only: {{\"focusAreas\": [topic], \"strengthAreas\": [topic], \
         \"advice\": string (max 2 sentences, mention the trend if significant), \
         \"nextMilestone\": short phrase}}. Topics must be chosen from: {}.",
        stats.total,
        advice::TREND_WINDOW,
        Topic::concrete()
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestion {
    problem_text: String,
    options: Vec<String>,
    correct_option_index: usize,
    explanation: String,
    hint: String,
    #[serde(default)]
    year: Option<u32>,
    #[serde(default)]
    question_number: Option<u32>,
    #[serde(default)]
    difficulty: Option<String>,
}

fn parse_difficulty(reported: Option<&str>, requested: Difficulty) -> Difficulty {
    let reported = reported.map(str::to_ascii_lowercase).unwrap_or_default();
    if reported.contains("easy") {
        Difficulty::Easy
    } else if reported.contains("medium") {
        Difficulty::Medium
    } else if reported.contains("hard") {
        Difficulty::Hard
    } else if requested.is_wildcard() {
        Difficulty::Medium
    } else {
        requested
    }
}

/// Turn a model's JSON answer into a question for the requested topic.
pub fn parse_generated_question(
    text: &str,
    topic: Topic,
    requested: Difficulty,
) -> Result<Question, ProviderError> {
    let raw: GeneratedQuestion = serde_json::from_str(text.trim())?;
    let question = Question {
        id: uuid::Uuid::new_v4().to_string(),
        year: raw.year.unwrap_or(2024),
        question_number: raw.question_number.unwrap_or(1),
        problem_text: raw.problem_text,
        options: raw.options,
        correct_option_index: raw.correct_option_index,
        explanation: raw.explanation,
        hint: raw.hint,
        topic,
        difficulty: parse_difficulty(raw.difficulty.as_deref(), requested),
    };
    if question.problem_text.trim().is_empty() || !question.is_well_formed() {
        return Err(ProviderError::Invalid("question"));
    }
    Ok(question)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedAdvice {
    focus_areas: Vec<String>,
    strength_areas: Vec<String>,
    advice: String,
    next_milestone: String,
}

fn known_topics(names: &[String]) -> Vec<Topic> {
    names
        .iter()
        .filter_map(|n| Topic::from_name(n))
        .filter(|t| !t.is_wildcard())
        .collect()
}

/// Turn a model's JSON answer into a recommendation, dropping unknown topics.
pub fn parse_generated_advice(text: &str) -> Result<StudyRecommendation, ProviderError> {
    let raw: GeneratedAdvice = serde_json::from_str(text.trim())?;
    if raw.advice.trim().is_empty() {
        return Err(ProviderError::Invalid("recommendation"));
    }
    Ok(StudyRecommendation {
        focus_areas: known_topics(&raw.focus_areas),
        strength_areas: known_topics(&raw.strength_areas),
        advice: raw.advice,
        next_milestone: raw.next_milestone,
    })
}

/// Pull the generated text out of a `generateContent` response body.
pub fn extract_candidate_text(body: &str) -> Result<String, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    value["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or(ProviderError::EmptyResponse)
}

// --- Gemini provider ---

#[cfg(feature = "network")]
pub struct GeminiProvider {
    api_key: String,
    question_model: String,
    advice_model: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "network")]
impl GeminiProvider {
    const ENDPOINT: &'static str = "https://generativelanguage.googleapis.com/v1beta/models";

    pub fn new(
        api_key: String,
        question_model: &str,
        advice_model: &str,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            api_key,
            question_model: question_model.to_string(),
            advice_model: advice_model.to_string(),
            client,
        })
    }

    pub fn from_env(question_model: &str, advice_model: &str) -> Result<Self, ProviderError> {
        let key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .map_err(|_| ProviderError::MissingApiKey)?;
        Self::new(key, question_model, advice_model)
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });
        let response = self
            .client
            .post(format!("{}/{model}:generateContent", Self::ENDPOINT))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ProviderError::Transport(format!("HTTP {status}")));
        }
        extract_candidate_text(&text)
    }
}

#[cfg(feature = "network")]
impl QuestionProvider for GeminiProvider {
    fn generate_question(
        &self,
        topic: Topic,
        difficulty: Difficulty,
    ) -> Result<Question, ProviderError> {
        let text = self.generate(&self.question_model, &question_prompt(topic, difficulty))?;
        parse_generated_question(&text, topic, difficulty)
    }
}

#[cfg(feature = "network")]
impl AdviceProvider for GeminiProvider {
    fn generate_advice(&self, stats: &UserStats) -> Result<StudyRecommendation, ProviderError> {
        let text = self.generate(&self.advice_model, &advice_prompt(stats))?;
        parse_generated_advice(&text)
    }
}

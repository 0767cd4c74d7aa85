use serde::{Deserialize, Serialize};

use crate::engine::progress::UserStats;
use crate::engine::topic::Topic;

pub const FOCUS_AREA_COUNT: usize = 2;
pub const STRENGTH_AREA_COUNT: usize = 2;
pub const STRENGTH_THRESHOLD: u32 = 40;
pub const TREND_WINDOW: usize = 10;
pub const TREND_GAP: f64 = 0.15;
pub const ONBOARDING_TOTAL: u32 = 5;
pub const TREND_MIN_TOTAL: u32 = 10;
pub const EXCELLENT_ACCURACY: f64 = 0.8;
pub const RECOMPUTE_EVERY: u32 = 5;

pub const CHAMPION_MILESTONE: &str = "AMC 8 Champion";
pub const TERMINAL_MILESTONE: &str = "Maintain Your Excellence";

/// Ascending (total solved, label) pairs; the first one not yet reached is
/// the next milestone.
const MILESTONES: &[(u32, &str)] = &[
    (10, "Complete 10 Problems"),
    (25, "Solve 25 Problems"),
    (50, "Solve 50 Problems"),
    (100, "Veteran Status: 100 Problems"),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecommendation {
    pub focus_areas: Vec<Topic>,
    pub strength_areas: Vec<Topic>,
    pub advice: String,
    pub next_milestone: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdviceBranch {
    Onboarding,
    Improving,
    Slipping,
    Excelling,
    Steady,
}

/// Inputs to advice selection, computed once from the stats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trend {
    pub total: u32,
    pub overall_accuracy: f64,
    pub recent_accuracy: f64,
}

impl Trend {
    pub fn from_stats(stats: &UserStats) -> Self {
        Self {
            total: stats.total,
            overall_accuracy: stats.overall_accuracy(),
            recent_accuracy: stats.recent_accuracy(TREND_WINDOW),
        }
    }

    pub fn branch(&self) -> AdviceBranch {
        if self.total < ONBOARDING_TOTAL {
            AdviceBranch::Onboarding
        } else if self.total >= TREND_MIN_TOTAL
            && self.recent_accuracy > self.overall_accuracy + TREND_GAP
        {
            AdviceBranch::Improving
        } else if self.total >= TREND_MIN_TOTAL
            && self.recent_accuracy < self.overall_accuracy - TREND_GAP
        {
            AdviceBranch::Slipping
        } else if self.overall_accuracy > EXCELLENT_ACCURACY {
            AdviceBranch::Excelling
        } else {
            AdviceBranch::Steady
        }
    }
}

/// Lowest-mastery topics first. Ties keep declaration order.
pub fn focus_areas(stats: &UserStats) -> Vec<Topic> {
    let mut ranked: Vec<(Topic, u32)> = stats.mastery_by_topic.iter().collect();
    ranked.sort_by_key(|&(_, score)| score);
    ranked
        .into_iter()
        .take(FOCUS_AREA_COUNT)
        .map(|(t, _)| t)
        .collect()
}

/// Topics above the strength threshold, highest first. Ties keep
/// declaration order.
pub fn strength_areas(stats: &UserStats) -> Vec<Topic> {
    let mut ranked: Vec<(Topic, u32)> = stats
        .mastery_by_topic
        .iter()
        .filter(|&(_, score)| score > STRENGTH_THRESHOLD)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(STRENGTH_AREA_COUNT)
        .map(|(t, _)| t)
        .collect()
}

pub fn next_milestone(stats: &UserStats) -> String {
    if stats.mastery_by_topic.any_mastered() {
        return CHAMPION_MILESTONE.to_string();
    }
    MILESTONES
        .iter()
        .find(|&&(threshold, _)| stats.total < threshold)
        .map(|&(_, label)| label)
        .unwrap_or(TERMINAL_MILESTONE)
        .to_string()
}

fn advice_text(branch: AdviceBranch, trend: &Trend, focus: &[Topic], strengths: &[Topic]) -> String {
    match branch {
        AdviceBranch::Onboarding => "Welcome! Start with Mixed Practice to gauge your baseline \
            skills across all topics."
            .to_string(),
        AdviceBranch::Improving => format!(
            "You're improving rapidly! Your recent accuracy ({}%) is well above your average \
             ({}%). Consider trying Hard difficulty.",
            (trend.recent_accuracy * 100.0).round(),
            (trend.overall_accuracy * 100.0).round()
        ),
        AdviceBranch::Slipping => "You've hit a bumpy patch recently. Review your Mistake Log \
            before solving new problems."
            .to_string(),
        AdviceBranch::Excelling => "Your fundamentals are excellent. Challenge yourself with \
            Competition Mode or Hard problems."
            .to_string(),
        AdviceBranch::Steady => {
            let focus = focus.first().copied().unwrap_or(Topic::Algebra);
            match strengths.first() {
                Some(strength) => format!(
                    "Steady progress. {strength} is your strongest area; to reach the next \
                     level, focus on {focus} problems."
                ),
                None => format!(
                    "Steady progress. To reach the next level, focus on {focus} problems."
                ),
            }
        }
    }
}

/// Rule-based recommendation. Deterministic for a given `stats`.
pub fn analyze(stats: &UserStats) -> StudyRecommendation {
    let focus = focus_areas(stats);
    let strengths = strength_areas(stats);
    let trend = Trend::from_stats(stats);
    let branch = trend.branch();
    log::debug!("Study analysis selected {branch:?} for {} attempts", stats.total);

    StudyRecommendation {
        advice: advice_text(branch, &trend, &focus, &strengths),
        next_milestone: next_milestone(stats),
        focus_areas: focus,
        strength_areas: strengths,
    }
}

/// Whether the caller should start a new analysis. `in_flight` is true while
/// a previous one has not delivered yet.
pub fn should_recompute(stats: &UserStats, in_flight: bool) -> bool {
    stats.diagnostic_completed
        && (stats.total % RECOMPUTE_EVERY == 0 || stats.study_advice.is_none())
        && !in_flight
}

/// Returned when the external advice provider fails.
pub fn fallback_recommendation() -> StudyRecommendation {
    StudyRecommendation {
        focus_areas: vec![Topic::Algebra, Topic::Geometry],
        strength_areas: Vec::new(),
        advice: "Keep practicing mixed problem sets to identify your specific strengths."
            .to_string(),
        next_milestone: "Complete 10 more practice problems".to_string(),
    }
}

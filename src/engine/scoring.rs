use crate::engine::topic::Difficulty;

pub const XP_PER_LEVEL: u32 = 100;
pub const XP_CONSOLATION: u32 = 1;
pub const XP_DIAGNOSTIC_CORRECT: u32 = 25;
pub const XP_MOCK_CORRECT: u32 = 20;
pub const XP_MOCK_COMPLETION_BONUS: u32 = 50;

pub fn xp_for_correct(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 10,
        Difficulty::Medium => 20,
        Difficulty::Hard => 35,
        Difficulty::Competition => 50,
    }
}

pub fn level_from_xp(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

pub fn xp_to_next_level(xp: u32) -> u32 {
    level_from_xp(xp)
        .saturating_mul(XP_PER_LEVEL)
        .saturating_sub(xp)
}

/// Rounded percentage, 0 when nothing has been attempted.
pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

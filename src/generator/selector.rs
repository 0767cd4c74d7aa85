use rand::Rng;
use rand::seq::SliceRandom;

use crate::engine::question::Question;
use crate::engine::topic::{Difficulty, Topic};
use crate::generator::bank::QuestionBank;

pub const MOCK_LENGTH: usize = 25;

/// Per-difficulty quotas, in exam order.
pub const MOCK_QUOTAS: [(Difficulty, usize); 3] = [
    (Difficulty::Easy, 10),
    (Difficulty::Medium, 10),
    (Difficulty::Hard, 5),
];

/// How far selection had to relax the requested filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionTier {
    Exact,
    TopicOnly,
    Anything,
}

/// Candidate pool for a request, narrowing tier by tier until non-empty.
pub fn candidates(
    bank: &QuestionBank,
    topic: Topic,
    difficulty: Difficulty,
) -> (Vec<&Question>, SelectionTier) {
    let exact = bank.matching(topic, difficulty);
    if !exact.is_empty() {
        return (exact, SelectionTier::Exact);
    }
    if !topic.is_wildcard() {
        let topic_only = bank.matching(topic, Difficulty::Competition);
        if !topic_only.is_empty() {
            return (topic_only, SelectionTier::TopicOnly);
        }
    }
    (bank.all().iter().collect(), SelectionTier::Anything)
}

/// Uniformly pick one question for the request. Returns an owned copy.
pub fn select_question<R: Rng + ?Sized>(
    bank: &QuestionBank,
    topic: Topic,
    difficulty: Difficulty,
    rng: &mut R,
) -> Question {
    let (pool, tier) = candidates(bank, topic, difficulty);
    if tier != SelectionTier::Exact {
        log::debug!("No {difficulty} {topic} questions; selecting from {tier:?} pool");
    }
    // The bank is never empty, so neither is the final tier.
    let picked = pool.choose(rng).copied().unwrap_or(&bank.all()[0]);
    picked.clone()
}

/// Assemble a mock exam: up to 10 Easy, 10 Medium and 5 Hard questions,
/// each block shuffled independently, blocks in ascending difficulty.
pub fn generate_mock_test<R: Rng + ?Sized>(bank: &QuestionBank, rng: &mut R) -> Vec<Question> {
    let mut exam = Vec::with_capacity(MOCK_LENGTH);
    for (difficulty, quota) in MOCK_QUOTAS {
        let mut pool = bank.matching(Topic::Mixed, difficulty);
        if pool.len() < quota {
            log::warn!(
                "Only {} {difficulty} questions available for a mock exam (wanted {quota})",
                pool.len()
            );
        }
        pool.shuffle(rng);
        exam.extend(pool.into_iter().take(quota).cloned());
    }
    exam
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::engine::question::fixtures::question;

    fn sparse_bank() -> QuestionBank {
        QuestionBank::new(vec![
            question("alg-easy", Topic::Algebra, Difficulty::Easy),
            question("alg-med", Topic::Algebra, Difficulty::Medium),
            question("geo-easy", Topic::Geometry, Difficulty::Easy),
        ])
        .unwrap()
    }

    fn bank_with(easy: usize, medium: usize, hard: usize) -> QuestionBank {
        let mut questions = Vec::new();
        for (difficulty, n) in [
            (Difficulty::Easy, easy),
            (Difficulty::Medium, medium),
            (Difficulty::Hard, hard),
        ] {
            for i in 0..n {
                let topic = Topic::concrete()[i % 5];
                questions.push(question(&format!("{}-{i}", difficulty.to_key()), topic, difficulty));
            }
        }
        QuestionBank::new(questions).unwrap()
    }

    #[test]
    fn exact_matches_are_preferred() {
        let bank = sparse_bank();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..20 {
            let q = select_question(&bank, Topic::Algebra, Difficulty::Medium, &mut rng);
            assert_eq!(q.id, "alg-med");
        }
    }

    #[test]
    fn missing_difficulty_relaxes_to_topic() {
        let bank = sparse_bank();
        let (pool, tier) = candidates(&bank, Topic::Geometry, Difficulty::Hard);
        assert_eq!(tier, SelectionTier::TopicOnly);
        assert!(pool.iter().all(|q| q.topic == Topic::Geometry));

        let mut rng = SmallRng::seed_from_u64(1);
        let q = select_question(&bank, Topic::Geometry, Difficulty::Hard, &mut rng);
        assert_eq!(q.id, "geo-easy");
    }

    #[test]
    fn missing_topic_falls_back_to_whole_bank() {
        let bank = sparse_bank();
        let (pool, tier) = candidates(&bank, Topic::Logic, Difficulty::Easy);
        assert_eq!(tier, SelectionTier::Anything);
        assert_eq!(pool.len(), bank.len());
    }

    #[test]
    fn mixed_with_missing_difficulty_skips_topic_tier() {
        let bank = sparse_bank();
        let (_, tier) = candidates(&bank, Topic::Mixed, Difficulty::Hard);
        assert_eq!(tier, SelectionTier::Anything);
    }

    #[test]
    fn wildcards_match_everything_in_scope() {
        let bank = sparse_bank();
        let (pool, tier) = candidates(&bank, Topic::Algebra, Difficulty::Competition);
        assert_eq!(tier, SelectionTier::Exact);
        assert_eq!(pool.len(), 2);
        let (pool, _) = candidates(&bank, Topic::Mixed, Difficulty::Easy);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn selection_returns_independent_copy() {
        let bank = sparse_bank();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut q = select_question(&bank, Topic::Algebra, Difficulty::Easy, &mut rng);
        q.problem_text.push_str(" (edited)");
        assert_eq!(bank.get("alg-easy").unwrap().problem_text, "Problem alg-easy");
    }

    #[test]
    fn builtin_selection_respects_filters() {
        let bank = QuestionBank::builtin().unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        for &topic in Topic::all() {
            for &difficulty in Difficulty::all() {
                let (_, tier) = candidates(&bank, topic, difficulty);
                let q = select_question(&bank, topic, difficulty, &mut rng);
                if tier == SelectionTier::Exact {
                    assert!(topic.is_wildcard() || q.topic == topic);
                    assert!(difficulty.is_wildcard() || q.difficulty == difficulty);
                }
                assert!(!q.difficulty.is_wildcard());
            }
        }
    }

    #[test]
    fn full_mock_has_exact_composition_and_order() {
        let bank = bank_with(14, 12, 8);
        let mut rng = SmallRng::seed_from_u64(11);
        let exam = generate_mock_test(&bank, &mut rng);
        assert_eq!(exam.len(), MOCK_LENGTH);

        let difficulties: Vec<Difficulty> = exam.iter().map(|q| q.difficulty).collect();
        assert!(difficulties[..10].iter().all(|&d| d == Difficulty::Easy));
        assert!(difficulties[10..20].iter().all(|&d| d == Difficulty::Medium));
        assert!(difficulties[20..].iter().all(|&d| d == Difficulty::Hard));

        let ids: HashSet<&str> = exam.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), MOCK_LENGTH);
    }

    #[test]
    fn short_tiers_produce_a_shorter_exam() {
        let bank = bank_with(4, 12, 2);
        let mut rng = SmallRng::seed_from_u64(5);
        let exam = generate_mock_test(&bank, &mut rng);
        assert_eq!(exam.len(), 4 + 10 + 2);
        assert!(exam[..4].iter().all(|q| q.difficulty == Difficulty::Easy));
        assert!(exam[14..].iter().all(|q| q.difficulty == Difficulty::Hard));
    }

    #[test]
    fn builtin_bank_yields_full_mock() {
        let bank = QuestionBank::builtin().unwrap();
        let mut rng = SmallRng::seed_from_u64(99);
        assert_eq!(generate_mock_test(&bank, &mut rng).len(), MOCK_LENGTH);
    }
}

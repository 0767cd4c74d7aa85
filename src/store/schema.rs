use crate::engine::progress::UserStats;

/// Fixed storage key; the snapshot file is `<key>.json`.
pub const STORAGE_KEY: &str = "amc8_stats";

pub fn snapshot_file_name() -> String {
    format!("{STORAGE_KEY}.json")
}

/// Parse a persisted snapshot and bring it up to the current shape.
///
/// Older snapshots may lack `mistakes` (and other late additions); serde
/// defaults fill those in. The mastery map is normalized while
/// deserializing. What remains is derived state that can drift from its
/// source, repaired here.
pub fn parse_snapshot(json: &str) -> Result<UserStats, serde_json::Error> {
    let mut stats: UserStats = serde_json::from_str(json)?;
    if stats.normalize() {
        log::info!(
            "Repaired snapshot on load (level {}, {}/{} correct)",
            stats.level,
            stats.correct,
            stats.total
        );
    }
    Ok(stats)
}

pub fn to_snapshot(stats: &UserStats) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::topic::Topic;

    #[test]
    fn legacy_snapshot_without_mistakes_loads_empty_log() {
        let json = r#"{
            "correct": 3,
            "total": 4,
            "streak": 1,
            "xp": 75,
            "level": 1,
            "masteryByTopic": {"Algebra": 20, "Geometry": 5},
            "history": []
        }"#;
        let stats = parse_snapshot(json).unwrap();
        assert!(stats.mistakes.is_empty());
        assert!(!stats.diagnostic_completed);
        assert_eq!(stats.mastery_by_topic.get(Topic::Algebra), 20);
        assert_eq!(stats.mastery_by_topic.get(Topic::Logic), 0);
    }

    #[test]
    fn derived_fields_are_repaired() {
        let json = r#"{"correct": 9, "total": 4, "streak": 0, "xp": 250, "level": 1}"#;
        let stats = parse_snapshot(json).unwrap();
        assert_eq!(stats.level, 3);
        assert_eq!(stats.correct, 4);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_snapshot("not json").is_err());
        assert!(parse_snapshot(r#"{"correct": "many"}"#).is_err());
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let json = to_snapshot(&UserStats::default()).unwrap();
        assert!(json.contains("\"masteryByTopic\""));
        assert!(json.contains("\"diagnosticCompleted\""));
        assert!(!json.contains("studyAdvice"));
        assert_eq!(snapshot_file_name(), "amc8_stats.json");
    }
}

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::engine::progress::UserStats;
use crate::store::schema;

/// The single persisted snapshot, one JSON file under `base_dir`.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn file_path(&self) -> PathBuf {
        self.base_dir.join(schema::snapshot_file_name())
    }

    /// Load the snapshot. Returns None if the file exists but cannot be
    /// parsed; a missing file is a fresh start, not an error.
    pub fn load_stats(&self) -> Option<UserStats> {
        let path = self.file_path();
        if !path.exists() {
            return Some(UserStats::default());
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Could not read {}: {e}", path.display());
                return None;
            }
        };
        match schema::parse_snapshot(&content) {
            Ok(stats) => Some(stats),
            Err(e) => {
                log::warn!("Discarding unreadable snapshot {}: {e}", path.display());
                None
            }
        }
    }

    /// Write via a temp file and rename so a crash never leaves a torn file.
    pub fn save_stats(&self, stats: &UserStats) -> Result<()> {
        let path = self.file_path();
        let tmp_path = path.with_extension("tmp");

        let json = schema::to_snapshot(stats)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Forget everything. Returns the fresh state the caller should adopt.
    pub fn reset(&self) -> Result<UserStats> {
        let path = self.file_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(UserStats::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::{self, AnswerMode};
    use crate::engine::question::fixtures::question;
    use crate::engine::topic::{Difficulty, Topic};
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_file_loads_default() {
        let (_dir, store) = make_test_store();
        assert!(!store.file_path().exists());
        assert_eq!(store.load_stats(), Some(UserStats::default()));
    }

    #[test]
    fn test_save_then_load_preserves_progress() {
        let (_dir, store) = make_test_store();
        let q = question("g1", Topic::Geometry, Difficulty::Hard);
        let stats = progress::apply_answer(&UserStats::default(), &q, false, AnswerMode::Practice);
        let stats = progress::apply_answer(&stats, &q, true, AnswerMode::Practice);

        store.save_stats(&stats).unwrap();
        let loaded = store.load_stats().unwrap();
        assert_eq!(loaded.total, 2);
        assert_eq!(loaded.xp, 36);
        assert_eq!(loaded.mastery_by_topic.get(Topic::Geometry), 5);
        assert_eq!(loaded.mistakes.len(), 1);
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(
            loaded.history[0].timestamp.timestamp_millis(),
            stats.history[0].timestamp.timestamp_millis()
        );
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let (dir, store) = make_test_store();
        store.save_stats(&UserStats::default()).unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }

    #[test]
    fn test_corrupt_file_returns_none() {
        let (_dir, store) = make_test_store();
        fs::write(store.file_path(), "{ truncated").unwrap();
        assert!(store.load_stats().is_none());
    }

    #[test]
    fn test_snapshot_without_mistakes_migrates() {
        let (_dir, store) = make_test_store();
        fs::write(
            store.file_path(),
            r#"{"correct": 1, "total": 2, "streak": 0, "xp": 11, "level": 1,
                "masteryByTopic": {"Algebra": 3}, "history": []}"#,
        )
        .unwrap();
        let stats = store.load_stats().unwrap();
        assert!(stats.mistakes.is_empty());
        assert_eq!(stats.total, 2);
    }

    #[test]
    fn test_reset_removes_snapshot() {
        let (_dir, store) = make_test_store();
        let mut stats = UserStats::default();
        stats.xp = 500;
        store.save_stats(&stats).unwrap();
        assert!(store.file_path().exists());

        let fresh = store.reset().unwrap();
        assert_eq!(fresh, UserStats::default());
        assert!(!store.file_path().exists());
        // Resetting twice is fine
        assert!(store.reset().is_ok());
    }
}

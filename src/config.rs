use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const MAX_LATENCY_MS: u64 = 5000;
pub const PROVIDERS: &[&str] = &["local", "gemini"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_question_latency_ms")]
    pub question_latency_ms: u64,
    #[serde(default = "default_mock_latency_ms")]
    pub mock_latency_ms: u64,
    #[serde(default = "default_analysis_latency_ms")]
    pub analysis_latency_ms: u64,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_question_model")]
    pub question_model: String,
    #[serde(default = "default_advice_model")]
    pub advice_model: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_question_latency_ms() -> u64 {
    300
}
fn default_mock_latency_ms() -> u64 {
    500
}
fn default_analysis_latency_ms() -> u64 {
    400
}
fn default_provider() -> String {
    "local".to_string()
}
fn default_question_model() -> String {
    "gemini-2.5-pro".to_string()
}
fn default_advice_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("amc8-trainer")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            question_latency_ms: default_question_latency_ms(),
            mock_latency_ms: default_mock_latency_ms(),
            analysis_latency_ms: default_analysis_latency_ms(),
            provider: default_provider(),
            question_model: default_question_model(),
            advice_model: default_advice_model(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("amc8-trainer")
            .join("config.toml")
    }

    /// Clamp latencies and reset an unknown provider to `local`.
    pub fn validate(&mut self) {
        self.question_latency_ms = self.question_latency_ms.min(MAX_LATENCY_MS);
        self.mock_latency_ms = self.mock_latency_ms.min(MAX_LATENCY_MS);
        self.analysis_latency_ms = self.analysis_latency_ms.min(MAX_LATENCY_MS);
        self.provider = self.provider.trim().to_ascii_lowercase();
        if !PROVIDERS.contains(&self.provider.as_str()) {
            log::warn!("Unknown provider {:?}, using local", self.provider);
            self.provider = default_provider();
        }
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }

    /// Zero latency everywhere; used by tests and scripted runs.
    pub fn instant() -> Self {
        Self {
            question_latency_ms: 0,
            mock_latency_ms: 0,
            analysis_latency_ms: 0,
            ..Self::default()
        }
    }

    pub fn question_latency(&self) -> Duration {
        Duration::from_millis(self.question_latency_ms)
    }

    pub fn mock_latency(&self) -> Duration {
        Duration::from_millis(self.mock_latency_ms)
    }

    pub fn analysis_latency(&self) -> Duration {
        Duration::from_millis(self.analysis_latency_ms)
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

//! Configuration for reviewdesk.
//!
//! Loaded from `~/.reviewdesk/config.json` (all sections optional), then
//! overridden by `REVIEWDESK_*` environment variables and the service
//! credentials each client expects (`OPENREVIEW_USERNAME`,
//! `OPENREVIEW_PASSWORD`, `OPENAI_API_KEY`). A `.env` file in the working
//! directory is loaded first.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ReviewDeskError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub openreview: OpenReviewConfig,
    pub llm: LlmConfig,
    pub sheets: SheetsConfig,
    pub ac_tasks: AcTasksConfig,
    pub relevance: RelevanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory for memoized records.
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: Config::dir().join("cache"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenReviewConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OpenReviewConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api2.openreview.net".to_string(),
            username: None,
            password: None,
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for OpenReviewConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenReviewConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name; must be in the pricing table.
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Path to the Google service-account JSON key.
    pub key_file: Option<PathBuf>,
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    pub batch_size: usize,
    pub api_base: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            key_file: None,
            spreadsheet_id: None,
            sheet_name: "Discussion".to_string(),
            batch_size: 1000,
            api_base: "https://sheets.googleapis.com/v4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcTasksConfig {
    pub conference_id: String,
}

impl Default for AcTasksConfig {
    fn default() -> Self {
        Self {
            conference_id: "NeurIPS.cc/2024/Conference".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Venue id matched against `content.venueid`.
    pub venue_id: String,
    pub keywords: Vec<String>,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            venue_id: "ICML.cc/2024/Conference".to_string(),
            keywords: [
                "LLM",
                "Security",
                "Black box",
                "Foundational models",
                "Reverse-engineering",
                "Extraction",
                "Safety",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Config {
    /// `~/.reviewdesk`
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".reviewdesk")
    }

    /// `~/.reviewdesk/config.json`
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default path with environment overrides applied.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load from `path` (missing file means defaults) with environment
    /// overrides applied.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str::<Config>(&data).map_err(|e| {
                ReviewDeskError::Config(format!("Invalid config at {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Config::default()
            }
            Err(e) => {
                return Err(ReviewDeskError::Config(format!(
                    "Failed to read config at {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(root) = var("REVIEWDESK_CACHE_ROOT") {
            self.cache.root = PathBuf::from(root);
        }
        if let Some(url) = var("REVIEWDESK_OPENREVIEW_BASE_URL") {
            self.openreview.base_url = url;
        }
        if let Some(user) = var("OPENREVIEW_USERNAME") {
            self.openreview.username = Some(user);
        }
        if let Some(pass) = var("OPENREVIEW_PASSWORD") {
            self.openreview.password = Some(pass);
        }
        if let Some(model) = var("REVIEWDESK_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base) = var("REVIEWDESK_LLM_API_BASE") {
            self.llm.api_base = base;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(key_file) = var("REVIEWDESK_SHEETS_KEY_FILE") {
            self.sheets.key_file = Some(PathBuf::from(key_file));
        }
        if let Some(id) = var("REVIEWDESK_SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = Some(id);
        }
        if let Some(name) = var("REVIEWDESK_SHEETS_SHEET_NAME") {
            self.sheets.sheet_name = name;
        }
        if let Some(conf) = var("REVIEWDESK_CONFERENCE_ID") {
            self.ac_tasks.conference_id = conf;
        }
        if let Some(venue) = var("REVIEWDESK_VENUE_ID") {
            self.relevance.venue_id = venue;
        }
        if let Some(keywords) = var("REVIEWDESK_KEYWORDS") {
            self.relevance.keywords = split_list(&keywords);
        }
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.openreview.base_url, "https://api2.openreview.net");
        assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
        assert!((cfg.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.sheets.batch_size, 1000);
        assert_eq!(cfg.sheets.sheet_name, "Discussion");
        assert_eq!(cfg.relevance.keywords.len(), 7);
        assert!(cfg.cache.root.ends_with(".reviewdesk/cache"));
    }

    #[test]
    fn test_config_deserialize_partial() {
        let json = r#"{"llm": {"model": "gpt-4o"}, "cache": {"root": "/tmp/rd"}}"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert_eq!(cfg.llm.api_base, "https://api.openai.com/v1"); // default
        assert_eq!(cfg.cache.root, PathBuf::from("/tmp/rd"));
        assert_eq!(cfg.ac_tasks.conference_id, "NeurIPS.cc/2024/Conference");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OPENREVIEW_USERNAME", "ac@example.org"),
            ("OPENREVIEW_PASSWORD", "hunter2"),
            ("OPENAI_API_KEY", "sk-test"),
            ("REVIEWDESK_KEYWORDS", "LLM, Safety,,"),
            ("REVIEWDESK_CACHE_ROOT", "/var/tmp/rd"),
            ("REVIEWDESK_SHEETS_SHEET_NAME", "   "),
        ]
        .into();
        let mut cfg = Config::default();
        cfg.apply_env_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.openreview.username.as_deref(), Some("ac@example.org"));
        assert_eq!(cfg.openreview.password.as_deref(), Some("hunter2"));
        assert_eq!(cfg.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.relevance.keywords, vec!["LLM", "Safety"]);
        assert_eq!(cfg.cache.root, PathBuf::from("/var/tmp/rd"));
        assert_eq!(cfg.sheets.sheet_name, "Discussion", "blank values ignored");
    }

    #[test]
    fn test_load_from_path_invalid_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ReviewDeskError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_path_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"sheets": {"spreadsheet_id": "abc123"}}"#).unwrap();
        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.sheets.spreadsheet_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut cfg = Config::default();
        cfg.openreview.password = Some("hunter2".into());
        cfg.llm.api_key = Some("sk-secret".into());
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}

//! Configuration management for gapfill
//!
//! Stores settings in ~/.config/gapfill/config.json. Environment variables
//! prefixed with `GAPFILL_` override values read from the file.

use crate::gap::DEFAULT_CONTEXT_WINDOW;
use crate::guardrails::ValidationLevel;
use crate::llm::strategy::{DEFAULT_BATCHED_MAX_MARKERS, DEFAULT_TOKEN_THRESHOLD};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the inference service
    pub inference_url: String,
    /// Generation endpoint, joined onto `inference_url`
    pub inference_endpoint: String,
    /// Per-call inference timeout
    pub timeout_secs: u64,
    pub validation_level: ValidationLevel,
    /// Length bounds for the final text; unset falls back to the domain's
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Longest accepted single fill, in characters
    pub max_fill_length: usize,
    /// Cap on alternatives kept per gap
    pub max_alternatives: usize,
    /// Characters of context on each side of a gap in per-gap prompts
    pub context_window: usize,
    pub token_threshold: usize,
    pub batched_max_markers: usize,
    pub enable_grammar_fix: bool,
    pub enable_guardrails: bool,
    /// Log rendered prompts at debug level
    pub log_requests: bool,
    /// Log raw model output at debug level
    pub log_responses: bool,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Extra domains (TOML)
    pub domains_file: Option<PathBuf>,
    /// Items processed concurrently within one batch
    pub max_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference_url: "http://localhost:8000".to_string(),
            inference_endpoint: "/generate".to_string(),
            timeout_secs: 600,
            validation_level: ValidationLevel::Normal,
            min_length: None,
            max_length: None,
            max_fill_length: 100,
            max_alternatives: 5,
            context_window: DEFAULT_CONTEXT_WINDOW,
            token_threshold: DEFAULT_TOKEN_THRESHOLD,
            batched_max_markers: DEFAULT_BATCHED_MAX_MARKERS,
            enable_grammar_fix: true,
            enable_guardrails: true,
            log_requests: true,
            log_responses: false,
            log_level: "info".to_string(),
            domains_file: None,
            max_concurrency: 4,
        }
    }
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gapfill"))
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from the default location with environment overrides.
    /// A missing file yields defaults.
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::read_file(&path).unwrap_or_else(|err| {
                eprintln!("  Warning: {:#}. Using defaults.", err);
                Self::default()
            }),
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config
    }

    /// Load config from an explicit path with environment overrides. Unlike
    /// [`Config::load`], a missing file is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                preserve_corrupt_config(path, &content);
                eprintln!(
                    "  Warning: Config file was corrupted ({}). A backup was saved and defaults were loaded.",
                    err
                );
                Ok(Self::default())
            }
        }
    }

    /// Save config to `path`, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> anyhow::Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path().context("Could not determine config directory")?,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        write_config_atomic(&path, &content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(path)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `GAPFILL_*` overrides from `lookup`. Unparseable values are
    /// reported and ignored.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("GAPFILL_INFERENCE_URL") {
            self.inference_url = v;
        }
        if let Some(v) = get("GAPFILL_INFERENCE_ENDPOINT") {
            self.inference_endpoint = v;
        }
        if let Some(v) = get("GAPFILL_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("GAPFILL_DOMAINS_FILE") {
            self.domains_file = Some(PathBuf::from(v));
        }
        if let Some(v) = get("GAPFILL_VALIDATION_LEVEL") {
            match v.parse() {
                Ok(level) => self.validation_level = level,
                Err(err) => eprintln!("  Warning: GAPFILL_VALIDATION_LEVEL: {}", err),
            }
        }

        override_parsed(&get, "GAPFILL_TIMEOUT_SECS", &mut self.timeout_secs);
        override_parsed(&get, "GAPFILL_MAX_FILL_LENGTH", &mut self.max_fill_length);
        override_parsed(&get, "GAPFILL_MAX_ALTERNATIVES", &mut self.max_alternatives);
        override_parsed(&get, "GAPFILL_MAX_CONCURRENCY", &mut self.max_concurrency);
        override_parsed(&get, "GAPFILL_GRAMMAR_FIX", &mut self.enable_grammar_fix);
        override_parsed(&get, "GAPFILL_GUARDRAILS", &mut self.enable_guardrails);

        let mut min_length = self.min_length.unwrap_or_default();
        if override_parsed(&get, "GAPFILL_MIN_LENGTH", &mut min_length) {
            self.min_length = Some(min_length);
        }
        let mut max_length = self.max_length.unwrap_or_default();
        if override_parsed(&get, "GAPFILL_MAX_LENGTH", &mut max_length) {
            self.max_length = Some(max_length);
        }
    }

    /// Concurrency limit, never zero.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

fn override_parsed<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> bool {
    let Some(raw) = get(key) else {
        return false;
    };
    match raw.to_lowercase().parse::<T>() {
        Ok(value) => {
            *target = value;
            true
        }
        Err(_) => {
            eprintln!("  Warning: ignoring {}={:?} (not a valid value)", key, raw);
            false
        }
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::fs::OpenOptions;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
            eprintln!("  Warning: Failed to set temp config file permissions: {}", e);
        }
    }

    file.write_all(content.as_bytes())?;
    drop(file);

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.inference_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(config.validation_level, ValidationLevel::Normal);
        assert!(config.min_length.is_none());
        assert_eq!(config.max_concurrency, 4);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"timeout_secs": 60, "validation_level": "strict"}"#).unwrap();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.validation_level, ValidationLevel::Strict);
        assert_eq!(config.inference_endpoint, "/generate");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("GAPFILL_INFERENCE_URL", "http://gpu:9000"),
            ("GAPFILL_TIMEOUT_SECS", "60"),
            ("GAPFILL_VALIDATION_LEVEL", "LENIENT"),
            ("GAPFILL_GRAMMAR_FIX", "False"),
            ("GAPFILL_MAX_LENGTH", "900"),
            ("GAPFILL_MAX_CONCURRENCY", " 8 "),
        ]));
        assert_eq!(config.inference_url, "http://gpu:9000");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.validation_level, ValidationLevel::Lenient);
        assert!(!config.enable_grammar_fix);
        assert_eq!(config.max_length, Some(900));
        assert_eq!(config.min_length, None);
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("GAPFILL_TIMEOUT_SECS", "soon"),
            ("GAPFILL_VALIDATION_LEVEL", "paranoid"),
            ("GAPFILL_MIN_LENGTH", "-3"),
        ]));
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(config.validation_level, ValidationLevel::Normal);
        assert_eq!(config.min_length, None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            max_alternatives: 2,
            domains_file: Some(PathBuf::from("/etc/gapfill/domains.toml")),
            ..Config::default()
        };
        let written = config.save(Some(&path)).unwrap();
        assert_eq!(written, path);
        assert!(!path.with_extension("tmp").exists());

        let loaded = Config::read_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_corrupt_file_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded = Config::read_file(&path).unwrap();
        assert_eq!(loaded, Config::default());
        assert!(path.with_extension("json.corrupt").exists());
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_concurrency_never_zero() {
        let config = Config {
            max_concurrency: 0,
            ..Config::default()
        };
        assert_eq!(config.concurrency(), 1);
    }
}

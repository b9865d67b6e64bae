//! Configuration management module.
//!
//! This module handles loading and managing configuration from various sources:
//! - Global config file (~/.config/typechat/typechat.json)
//! - Project config file (./typechat.json or ./typechat.jsonc, or under .typechat/)
//! - Environment variables
//!
//! Configuration follows a layered approach where project config overrides global config.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::fs;
use tracing::warn;

use crate::message::ExtractOptions;
use crate::progress::{self, ProgressCycler};
use crate::render::code_view;
use crate::reveal::DelayPolicy;

const CONFIG_NAMES: [&str; 2] = ["typechat.jsonc", "typechat.json"];
const PROJECT_DIR: &str = ".typechat";

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid trailing comma pattern"));
static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{env:([^}]+)\}").expect("valid env reference pattern"));

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// JSON schema reference
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Log level (tracing filter directive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Code highlighting theme
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    /// Typing animation settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal: Option<RevealConfig>,

    /// Think/code block extraction settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<BlocksConfig>,

    /// Generating-status cycler settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RevealConfig {
    pub min_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct BlocksConfig {
    pub think_open: Option<String>,
    pub think_close: Option<String>,
    pub fallback_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ProgressConfig {
    pub interval_ms: Option<u64>,
    pub prefix: Option<String>,
    pub suffixes: Option<Vec<String>>,
}

impl RevealConfig {
    fn merge(mut self, other: RevealConfig) -> Self {
        if other.min_delay_ms.is_some() {
            self.min_delay_ms = other.min_delay_ms;
        }
        if other.max_delay_ms.is_some() {
            self.max_delay_ms = other.max_delay_ms;
        }
        self
    }
}

impl BlocksConfig {
    fn merge(mut self, other: BlocksConfig) -> Self {
        if other.think_open.is_some() {
            self.think_open = other.think_open;
        }
        if other.think_close.is_some() {
            self.think_close = other.think_close;
        }
        if other.fallback_language.is_some() {
            self.fallback_language = other.fallback_language;
        }
        self
    }
}

impl ProgressConfig {
    fn merge(mut self, other: ProgressConfig) -> Self {
        if other.interval_ms.is_some() {
            self.interval_ms = other.interval_ms;
        }
        if other.prefix.is_some() {
            self.prefix = other.prefix;
        }
        if other.suffixes.is_some() {
            self.suffixes = other.suffixes;
        }
        self
    }
}

fn merge_section<T: Default>(
    ours: Option<T>,
    theirs: Option<T>,
    merge: impl FnOnce(T, T) -> T,
) -> Option<T> {
    match (ours, theirs) {
        (Some(a), Some(b)) => Some(merge(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl Config {
    /// Load configuration from all sources
    pub async fn load() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load_layers(Self::global_config_path(), &cwd).await
    }

    /// Load the global file (if any) and the nearest project file above `start`
    pub async fn load_layers(global_path: Option<PathBuf>, start: &Path) -> Result<Self> {
        let mut config = Config::default();

        // Load global config
        if let Some(global_path) = global_path {
            if let Some(global_config) = Self::load_file(&global_path).await? {
                config = config.merge(global_config);
            }
        }

        // Load project config
        if let Some(project_path) = Self::find_project_config(start) {
            if let Some(project_config) = Self::load_file(&project_path).await? {
                config = config.merge(project_config);
            }
        }

        // Apply environment variable overrides
        config = config.apply_env_overrides();

        Ok(config)
    }

    /// Get the global config directory path
    pub fn global_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("typechat"))
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|p| p.join("typechat.json"))
    }

    /// Find project config file in `start` or its parent directories
    pub fn find_project_config(start: &Path) -> Option<PathBuf> {
        let mut current = Some(start);

        while let Some(dir) = current {
            for candidate in [dir.to_path_buf(), dir.join(PROJECT_DIR)] {
                for filename in CONFIG_NAMES {
                    let config_path = candidate.join(filename);
                    if config_path.is_file() {
                        return Some(config_path);
                    }
                }
            }

            current = dir.parent();
        }

        None
    }

    /// Load configuration from a file
    async fn load_file(path: &Path) -> Result<Option<Config>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&content)
            .map(Some)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse JSON or JSONC config text
    pub fn parse(content: &str) -> Result<Config> {
        // Handle empty or whitespace-only files
        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        let content = Self::strip_jsonc_comments(content);
        let content = Self::strip_trailing_commas(&content);
        let content = Self::substitute_env_vars(&content);

        Ok(serde_json::from_str(&content)?)
    }

    /// Strip comments from JSONC content
    fn strip_jsonc_comments(content: &str) -> String {
        let mut result = String::new();
        let mut in_string = false;
        let mut escaped = false;
        let mut in_line_comment = false;
        let mut in_block_comment = false;
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if in_line_comment {
                if c == '\n' {
                    in_line_comment = false;
                    result.push(c);
                }
                continue;
            }

            if in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    in_block_comment = false;
                }
                continue;
            }

            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                result.push(c);
                continue;
            }

            match (c, chars.peek()) {
                ('"', _) => in_string = true,
                ('/', Some('/')) => {
                    chars.next();
                    in_line_comment = true;
                    continue;
                }
                ('/', Some('*')) => {
                    chars.next();
                    in_block_comment = true;
                    continue;
                }
                _ => {}
            }

            result.push(c);
        }

        result
    }

    /// Strip trailing commas from JSON (common in JSONC)
    fn strip_trailing_commas(content: &str) -> String {
        TRAILING_COMMA.replace_all(content, "$1").to_string()
    }

    /// Substitute environment variables in the format {env:VAR_NAME}
    fn substitute_env_vars(content: &str) -> String {
        ENV_REFERENCE
            .replace_all(content, |caps: &regex::Captures| {
                std::env::var(&caps[1]).unwrap_or_default()
            })
            .to_string()
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(mut self, other: Config) -> Self {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.theme.is_some() {
            self.theme = other.theme;
        }

        self.reveal = merge_section(self.reveal, other.reveal, RevealConfig::merge);
        self.blocks = merge_section(self.blocks, other.blocks, BlocksConfig::merge);
        self.progress = merge_section(self.progress, other.progress, ProgressConfig::merge);

        self
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(log_level) = std::env::var("TYPECHAT_LOG_LEVEL") {
            self.log_level = Some(log_level);
        }
        if let Ok(theme) = std::env::var("TYPECHAT_THEME") {
            self.theme = Some(theme);
        }
        if let Ok(language) = std::env::var("TYPECHAT_FALLBACK_LANGUAGE") {
            self.blocks.get_or_insert_with(BlocksConfig::default).fallback_language =
                Some(language);
        }
        self
    }

    /// Per-character delay range for the typing animation
    pub fn delay_policy(&self) -> DelayPolicy {
        let defaults = DelayPolicy::default();
        let reveal = self.reveal.clone().unwrap_or_default();
        let min = reveal
            .min_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.min);
        let max = reveal
            .max_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.max);

        if max <= min {
            warn!(?min, ?max, "reveal delay range is empty, using a fixed delay");
        }

        DelayPolicy::new(min, max)
    }

    /// Extractor settings; empty delimiters fall back to the defaults
    pub fn extract_options(&self) -> ExtractOptions {
        let defaults = ExtractOptions::default();
        let blocks = self.blocks.clone().unwrap_or_default();

        let non_empty = |value: Option<String>, fallback: String, key: &str| match value {
            Some(v) if !v.is_empty() => v,
            Some(_) => {
                warn!(key, "ignoring empty value");
                fallback
            }
            None => fallback,
        };

        ExtractOptions {
            think_open: non_empty(blocks.think_open, defaults.think_open, "blocks.think_open"),
            think_close: non_empty(blocks.think_close, defaults.think_close, "blocks.think_close"),
            fallback_language: non_empty(
                blocks.fallback_language,
                defaults.fallback_language,
                "blocks.fallback_language",
            ),
        }
    }

    /// Build an idle status cycler from the progress section
    pub fn progress_cycler(&self, prefix_override: Option<&str>) -> ProgressCycler {
        let section = self.progress.clone().unwrap_or_default();
        let prefix = prefix_override
            .map(str::to_string)
            .or(section.prefix)
            .unwrap_or_else(|| progress::DEFAULT_PREFIX.to_string());
        let suffixes = section.suffixes.unwrap_or_else(progress::default_suffixes);
        let interval = section
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(progress::DEFAULT_INTERVAL);

        ProgressCycler::new(prefix, suffixes, interval)
    }

    /// Highlighting theme, falling back to the default for unknown names
    pub fn theme_name(&self) -> String {
        match self.theme.as_deref() {
            Some(theme) if code_view::is_known_theme(theme) => theme.to_string(),
            Some(theme) => {
                warn!(theme, "unknown highlighting theme, using default");
                code_view::DEFAULT_THEME.to_string()
            }
            None => code_view::DEFAULT_THEME.to_string(),
        }
    }

    /// Configuration with every setting spelled out
    pub fn defaults() -> Self {
        let delay = DelayPolicy::default();
        let extract = ExtractOptions::default();

        Config {
            schema: None,
            log_level: Some("info".to_string()),
            theme: Some(code_view::DEFAULT_THEME.to_string()),
            reveal: Some(RevealConfig {
                min_delay_ms: Some(delay.min.as_millis() as u64),
                max_delay_ms: Some(delay.max.as_millis() as u64),
            }),
            blocks: Some(BlocksConfig {
                think_open: Some(extract.think_open),
                think_close: Some(extract.think_close),
                fallback_language: Some(extract.fallback_language),
            }),
            progress: Some(ProgressConfig {
                interval_ms: Some(progress::DEFAULT_INTERVAL.as_millis() as u64),
                prefix: Some(progress::DEFAULT_PREFIX.to_string()),
                suffixes: Some(progress::default_suffixes()),
            }),
        }
    }

    /// Create a default config file if it doesn't exist
    pub async fn init() -> Result<PathBuf> {
        let config_dir = Self::global_config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Self::init_in(&config_dir).await
    }

    /// Write the default config file into `config_dir` unless one exists
    pub async fn init_in(config_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(config_dir)
            .await
            .context("Failed to create config directory")?;

        let config_path = config_dir.join("typechat.json");

        if !config_path.exists() {
            let content = serde_json::to_string_pretty(&Self::defaults())?;
            fs::write(&config_path, content)
                .await
                .context("Failed to write default config file")?;
        }

        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_jsonc_comments() {
        let input = r#"{
            // This is a comment
            "key": "value", // inline comment
            /* block
               comment */
            "url": "http://example.com/a\"b//c"
        }"#;

        let result = Config::strip_jsonc_comments(input);
        assert!(!result.contains("This is a comment"));
        assert!(!result.contains("/*"));
        assert!(result.contains(r#""key": "value""#));
        assert!(result.contains(r#""url": "http://example.com/a\"b//c""#));
    }

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("TYPECHAT_TEST_VAR", "test_value");
        let input = r#"{"key": "{env:TYPECHAT_TEST_VAR}"}"#;
        let result = Config::substitute_env_vars(input);
        assert_eq!(result, r#"{"key": "test_value"}"#);
    }

    #[test]
    fn test_strip_trailing_commas() {
        let input = r#"{
            "reveal": {
                "min_delay_ms": 5,
            },
            "progress": { "suffixes": ["a", "b",], },
        }"#;

        let parsed = Config::parse(input).unwrap();
        assert_eq!(parsed.reveal.unwrap().min_delay_ms, Some(5));
        assert_eq!(
            parsed.progress.unwrap().suffixes,
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        assert_eq!(Config::parse("   \n  \t  ").unwrap(), Config::default());
    }

    #[test]
    fn test_merge_configs() {
        let global = Config {
            theme: Some("InspiredGitHub".to_string()),
            reveal: Some(RevealConfig {
                min_delay_ms: Some(1),
                max_delay_ms: Some(2),
            }),
            ..Default::default()
        };

        let project = Config {
            log_level: Some("debug".to_string()),
            reveal: Some(RevealConfig {
                max_delay_ms: Some(50),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = global.merge(project);
        assert_eq!(merged.theme, Some("InspiredGitHub".to_string()));
        assert_eq!(merged.log_level, Some("debug".to_string()));
        assert_eq!(
            merged.reveal,
            Some(RevealConfig {
                min_delay_ms: Some(1),
                max_delay_ms: Some(50),
            })
        );
    }

    #[test]
    fn test_delay_policy_from_config() {
        assert_eq!(Config::default().delay_policy(), DelayPolicy::default());

        let config = Config {
            reveal: Some(RevealConfig {
                min_delay_ms: Some(0),
                max_delay_ms: Some(5),
            }),
            ..Default::default()
        };
        assert_eq!(config.delay_policy(), DelayPolicy::from_millis(0, 5));
    }

    #[test]
    fn test_extract_options_ignore_empty_delimiters() {
        let config = Config {
            blocks: Some(BlocksConfig {
                think_open: Some(String::new()),
                think_close: Some("</reasoning>".to_string()),
                fallback_language: Some("javascript".to_string()),
            }),
            ..Default::default()
        };

        let options = config.extract_options();
        assert_eq!(options.think_open, "<think>");
        assert_eq!(options.think_close, "</reasoning>");
        assert_eq!(options.fallback_language, "javascript");
    }

    #[test]
    fn test_theme_name_fallback() {
        let config = Config {
            theme: Some("not-a-theme".to_string()),
            ..Default::default()
        };
        assert_eq!(config.theme_name(), code_view::DEFAULT_THEME);
    }

    #[test]
    fn test_progress_cycler_from_config() {
        let config = Config {
            progress: Some(ProgressConfig {
                prefix: Some("Rendering".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(config.progress_cycler(None).text(), "Rendering");
        assert_eq!(config.progress_cycler(Some("Painting")).text(), "Painting");
    }

    #[tokio::test]
    async fn test_project_config_discovery() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(root.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(
            root.path().join(PROJECT_DIR).join("typechat.jsonc"),
            r#"{
                // project settings
                "blocks": { "fallback_language": "rust", },
            }"#,
        )
        .unwrap();

        let found = Config::find_project_config(&nested).unwrap();
        assert!(found.ends_with(".typechat/typechat.jsonc"));

        let config = Config::load_layers(None, &nested).await.unwrap();
        assert_eq!(
            config.blocks.unwrap().fallback_language,
            Some("rust".to_string())
        );
    }

    #[tokio::test]
    async fn test_init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();

        let path = Config::init_in(dir.path()).await.unwrap();
        let written = Config::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, Config::defaults());

        std::fs::write(&path, "{}").unwrap();
        Config::init_in(dir.path()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}

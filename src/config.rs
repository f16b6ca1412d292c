// Configuration file handling

use crate::model::{Attribute, LaunchMode};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Reporter configuration.
///
/// Connection fields (`api_key`, `endpoint`, `project`) are passed through to
/// the client untouched; the reporter itself reads the launch fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    #[serde(default, alias = "apiKey")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub project: Option<String>,

    /// Launch name
    #[serde(default = "default_launch")]
    pub launch: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub attributes: Vec<Attribute>,

    /// Only an explicit `false` changes behaviour
    #[serde(
        default,
        alias = "skippedIssue",
        deserialize_with = "bool_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub skipped_issue: Option<bool>,

    #[serde(default)]
    pub rerun: bool,

    #[serde(default, alias = "rerunOf", skip_serializing_if = "Option::is_none")]
    pub rerun_of: Option<String>,

    #[serde(default)]
    pub mode: LaunchMode,

    /// Launch owned by an outside orchestrator; never finished by this reporter
    #[serde(default, alias = "launchId", skip_serializing_if = "Option::is_none")]
    pub launch_id: Option<String>,

    #[serde(default = "default_true", alias = "extendTestDescriptionWithLastError")]
    pub extend_test_description_with_last_error: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            project: None,
            launch: default_launch(),
            description: None,
            attributes: Vec::new(),
            skipped_issue: None,
            rerun: false,
            rerun_of: None,
            mode: LaunchMode::Default,
            launch_id: None,
            extend_test_description_with_last_error: default_true(),
        }
    }
}

// Default values
pub const ENV_RP_LAUNCH_ID: &str = "RP_LAUNCH_ID";

pub const CONFIG_FILE_NAME: &str = ".rpreporterrc.toml";

pub fn default_launch() -> String {
    String::from("Test Launch")
}

fn default_true() -> bool {
    true
}

fn bool_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => Some(b),
        Some(Flag::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "false" => Some(false),
            "true" => Some(true),
            _ => None,
        },
        None => None,
    })
}

impl ReporterConfig {
    /// Load configuration from default locations
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 1. ./.rpreporterrc.toml (current directory)
        // 2. ~/.rpreporterrc.toml (home directory)

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_FILE_NAME));
        }

        Self::load_first(&paths)
    }

    /// Load the first existing file of `paths`. A file that fails to load is
    /// logged and yields `None`.
    pub fn load_first(paths: &[PathBuf]) -> Option<Self> {
        let path = paths.iter().find(|path| path.exists())?;
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring configuration: {:#}", e);
                None
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> std::result::Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides (`RP_LAUNCH_ID`)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(launch_id) = std::env::var(ENV_RP_LAUNCH_ID)
            && !launch_id.trim().is_empty()
        {
            self.launch_id = Some(launch_id);
        }
        self
    }

    /// File configuration (or defaults) with environment overrides applied
    pub fn resolve() -> Self {
        Self::load().unwrap_or_default().with_env_overrides()
    }

    /// Generate configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
api_key = "secret"
endpoint = "https://reportportal.example/api/v1"
project = "ProjectName"
launch = "LaunchName"
description = "Launch description"
skipped_issue = false
rerun = true
rerun_of = "previous-launch"
mode = "DEBUG"
launch_id = "external-launch"
extend_test_description_with_last_error = false

[[attributes]]
key = "build"
value = "42"

[[attributes]]
value = "nightly"
"#;

        let config = ReporterConfig::parse(toml).expect("Failed to parse config");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.launch, "LaunchName");
        assert_eq!(config.skipped_issue, Some(false));
        assert!(config.rerun);
        assert_eq!(config.rerun_of.as_deref(), Some("previous-launch"));
        assert_eq!(config.mode, LaunchMode::Debug);
        assert_eq!(config.launch_id.as_deref(), Some("external-launch"));
        assert!(!config.extend_test_description_with_last_error);
        assert_eq!(
            config.attributes,
            vec![Attribute::new("build", "42"), Attribute::tag("nightly")]
        );
    }

    #[test]
    fn test_skipped_issue_accepts_string() {
        let config = ReporterConfig::parse("skippedIssue = \"false\"").unwrap();
        assert_eq!(config.skipped_issue, Some(false));

        let config = ReporterConfig::parse("skipped_issue = \"TRUE\"").unwrap();
        assert_eq!(config.skipped_issue, Some(true));

        let config = ReporterConfig::parse("skipped_issue = \"maybe\"").unwrap();
        assert_eq!(config.skipped_issue, None);
    }

    #[test]
    fn test_camel_case_aliases() {
        let config = ReporterConfig::parse(
            "launchId = \"abc\"\nextendTestDescriptionWithLastError = false\nrerunOf = \"r\"",
        )
        .unwrap();
        assert_eq!(config.launch_id.as_deref(), Some("abc"));
        assert!(!config.extend_test_description_with_last_error);
        assert_eq!(config.rerun_of.as_deref(), Some("r"));
    }

    #[test]
    fn test_parse_invalid() {
        let err = ReporterConfig::parse("launch = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_first_skips_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let valid = dir.path().join("valid.toml");
        std::fs::write(&valid, "launch = \"Found\"").unwrap();

        let config =
            ReporterConfig::load_first(&[dir.path().join("absent.toml"), valid]).unwrap();
        assert_eq!(config.launch, "Found");
        assert!(ReporterConfig::load_first(&[dir.path().join("absent.toml")]).is_none());
    }

    #[test]
    fn test_load_first_logs_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&broken, "launch = [").unwrap();

        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .finish();
        let config = tracing::subscriber::with_default(subscriber, || {
            ReporterConfig::load_first(&[broken])
        });

        assert!(config.is_none());
        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("Failed to parse config file"));
    }

    #[derive(Clone, Default)]
    struct Buffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_to_toml_round_trips_defaults() {
        let config = ReporterConfig::default();
        let parsed = ReporterConfig::parse(&config.to_toml()).unwrap();
        assert_eq!(parsed.launch, config.launch);
        assert!(parsed.extend_test_description_with_last_error);
    }
}

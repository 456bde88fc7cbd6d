//! File configuration and the resolved settings a run uses.
//!
//! Configuration comes from a TOML file (see [`FileConfig`]) plus an optional
//! JSON roots file mapping root labels to entry URLs. The binary overlays
//! command-line values onto the file config before calling
//! [`Settings::from_file_config`].

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::convert::{
    CommandConverter, ConversionDispatcher, DEFAULT_CONVERT_ARGS, DEFAULT_CONVERT_EXTENSIONS,
};
use crate::download::DownloadOrchestrator;
use crate::driver::{DEFAULT_READY_TIMEOUT, RootSpec, SyncSettings};
use crate::wait::{
    DEFAULT_BATCH_TIMEOUT, DEFAULT_LISTING_ATTEMPTS, DEFAULT_LISTING_INTERVAL,
    DEFAULT_POLL_INTERVAL, DownloadPolicy, WaitPolicy,
};

/// Directory under the target holding the manifest and the run lock.
pub const STATE_DIR_NAME: &str = ".docmirror";

const MANIFEST_FILE_NAME: &str = "manifest.json";
const LOCK_FILE_NAME: &str = "sync.lock";
const DEFAULT_CONVERT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid roots file {}: {detail}", path.display())]
    RootsFile { path: PathBuf, detail: String },

    #[error("invalid config value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        expected: &'static str,
    },

    #[error("invalid config value for `{field}`: {detail}")]
    Invalid { field: &'static str, detail: String },

    #[error("root `{label}` is configured more than once")]
    DuplicateRoot { label: String },
}

impl ConfigError {
    fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    fn roots_file(path: &Path, detail: impl Into<String>) -> Self {
        Self::RootsFile {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }
}

/// TOML-backed configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Local directory mirroring the remote roots.
    pub target_dir: Option<PathBuf>,
    /// Manifest location; defaults to `<target_dir>/.docmirror/manifest.json`.
    pub manifest_path: Option<PathBuf>,
    /// JSON object mapping root labels to entry URLs.
    pub roots_file: Option<PathBuf>,
    /// Sync only this root.
    pub priority_root: Option<String>,
    pub batch_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub ready_timeout_secs: Option<u64>,
    pub listing_retry_attempts: Option<u32>,
    pub listing_retry_interval_ms: Option<u64>,
    pub max_depth: Option<usize>,
    /// Converter program; conversion is off when unset.
    pub convert_command: Option<String>,
    /// Converter arguments with `{input}` and `{outdir}` placeholders.
    pub convert_args: Option<Vec<String>>,
    pub convert_extensions: Option<Vec<String>>,
    pub convert_timeout_secs: Option<u64>,
    pub roots: Vec<RootSpec>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys;
    /// `path` is only used in the message.
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        Self::from_toml_str(&raw, path)
    }

    /// Validates values against their allowed ranges.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_range("batch_timeout_secs", self.batch_timeout_secs, 1, 3600)?;
        validate_range("poll_interval_ms", self.poll_interval_ms, 10, 60_000)?;
        validate_range("ready_timeout_secs", self.ready_timeout_secs, 1, 600)?;
        validate_range(
            "listing_retry_attempts",
            self.listing_retry_attempts.map(u64::from),
            1,
            50,
        )?;
        validate_range(
            "listing_retry_interval_ms",
            self.listing_retry_interval_ms,
            0,
            60_000,
        )?;
        validate_range("convert_timeout_secs", self.convert_timeout_secs, 1, 3600)?;

        if self
            .convert_command
            .as_deref()
            .is_some_and(|command| command.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "convert_command",
                detail: "must not be empty".to_string(),
            });
        }
        if let Some(label) = &self.priority_root
            && label.trim().is_empty()
        {
            return Err(ConfigError::Invalid {
                field: "priority_root",
                detail: "must not be empty".to_string(),
            });
        }
        for root in &self.roots {
            validate_root(root).map_err(|detail| ConfigError::Invalid {
                field: "roots",
                detail,
            })?;
        }
        Ok(())
    }
}

fn validate_range(
    field: &'static str,
    value: Option<u64>,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            expected: range_label(field),
        });
    }
    Ok(())
}

fn range_label(field: &str) -> &'static str {
    match field {
        "batch_timeout_secs" | "convert_timeout_secs" => "1..=3600",
        "poll_interval_ms" => "10..=60000",
        "ready_timeout_secs" => "1..=600",
        "listing_retry_attempts" => "1..=50",
        _ => "0..=60000",
    }
}

fn validate_root(root: &RootSpec) -> Result<(), String> {
    if root.label.trim().is_empty() {
        return Err("root label must not be empty".to_string());
    }
    if root.url.trim().is_empty() {
        return Err(format!("root `{}` has an empty url", root.label));
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/docmirror/config.toml`
/// 2. `$HOME/.config/docmirror/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("docmirror")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("docmirror")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Reads a roots file: a JSON object of label to entry URL, in file order.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file cannot be read and
/// [`ConfigError::RootsFile`] if it is not an object of strings.
pub fn load_roots_file(path: &Path) -> Result<Vec<RootSpec>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
    parse_roots(&raw, path)
}

fn parse_roots(raw: &str, path: &Path) -> Result<Vec<RootSpec>, ConfigError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ConfigError::roots_file(path, e.to_string()))?;
    let Value::Object(entries) = value else {
        return Err(ConfigError::roots_file(
            path,
            "expected an object of label to url",
        ));
    };
    entries
        .into_iter()
        .map(|(label, url)| match url {
            Value::String(url) => Ok(RootSpec::new(label, url)),
            other => Err(ConfigError::roots_file(
                path,
                format!("url for `{label}` must be a string, got {other}"),
            )),
        })
        .collect()
}

/// Converter settings resolved from the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSettings {
    pub program: String,
    pub args: Vec<String>,
    pub extensions: Vec<String>,
    pub timeout: Duration,
}

/// Fully resolved settings for a run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub target_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub lock_path: PathBuf,
    pub roots: Vec<RootSpec>,
    pub priority_root: Option<String>,
    pub download_policy: DownloadPolicy,
    pub listing_policy: WaitPolicy,
    pub ready_timeout: Duration,
    pub max_depth: Option<usize>,
    pub convert: Option<ConvertSettings>,
}

impl Settings {
    /// Validates `config`, loads its roots file and applies defaults.
    ///
    /// Inline `[[roots]]` come first, followed by the roots file entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid values, an unreadable roots file or
    /// a root label configured twice.
    pub fn from_file_config(config: &FileConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut roots = config.roots.clone();
        if let Some(path) = &config.roots_file {
            roots.extend(load_roots_file(path)?);
        }
        for (index, root) in roots.iter().enumerate() {
            validate_root(root).map_err(|detail| ConfigError::Invalid {
                field: "roots_file",
                detail,
            })?;
            if roots[..index].iter().any(|r| r.label == root.label) {
                return Err(ConfigError::DuplicateRoot {
                    label: root.label.clone(),
                });
            }
        }

        let target_dir = config
            .target_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let state_dir = target_dir.join(STATE_DIR_NAME);
        let manifest_path = config
            .manifest_path
            .clone()
            .unwrap_or_else(|| state_dir.join(MANIFEST_FILE_NAME));
        let lock_path = manifest_path
            .parent()
            .map_or_else(|| state_dir.clone(), Path::to_path_buf)
            .join(LOCK_FILE_NAME);

        let convert = config.convert_command.as_ref().map(|program| ConvertSettings {
            program: program.clone(),
            args: config.convert_args.clone().unwrap_or_else(|| {
                DEFAULT_CONVERT_ARGS.iter().map(|a| (*a).to_string()).collect()
            }),
            extensions: config.convert_extensions.clone().unwrap_or_else(|| {
                DEFAULT_CONVERT_EXTENSIONS
                    .iter()
                    .map(|e| (*e).to_string())
                    .collect()
            }),
            timeout: Duration::from_secs(
                config
                    .convert_timeout_secs
                    .unwrap_or(DEFAULT_CONVERT_TIMEOUT_SECS),
            ),
        });

        Ok(Self {
            target_dir,
            manifest_path,
            lock_path,
            roots,
            priority_root: config.priority_root.clone(),
            download_policy: DownloadPolicy::new(
                config
                    .batch_timeout_secs
                    .map_or(DEFAULT_BATCH_TIMEOUT, Duration::from_secs),
                config
                    .poll_interval_ms
                    .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis),
            ),
            listing_policy: WaitPolicy::new(
                config
                    .listing_retry_interval_ms
                    .map_or(DEFAULT_LISTING_INTERVAL, Duration::from_millis),
                config
                    .listing_retry_attempts
                    .unwrap_or(DEFAULT_LISTING_ATTEMPTS),
            ),
            ready_timeout: config
                .ready_timeout_secs
                .map_or(DEFAULT_READY_TIMEOUT, Duration::from_secs),
            max_depth: config.max_depth,
            convert,
        })
    }

    #[must_use]
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            target_dir: self.target_dir.clone(),
            ready_timeout: self.ready_timeout,
            listing_policy: self.listing_policy,
            max_depth: self.max_depth,
            priority_root: self.priority_root.clone(),
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> DownloadOrchestrator {
        DownloadOrchestrator::new(self.download_policy)
    }

    /// Dispatcher for the configured converter, disabled when none is set.
    #[must_use]
    pub fn dispatcher(&self) -> ConversionDispatcher {
        let Some(convert) = &self.convert else {
            return ConversionDispatcher::disabled();
        };
        let converter = CommandConverter::new(&convert.program, convert.args.iter().cloned())
            .with_timeout(convert.timeout);
        ConversionDispatcher::new(converter).with_extensions(&convert.extensions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(raw: &str) -> Result<FileConfig, ConfigError> {
        FileConfig::from_toml_str(raw, Path::new("config.toml"))
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"
            target_dir = "/srv/mirror"
            priority_root = "Biology"
            batch_timeout_secs = 90
            poll_interval_ms = 500
            max_depth = 4
            convert_command = "soffice"

            [[roots]]
            label = "Biology"
            url = "file:///share/Biology"
            "#,
        )
        .unwrap();

        assert_eq!(config.target_dir, Some(PathBuf::from("/srv/mirror")));
        assert_eq!(config.batch_timeout_secs, Some(90));
        assert_eq!(config.max_depth, Some(4));
        assert_eq!(
            config.roots,
            [RootSpec::new("Biology", "file:///share/Biology")]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let err = parse("concurrency = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_batch_timeout_range() {
        let config = FileConfig {
            batch_timeout_secs: Some(0),
            ..FileConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid config value for `batch_timeout_secs`: 0. Expected range: 1..=3600"
        );
    }

    #[test]
    fn test_validate_poll_interval_range() {
        let config = FileConfig {
            poll_interval_ms: Some(60_001),
            ..FileConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "poll_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_empty_root_url() {
        let config = FileConfig {
            roots: vec![RootSpec::new("Biology", " ")],
            ..FileConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "roots", .. })
        ));
    }

    #[test]
    fn test_roots_file_keeps_order() {
        let roots = parse_roots(
            r#"{"Zoology": "file:///z", "Biology": "file:///b", "History": "file:///h"}"#,
            Path::new("subjects.json"),
        )
        .unwrap();
        let labels: Vec<_> = roots.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Zoology", "Biology", "History"]);
    }

    #[test]
    fn test_roots_file_rejects_non_string_url() {
        let err = parse_roots(r#"{"Biology": 3}"#, Path::new("subjects.json")).unwrap_err();
        assert!(err.to_string().contains("Biology"));
    }

    #[test]
    fn test_roots_file_rejects_array() {
        let err = parse_roots(r#"["Biology"]"#, Path::new("subjects.json")).unwrap_err();
        assert!(matches!(err, ConfigError::RootsFile { .. }));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_file_config(&FileConfig {
            target_dir: Some(PathBuf::from("/srv/mirror")),
            ..FileConfig::default()
        })
        .unwrap();

        assert_eq!(
            settings.manifest_path,
            Path::new("/srv/mirror/.docmirror/manifest.json")
        );
        assert_eq!(settings.lock_path, Path::new("/srv/mirror/.docmirror/sync.lock"));
        assert_eq!(settings.download_policy, DownloadPolicy::default());
        assert_eq!(settings.listing_policy, WaitPolicy::default());
        assert_eq!(settings.ready_timeout, DEFAULT_READY_TIMEOUT);
        assert!(settings.convert.is_none());
        assert!(!settings.dispatcher().is_enabled());
    }

    #[test]
    fn test_settings_merge_inline_and_file_roots() {
        let dir = TempDir::new().unwrap();
        let roots_path = dir.path().join("subjects.json");
        std::fs::write(&roots_path, r#"{"History": "file:///h"}"#).unwrap();

        let settings = Settings::from_file_config(&FileConfig {
            roots_file: Some(roots_path),
            roots: vec![RootSpec::new("Biology", "file:///b")],
            ..FileConfig::default()
        })
        .unwrap();

        let labels: Vec<_> = settings.roots.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["Biology", "History"]);
    }

    #[test]
    fn test_settings_duplicate_root_rejected() {
        let dir = TempDir::new().unwrap();
        let roots_path = dir.path().join("subjects.json");
        std::fs::write(&roots_path, r#"{"Biology": "file:///other"}"#).unwrap();

        let err = Settings::from_file_config(&FileConfig {
            roots_file: Some(roots_path),
            roots: vec![RootSpec::new("Biology", "file:///b")],
            ..FileConfig::default()
        })
        .unwrap_err();

        assert!(matches!(err, ConfigError::DuplicateRoot { ref label } if label == "Biology"));
    }

    #[test]
    fn test_settings_converter_defaults() {
        let settings = Settings::from_file_config(&FileConfig {
            convert_command: Some("soffice".to_string()),
            ..FileConfig::default()
        })
        .unwrap();

        let convert = settings.convert.clone().unwrap();
        assert_eq!(convert.args, DEFAULT_CONVERT_ARGS);
        assert_eq!(convert.extensions, ["doc", "docx"]);
        assert!(settings.dispatcher().applies_to("notes.docx"));
    }

    #[test]
    fn test_settings_custom_manifest_path_moves_lock() {
        let settings = Settings::from_file_config(&FileConfig {
            manifest_path: Some(PathBuf::from("/var/lib/docmirror/state.json")),
            ..FileConfig::default()
        })
        .unwrap();
        assert_eq!(settings.lock_path, Path::new("/var/lib/docmirror/sync.lock"));
    }
}

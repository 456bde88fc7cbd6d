//! Post-download conversion of word-processor documents to PDF.
//!
//! The [`ConversionDispatcher`] decides whether a completed download should
//! be converted and hands it to a [`Converter`]. Conversion is best effort:
//! a failure is logged and the original file stays recorded as synced.

mod command;

pub use command::{CommandConverter, DEFAULT_CONVERT_ARGS, DEFAULT_CONVERT_PROGRAM};

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// Extensions converted when none are configured.
pub const DEFAULT_CONVERT_EXTENSIONS: [&str; 2] = ["doc", "docx"];

/// Extension of every converted artifact.
pub const CONVERTED_EXTENSION: &str = "pdf";

/// Errors from a single conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The converter program could not be started.
    #[error("failed to start converter `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter exited unsuccessfully.
    #[error("converter `{program}` failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The converter did not finish in time and was killed.
    #[error("converter `{program}` timed out after {}s", timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    /// The converter reported success but produced no output.
    #[error("converter produced no output at {}", path.display())]
    MissingOutput { path: PathBuf },
}

impl ConvertError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn missing_output(path: impl Into<PathBuf>) -> Self {
        Self::MissingOutput { path: path.into() }
    }
}

/// Turns one local document into a PDF.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Converts `source` and returns the path of the produced PDF.
    async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError>;
}

/// Routes completed downloads to a [`Converter`] by extension.
pub struct ConversionDispatcher {
    converter: Option<Box<dyn Converter>>,
    extensions: Vec<String>,
}

impl std::fmt::Debug for ConversionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionDispatcher")
            .field("enabled", &self.is_enabled())
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl Default for ConversionDispatcher {
    fn default() -> Self {
        Self::disabled()
    }
}

impl ConversionDispatcher {
    /// Dispatcher converting the default extensions with `converter`.
    pub fn new(converter: impl Converter + 'static) -> Self {
        Self {
            converter: Some(Box::new(converter)),
            extensions: default_extensions(),
        }
    }

    /// Dispatcher that never converts.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            converter: None,
            extensions: default_extensions(),
        }
    }

    /// Replaces the handled extensions. Leading dots and case are ignored.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.converter.is_some()
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether a file called `name` would be converted.
    #[must_use]
    pub fn applies_to(&self, name: &str) -> bool {
        self.is_enabled()
            && extension_of(name).is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|handled| handled.eq_ignore_ascii_case(ext))
            })
    }

    /// Name the converted artifact of `name` will have, if it applies.
    #[must_use]
    pub fn converted_name(&self, name: &str) -> Option<String> {
        if !self.applies_to(name) {
            return None;
        }
        let (stem, _) = name.rsplit_once('.')?;
        Some(format!("{stem}.{CONVERTED_EXTENSION}"))
    }

    /// Converts `path` when it applies; failures are logged and yield `None`.
    pub async fn maybe_convert(&self, path: &Path) -> Option<PathBuf> {
        let converter = self.converter.as_deref()?;
        let name = path.file_name()?.to_str()?;
        if !self.applies_to(name) {
            return None;
        }
        debug!(file = %path.display(), "converting to pdf");
        match converter.convert(path).await {
            Ok(output) => Some(output),
            Err(error) => {
                warn!(file = %path.display(), error = %error, "conversion failed; original kept");
                None
            }
        }
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_CONVERT_EXTENSIONS
        .iter()
        .map(|ext| (*ext).to_string())
        .collect()
}

fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

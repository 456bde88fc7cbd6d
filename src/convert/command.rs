//! Converter backed by an external program.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{CONVERTED_EXTENSION, ConvertError, Converter};

/// Program used when none is configured.
pub const DEFAULT_CONVERT_PROGRAM: &str = "soffice";

/// Arguments used when none are configured.
///
/// `{input}` is replaced by the source file and `{outdir}` by its directory.
pub const DEFAULT_CONVERT_ARGS: [&str; 6] = [
    "--headless",
    "--convert-to",
    "pdf",
    "--outdir",
    "{outdir}",
    "{input}",
];

const DEFAULT_CONVERT_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs a command per document and expects `<stem>.pdf` next to the source.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for CommandConverter {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONVERT_PROGRAM,
            DEFAULT_CONVERT_ARGS.iter().map(|a| (*a).to_string()),
        )
    }
}

impl CommandConverter {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_CONVERT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn expand_args(&self, source: &Path, outdir: &Path) -> Vec<String> {
        let input = source.to_string_lossy();
        let outdir = outdir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{outdir}", &outdir))
            .collect()
    }
}

#[async_trait]
impl Converter for CommandConverter {
    async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError> {
        let outdir = source.parent().unwrap_or_else(|| Path::new("."));
        let output_path = source.with_extension(CONVERTED_EXTENSION);
        let args = self.expand_args(source, outdir);
        debug!(program = %self.program, ?args, "running converter");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConvertError::spawn(&self.program, e))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConvertError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| ConvertError::spawn(&self.program, e))?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            return Err(ConvertError::missing_output(output_path));
        }
        Ok(output_path)
    }
}

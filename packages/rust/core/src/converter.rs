//! The external reStructuredText → Markdown converter.
//!
//! Conversion is delegated to a subprocess (pandoc by default) that reads the
//! document on stdin and writes Markdown to stdout.

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::{debug, instrument};

use docmigrate_shared::{DocMigrateError, MigrateConfig, Result};

/// Converts one document's source text to Markdown.
pub trait MarkupConverter {
    /// Convert `source`, resolving relative includes against `working_dir`.
    fn convert(&self, source: &str, working_dir: &Path) -> Result<String>;
}

/// Runs an external command once per document.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    command: String,
    args: Vec<String>,
}

impl PandocConverter {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &MigrateConfig) -> Self {
        Self::new(config.converter_command.clone(), config.converter_args.clone())
    }

    /// First line of `<command> --version`, used as an availability probe.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&self.command, &e))?;

        if !output.status.success() {
            return Err(DocMigrateError::Converter(format!(
                "`{} --version` exited with {}",
                self.command, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl MarkupConverter for PandocConverter {
    #[instrument(skip(self, source), fields(cmd = %self.command, dir = %working_dir.display()))]
    fn convert(&self, source: &str, working_dir: &Path) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.command, &e))?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            DocMigrateError::Converter("failed to capture converter stdin".into())
        })?;

        // Feed stdin from a helper thread while this one drains stdout/stderr,
        // otherwise a full pipe on either side blocks both processes.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(source.as_bytes()));
            let output = child.wait_with_output();
            let written = writer.join();
            (output, written)
        });

        let output: Output = output.map_err(|e| {
            DocMigrateError::Converter(format!("failed to wait for `{}`: {e}", self.command))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocMigrateError::Converter(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            // The converter finished without reading everything; its output stands.
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(DocMigrateError::Converter(format!(
                    "failed to write to `{}` stdin: {e}",
                    self.command
                )));
            }
            Err(_) => {
                return Err(DocMigrateError::Converter(
                    "converter stdin writer panicked".into(),
                ));
            }
        }

        let markdown = String::from_utf8(output.stdout).map_err(|e| {
            DocMigrateError::Converter(format!("`{}` produced non-UTF-8 output: {e}", self.command))
        })?;

        debug!(bytes_in = source.len(), bytes_out = markdown.len(), "document converted");
        Ok(markdown)
    }
}

fn spawn_error(command: &str, e: &std::io::Error) -> DocMigrateError {
    DocMigrateError::Converter(format!("failed to spawn `{command}`: {e}. Is it installed?"))
}

//! Access to the JSON documents inside an xcresult bundle.
//!
//! Bundles are read through `xcrun xcresulttool get --path <bundle> [--id <id>]
//! --format json`. The [`ResultSource`] trait is the seam between the reader
//! and that subprocess.

use crate::config::ToolConfig;
use serde_json::Value;
use std::path::Path;
use std::process::Command;

/// Something that can return the JSON document for a bundle, or for an
/// object inside it when `id` is given.
pub trait ResultSource {
    fn get(&self, bundle: &Path, id: Option<&str>) -> Result<Value, ToolError>;
}

/// Runs the xcresulttool command-line and parses its stdout.
#[derive(Debug, Clone)]
pub struct XcResultTool {
    command: String,
    args: Vec<String>,
}

impl XcResultTool {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }

    /// Arguments for a `get`, after the configured prefix arguments.
    fn get_args(&self, bundle: &Path, id: Option<&str>) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("get".to_string());
        args.push("--path".to_string());
        args.push(bundle.display().to_string());
        if let Some(id) = id {
            args.push("--id".to_string());
            args.push(id.to_string());
        }
        args.push("--format".to_string());
        args.push("json".to_string());
        args
    }

    fn display_command(&self, args: &[String]) -> String {
        std::iter::once(self.command.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for XcResultTool {
    fn default() -> Self {
        Self::from_config(&ToolConfig::default())
    }
}

impl ResultSource for XcResultTool {
    fn get(&self, bundle: &Path, id: Option<&str>) -> Result<Value, ToolError> {
        let args = self.get_args(bundle, id);
        let cmdline = self.display_command(&args);
        tracing::debug!(command = %cmdline, "running xcresulttool");

        let output = Command::new(&self.command)
            .args(&args)
            .output()
            .map_err(|e| ToolError::Execute {
                command: cmdline.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::CommandFailed {
                command: cmdline,
                code: output.status.code(),
                stderr: stderr.into_owned(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| ToolError::Parse {
            command: cmdline,
            source: e,
        })
    }
}

/// Errors from running the inspection tool.
#[derive(Debug)]
pub enum ToolError {
    /// The command could not be started (e.g. xcrun is not installed).
    Execute {
        command: String,
        source: std::io::Error,
    },
    /// The command exited with non-zero status.
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// The command's stdout was not valid JSON.
    Parse {
        command: String,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::Execute { command, source } => {
                write!(f, "failed to execute '{command}': {source}")
            }
            ToolError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                match code {
                    Some(c) => write!(f, "'{command}' exited with status {c}")?,
                    None => write!(f, "'{command}' was terminated by a signal")?,
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(
                        f,
                        ":\n{}",
                        stderr.lines().take(30).collect::<Vec<_>>().join("\n")
                    )?;
                }
                Ok(())
            }
            ToolError::Parse { command, source } => {
                write!(f, "invalid JSON from '{command}': {source}")
            }
        }
    }
}

impl std::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToolError::Execute { source, .. } => Some(source),
            ToolError::CommandFailed { .. } => None,
            ToolError::Parse { source, .. } => Some(source),
        }
    }
}

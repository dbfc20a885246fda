//! Invocation seam for the opaque external tools.
//!
//! The compiler, minifier, installer, test runner, browser launcher,
//! and declaration checker are all external programs configured as
//! command lines. `Tool` splits the configured line, checks PATH
//! availability, and runs the program with captured output and a
//! timeout. duplex never interprets tool internals; it only consumes
//! exit status, stdout, and stderr.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::{dlog_debug, dlog_trace};

/// Default ceiling for a single tool invocation.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// An external tool: program plus leading arguments from configuration.
#[derive(Debug, Clone)]
pub struct Tool {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    timeout: Duration,
}

/// Captured outcome of a tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// True if the tool exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The most useful failure detail: stderr if non-empty, otherwise
    /// stdout, otherwise the exit code.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit code {}", self.code.unwrap_or(-1))
    }
}

impl Tool {
    /// Parse a configured command line into a tool.
    ///
    /// The first word is the program, the rest are leading arguments
    /// prepended to every invocation.
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(String::from);
        let program = words
            .next()
            .ok_or_else(|| Error::Validation("Empty tool command line".to_string()))?;
        Ok(Self {
            program,
            args: words.collect(),
            envs: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set an environment variable for every invocation of this tool.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// The program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check whether the program can be found on PATH.
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// Error unless the program is on PATH.
    pub fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::ToolNotFound(self.program.clone()))
        }
    }

    /// Build a command with the configured leading arguments plus
    /// `extra` appended. Exposed so callers that need non-standard
    /// process handling (detached fixture spawns) reuse the same seam.
    pub fn command(&self, extra: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(extra);
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command
    }

    /// Run the tool to completion, capturing stdout and stderr.
    ///
    /// # Errors
    /// Returns an error if the process cannot be spawned or exceeds
    /// the timeout. A non-zero exit is not an error here; callers
    /// decide what a failing exit means for their task.
    pub async fn run(&self, extra: &[String], cwd: Option<&Path>) -> Result<ToolOutput> {
        dlog_debug!(
            "Tool::run {} {:?} {:?} cwd={:?}",
            self.program,
            self.args,
            extra,
            cwd
        );

        let mut command = self.command(extra);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
            .map_err(Error::Io)?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        dlog_trace!(
            "Tool::run {} exited {:?}: {}",
            self.program,
            result.code,
            result.detail()
        );
        Ok(result)
    }
}

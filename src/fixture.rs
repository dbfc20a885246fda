//! Integration-test fixture service lifecycle.
//!
//! Integration tests exercise the library against a real database-like
//! service. The service is external and long-lived relative to a
//! single orchestrator invocation, so `fixture start` spawns it
//! detached and records the pid under the output directory; `stop`
//! kills the recorded process; `status` reports whether it is alive.

use std::fs;
use std::process::Stdio;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tool::Tool;
use crate::dlog;

/// Manages the configured fixture service.
pub struct FixtureService<'a> {
    config: &'a Config,
}

impl<'a> FixtureService<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Spawn the service detached and record its pid.
    pub async fn start(&self) -> Result<u32> {
        if let Some(pid) = self.status()? {
            return Err(Error::Validation(format!(
                "Fixture already running (pid {})",
                pid
            )));
        }

        let tool = Tool::from_command_line(&self.config.fixture.command)?;
        tool.ensure_available()?;

        let mut command = tool.command(&[]);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let child = command.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| Error::Validation("Fixture exited immediately".to_string()))?;

        let pid_path = self.config.fixture_pid_path();
        if let Some(parent) = pid_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&pid_path, pid.to_string())?;
        dlog!("Fixture started (pid {})", pid);
        Ok(pid)
    }

    /// The recorded pid, if the process is still alive.
    pub fn status(&self) -> Result<Option<u32>> {
        let pid_path = self.config.fixture_pid_path();
        if !pid_path.is_file() {
            return Ok(None);
        }
        let pid: u32 = fs::read_to_string(&pid_path)?
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("Corrupt pid file: {}", pid_path.display())))?;

        // Signal 0 probes liveness without touching the process.
        let alive = std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);

        Ok(if alive { Some(pid) } else { None })
    }

    /// Kill the recorded process. Returns false when nothing was
    /// running (a stale pid file is cleaned up either way).
    pub async fn stop(&self) -> Result<bool> {
        let pid_path = self.config.fixture_pid_path();
        let stopped = match self.status()? {
            Some(pid) => {
                let output = std::process::Command::new("kill")
                    .arg(pid.to_string())
                    .output()?;
                if !output.status.success() {
                    return Err(Error::Validation(format!(
                        "Failed to kill fixture pid {}",
                        pid
                    )));
                }
                dlog!("Fixture stopped (pid {})", pid);
                true
            }
            None => false,
        };
        if pid_path.exists() {
            fs::remove_file(&pid_path)?;
        }
        Ok(stopped)
    }
}

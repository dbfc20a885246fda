//! Sandbox Installer.
//!
//! Proves the freshly built server artifact is actually consumable the
//! way an external consumer would install it: a throwaway directory
//! gets a minimal package descriptor depending on the artifact by
//! local path, and the real installer runs inside it. An install
//! failure is fatal to every dependent test task; that is the behavior
//! this step exists to catch.

use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tool::Tool;
use crate::dlog;

/// Installs the server artifact into an isolated sandbox directory.
pub struct SandboxInstaller<'a> {
    config: &'a Config,
}

impl<'a> SandboxInstaller<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// The descriptor written into the sandbox: a private package whose
    /// only dependency is the server artifact, referenced by path.
    fn descriptor(&self) -> serde_json::Value {
        let name = self.config.project.name.as_str();
        serde_json::json!({
            "name": format!("{}-sandbox", name),
            "version": "0.0.0",
            "private": true,
            "dependencies": {
                name: format!("file:{}", self.config.node_dir().display()),
            },
        })
    }

    /// Create the sandbox and run the real dependency install.
    ///
    /// Returns the sandbox directory on success.
    pub async fn install(&self) -> Result<PathBuf> {
        let dir = self.config.sandbox_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;

        fs::write(
            dir.join("package.json"),
            serde_json::to_string_pretty(&self.descriptor())?,
        )?;

        let tool = Tool::from_command_line(&self.config.tools.install)?;
        tool.ensure_available()?;

        let result = tool.run(&[], Some(&dir)).await?;
        if !result.success() {
            return Err(Error::Install(result.detail()));
        }

        dlog!("Sandbox install completed in {}", dir.display());
        Ok(dir)
    }
}

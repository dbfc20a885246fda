//! Declaration Checker.
//!
//! Type-checks the configured public-API declaration and usage files
//! under a strict rule set. Any diagnostic of any severity fails the
//! check: the public typings either hold up under strict consumption
//! or the run stops.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tool::Tool;
use crate::dlog;

/// Strict rule set passed to the checker on every invocation.
pub const STRICT_FLAGS: &[&str] = &[
    "--strict",
    "--noImplicitAny",
    "--noImplicitReturns",
    "--strictNullChecks",
    "--noEmit",
];

/// Checks the declaration files with the configured tool.
pub struct DeclarationChecker<'a> {
    config: &'a Config,
}

impl<'a> DeclarationChecker<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run the check. Succeeds only on a silent, zero exit.
    pub async fn check(&self) -> Result<()> {
        let files = &self.config.declarations.files;
        if files.is_empty() {
            dlog!("No declaration files configured, skipping check");
            return Ok(());
        }
        for file in files {
            if !file.is_file() {
                return Err(Error::TypeCheck(format!(
                    "declaration file missing: {}",
                    file.display()
                )));
            }
        }

        let tool = Tool::from_command_line(&self.config.tools.typecheck)?;
        tool.ensure_available()?;

        let mut args: Vec<String> = STRICT_FLAGS.iter().map(|f| f.to_string()).collect();
        args.extend(files.iter().map(|f| f.display().to_string()));

        let output = tool.run(&args, None).await?;
        let diagnostics = format!("{}{}", output.stdout.trim(), output.stderr.trim());
        if !output.success() || !diagnostics.is_empty() {
            return Err(Error::TypeCheck(output.detail()));
        }

        dlog!("Declaration check passed for {} files", files.len());
        Ok(())
    }
}

//! Server-side test execution.
//!
//! Runs the configured test runner in a single process against the
//! sandbox-installed artifact: the sandbox is the working directory
//! and its `node_modules` is on the module path, so tests import the
//! library exactly as an external consumer would.

use crate::config::Config;
use crate::error::Result;
use crate::testing::{discover, TestEnvironment, TestRunResult};
use crate::tool::Tool;
use crate::transform::EnvironmentTarget;
use crate::dlog;

/// Runs the server-path test suite.
pub struct ServerTestRunner<'a> {
    config: &'a Config,
}

impl<'a> ServerTestRunner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Execute the suite, producing one aggregated record.
    ///
    /// A non-passing record is returned, not an error; the caller
    /// decides that a failing record fails its task. Errors are
    /// reserved for not being able to run at all.
    pub async fn run(&self) -> Result<TestRunResult> {
        let suite = self.config.project.name.as_str();
        let files = discover(self.config, EnvironmentTarget::Server)?;
        if files.is_empty() {
            dlog!("No server tests discovered");
            return Ok(TestRunResult::passed(TestEnvironment::Server, suite));
        }

        let sandbox = self.config.sandbox_dir();
        let module_path = sandbox.join("node_modules");
        let tool = Tool::from_command_line(&self.config.tools.test_runner)?
            .with_env("NODE_PATH", &module_path.display().to_string());
        tool.ensure_available()?;

        let args: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        let output = tool.run(&args, Some(&sandbox)).await?;

        if output.success() {
            Ok(TestRunResult::passed(TestEnvironment::Server, suite))
        } else {
            Ok(TestRunResult::failed(
                TestEnvironment::Server,
                suite,
                &output.detail(),
            ))
        }
    }
}

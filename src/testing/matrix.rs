//! Browser test matrix runner.
//!
//! The browser-eligible tests are bundled once (through the same
//! pipeline and transform as the library bundle) and the bundle is
//! loaded inside each configured engine via the external automation
//! launcher. Each engine yields one independent record; a launcher
//! that cannot start an engine is fatal, a failing suite inside an
//! engine is a failed record.

use std::path::{Path, PathBuf};

use crate::build::BrowserBuilder;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::testing::{discover, TestEnvironment, TestRunResult};
use crate::tool::Tool;
use crate::transform::EnvironmentTarget;
use crate::dlog;

/// Runs the browser test matrix.
pub struct MatrixRunner<'a> {
    config: &'a Config,
}

impl<'a> MatrixRunner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Bundle the browser-eligible test files into the test bundle.
    pub fn bundle_tests(&self) -> Result<PathBuf> {
        let files = discover(self.config, EnvironmentTarget::Browser)?;
        let out = self.config.test_bundle_path();
        let graph = BrowserBuilder::new(self.config).bundle_to(&files, &out)?;
        dlog!(
            "Test bundle: {} entries, {} modules",
            graph.entries.len(),
            graph.module_count()
        );
        Ok(out)
    }

    /// Run the test bundle inside one engine.
    ///
    /// The engine name must be in the configured closed set. A spawn
    /// failure or hang is an `EngineLaunch` error; a non-zero launcher
    /// exit is a failed record for that engine.
    pub async fn run_engine(&self, engine: &str, bundle: &Path) -> Result<TestRunResult> {
        self.config.require_engine(engine)?;

        let suite = self.config.project.name.as_str();
        let tool = Tool::from_command_line(&self.config.tools.launcher)?;
        tool.ensure_available()
            .map_err(|_| Error::EngineLaunch {
                engine: engine.to_string(),
                detail: format!("launcher '{}' not on PATH", self.config.tools.launcher),
            })?;

        let args = vec![
            "-l".to_string(),
            engine.to_string(),
            bundle.display().to_string(),
        ];
        let output = match tool.run(&args, None).await {
            Ok(output) => output,
            Err(Error::Io(e)) => {
                return Err(Error::EngineLaunch {
                    engine: engine.to_string(),
                    detail: e.to_string(),
                })
            }
            Err(Error::Timeout(duration)) => {
                return Err(Error::EngineLaunch {
                    engine: engine.to_string(),
                    detail: format!("engine did not finish within {:?}", duration),
                })
            }
            Err(other) => return Err(other),
        };

        let environment = TestEnvironment::Browser(engine.to_string());
        if output.success() {
            Ok(TestRunResult::passed(environment, suite))
        } else {
            Ok(TestRunResult::failed(environment, suite, &output.detail()))
        }
    }

    /// Run the bundle in every listed engine, collecting one record
    /// per engine. Engines run sequentially: the launcher owns a
    /// single automation channel.
    pub async fn run_matrix(
        &self,
        engines: &[String],
        bundle: &Path,
    ) -> Result<Vec<TestRunResult>> {
        let mut results = Vec::new();
        for engine in engines {
            results.push(self.run_engine(engine, bundle).await?);
        }
        Ok(results)
    }
}

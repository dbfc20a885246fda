//! Command pipelines over the task graph.
//!
//! Each command builds a fresh `TaskGraph` wiring the builders,
//! installer, test runners, and checker with explicit ordering edges,
//! then hands it to the executor. Nothing here caches across
//! invocations: re-running a command re-executes everything from
//! scratch against the disposable output directory.

use std::sync::{Arc, Mutex};

use crate::build::{BrowserBuilder, NodeBuilder};
use crate::config::Config;
use crate::core::{Executor, TaskGraph};
use crate::declcheck::DeclarationChecker;
use crate::error::{Error, Result};
use crate::sandbox::SandboxInstaller;
use crate::testing::{
    MatrixRunner, ServerTestRunner, TestEnvironment, TestReport, TestRunResult,
};
use crate::version;
use crate::watch::wait_for_change;
use crate::dlog;

type SharedReport = Arc<Mutex<TestReport>>;

/// Drives the command surface for one configured project.
pub struct Pipeline {
    config: Arc<Config>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `build`: server artifact plus both browser bundle variants.
    pub async fn build(&self) -> Result<()> {
        let mut graph = TaskGraph::new();
        self.declare_build_tasks(&mut graph)?;
        graph.declare("build", &["build:node", "build:browser:min"], || async {
            Ok(())
        })?;
        Executor::new().run(graph, "build").await
    }

    /// `test`: declaration check, server chain, and the default-engine
    /// browser chain. The declaration check runs in parallel with the
    /// build chain; a failure anywhere aborts the rest of the run.
    pub async fn test(&self) -> Result<TestReport> {
        let engines = self.config.browser.default_engines.clone();
        self.run_test_graph(&engines).await
    }

    /// `test-browser --engine=<name>`: only the named engine's pass.
    ///
    /// The engine name is validated against the closed set before any
    /// task runs.
    pub async fn test_browser(&self, engine: &str) -> Result<TestReport> {
        self.config.require_engine(engine)?;

        let report: SharedReport = Arc::new(Mutex::new(TestReport::new()));
        let mut graph = TaskGraph::new();
        self.declare_browser_test_tasks(&mut graph, &[engine.to_string()], &report)?;

        let outcome = Executor::new().run(graph, "test:browser").await;
        Ok(finish_report(report, outcome))
    }

    /// `watch`: rebuild on every batch of source changes. Runs until
    /// interrupted; individual build failures are reported and the
    /// loop keeps watching.
    pub async fn watch(&self) -> Result<()> {
        loop {
            match self.build().await {
                Ok(()) => println!("build ok, watching {}", self.config.project.src_dir.display()),
                Err(e) => println!("build failed: {}", e),
            }
            let src = self.config.project.src_dir.clone();
            let changed = tokio::task::spawn_blocking(move || wait_for_change(&src))
                .await
                .map_err(|e| Error::TaskJoin(e.to_string()))??;
            dlog!("Rebuilding after {} change(s)", changed.len());
        }
    }

    /// `set-version --version=<semver>`: stamp the version file.
    pub fn set_version(&self, version_str: &str) -> Result<()> {
        version::stamp(&self.config, version_str)
    }

    fn declare_build_tasks(&self, graph: &mut TaskGraph) -> Result<()> {
        let config = self.config.clone();
        graph.declare("build:node", &[], move || async move {
            NodeBuilder::new(&config).build().await.map(|_| ())
        })?;

        let config = self.config.clone();
        graph.declare("build:browser", &[], move || async move {
            BrowserBuilder::new(&config).build().await
        })?;

        let config = self.config.clone();
        graph.declare("build:browser:min", &["build:browser"], move || async move {
            BrowserBuilder::new(&config).minify().await
        })?;
        Ok(())
    }

    fn declare_server_test_tasks(
        &self,
        graph: &mut TaskGraph,
        report: &SharedReport,
    ) -> Result<()> {
        let config = self.config.clone();
        graph.declare("sandbox:install", &["build:node"], move || async move {
            SandboxInstaller::new(&config).install().await.map(|_| ())
        })?;

        let config = self.config.clone();
        let report = report.clone();
        graph.declare("test:node", &["sandbox:install"], move || async move {
            let record = ServerTestRunner::new(&config).run().await?;
            let passed = record.is_passed();
            let detail = record.diagnostics.clone().unwrap_or_default();
            report.lock().unwrap().push(record);
            if passed {
                Ok(())
            } else {
                Err(Error::TestFailure {
                    environment: "server".to_string(),
                    detail,
                })
            }
        })?;
        Ok(())
    }

    fn declare_browser_test_tasks(
        &self,
        graph: &mut TaskGraph,
        engines: &[String],
        report: &SharedReport,
    ) -> Result<()> {
        let config = self.config.clone();
        graph.declare("bundle:tests", &[], move || async move {
            MatrixRunner::new(&config).bundle_tests().map(|_| ())
        })?;

        let config = self.config.clone();
        let report = report.clone();
        let engines = engines.to_vec();
        graph.declare("test:browser", &["bundle:tests"], move || async move {
            let bundle = config.test_bundle_path();
            let records = MatrixRunner::new(&config)
                .run_matrix(&engines, &bundle)
                .await?;

            let failing: Vec<String> = records
                .iter()
                .filter(|r| !r.is_passed())
                .map(|r| r.environment.to_string())
                .collect();
            {
                let mut report = report.lock().unwrap();
                for record in records {
                    report.push(record);
                }
            }
            if failing.is_empty() {
                Ok(())
            } else {
                Err(Error::TestFailure {
                    environment: failing.join(", "),
                    detail: "browser suite failed".to_string(),
                })
            }
        })?;
        Ok(())
    }

    async fn run_test_graph(&self, engines: &[String]) -> Result<TestReport> {
        let report: SharedReport = Arc::new(Mutex::new(TestReport::new()));
        let mut graph = TaskGraph::new();

        // Declaration checking is independent of the build chain and
        // runs in parallel with it.
        let config = self.config.clone();
        let decl_report = report.clone();
        graph.declare("check:declarations", &[], move || async move {
            let suite = config.project.name.clone();
            match DeclarationChecker::new(&config).check().await {
                Ok(()) => {
                    decl_report
                        .lock()
                        .unwrap()
                        .push(TestRunResult::passed(TestEnvironment::Declarations, &suite));
                    Ok(())
                }
                Err(e) => {
                    decl_report.lock().unwrap().push(TestRunResult::failed(
                        TestEnvironment::Declarations,
                        &suite,
                        &e.to_string(),
                    ));
                    Err(e)
                }
            }
        })?;

        let config = self.config.clone();
        graph.declare("build:node", &[], move || async move {
            NodeBuilder::new(&config).build().await.map(|_| ())
        })?;
        self.declare_server_test_tasks(&mut graph, &report)?;
        self.declare_browser_test_tasks(&mut graph, engines, &report)?;

        graph.declare(
            "test",
            &["check:declarations", "test:node", "test:browser"],
            || async { Ok(()) },
        )?;

        let outcome = Executor::new().run(graph, "test").await;
        Ok(finish_report(report, outcome))
    }
}

/// Fold the run outcome into the collected report.
fn finish_report(report: SharedReport, outcome: Result<()>) -> TestReport {
    let mut report = match Arc::try_unwrap(report) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        Err(shared) => shared.lock().unwrap().clone(),
    };
    if let Err(e) = outcome {
        report.error = Some(e.to_string());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
    }

    /// A project whose external tools are all stand-ins that succeed.
    fn passing_project() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/index.js", "exports.ok = require('./codec');");
        write(dir.path(), "lib/codec.js", "exports.ok = true;");
        write(dir.path(), "test/codec.test.js", "require('../lib/codec');");
        write(dir.path(), "index.d.ts", "export declare const ok: boolean;\n");
        write(dir.path(), "test-typings.ts", "import './index';\n");

        let mut config = Config::load(dir.path()).unwrap();
        config.tools.minify = "true".to_string();
        config.tools.install = "true".to_string();
        config.tools.test_runner = "true".to_string();
        config.tools.launcher = "true".to_string();
        config.tools.typecheck = "true".to_string();
        (dir, config)
    }

    #[tokio::test]
    async fn test_build_produces_both_artifacts() {
        let (dir, config) = passing_project();
        let pipeline = Pipeline::new(config);

        pipeline.build().await.unwrap();

        assert!(dir.path().join("build/node/lib/index.js").is_file());
        assert!(dir.path().join("build/client.js").is_file());
    }

    #[tokio::test]
    async fn test_full_test_run_collects_ordered_records() {
        let (_dir, config) = passing_project();
        let pipeline = Pipeline::new(config);

        let report = pipeline.test().await.unwrap();

        assert!(report.ok(), "report not ok: {:?}", report);
        let environments: Vec<String> = report
            .results
            .iter()
            .map(|r| r.environment.to_string())
            .collect();
        assert!(environments.contains(&"declarations".to_string()));
        assert!(environments.contains(&"server".to_string()));
        assert!(environments.contains(&"browser:firefox".to_string()));
    }

    #[tokio::test]
    async fn test_install_failure_aborts_server_tests() {
        let (_dir, mut config) = passing_project();
        config.tools.install = "false".to_string();
        let pipeline = Pipeline::new(config);

        let report = pipeline.test().await.unwrap();

        assert!(!report.ok());
        assert!(report.error.as_deref().unwrap().contains("sandbox:install"));
        // The server suite never executed, so no server record exists
        assert!(!report
            .results
            .iter()
            .any(|r| r.environment == TestEnvironment::Server));
    }

    #[tokio::test]
    async fn test_declaration_failure_fails_run() {
        let (_dir, mut config) = passing_project();
        config.tools.typecheck = "echo TS1005".to_string();
        let pipeline = Pipeline::new(config);

        let report = pipeline.test().await.unwrap();

        assert!(!report.ok());
        let decl = report
            .results
            .iter()
            .find(|r| r.environment == TestEnvironment::Declarations)
            .unwrap();
        assert!(!decl.is_passed());
    }

    #[tokio::test]
    async fn test_test_browser_single_engine_passing() {
        let (_dir, config) = passing_project();
        let pipeline = Pipeline::new(config);

        let report = pipeline.test_browser("firefox").await.unwrap();

        assert!(report.ok());
        assert_eq!(report.results.len(), 1);
        assert_eq!(
            report.results[0].environment,
            TestEnvironment::Browser("firefox".to_string())
        );
    }

    #[tokio::test]
    async fn test_test_browser_failing_engine() {
        let (_dir, mut config) = passing_project();
        config.tools.launcher = "false".to_string();
        let pipeline = Pipeline::new(config);

        let report = pipeline.test_browser("firefox").await.unwrap();

        assert!(!report.ok());
        assert!(!report.results[0].is_passed());
    }

    #[tokio::test]
    async fn test_test_browser_unknown_engine_rejected_before_tasks() {
        let (dir, config) = passing_project();
        let pipeline = Pipeline::new(config);

        let err = pipeline.test_browser("netscape").await.unwrap_err();
        assert!(matches!(err, Error::UnknownEngine(_)));
        // No bundling happened
        assert!(!dir.path().join("build/tests.js").exists());
    }

    #[tokio::test]
    async fn test_set_version_round_trip() {
        let (dir, config) = passing_project();
        write(dir.path(), "lib/version.js", "exports.version = '__VERSION__';\n");
        let pipeline = Pipeline::new(config);

        pipeline.set_version("2.1.0").unwrap();
        let stamped = fs::read_to_string(dir.path().join("lib/version.js")).unwrap();
        assert!(stamped.contains("2.1.0"));

        let err = pipeline.set_version("not-a-version").unwrap_err();
        assert!(matches!(err, Error::InvalidVersion { .. }));
    }
}

//! Test orchestration: discovery, the server test run, the browser
//! matrix, and the result records shared by both.

pub mod discovery;
pub mod matrix;
pub mod node;

pub use discovery::discover;
pub use matrix::MatrixRunner;
pub use node::ServerTestRunner;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which environment a test run executed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "engine")]
pub enum TestEnvironment {
    /// The declaration type-check pass.
    Declarations,
    /// The server process, against the sandbox-installed artifact.
    Server,
    /// One browser engine, by name.
    Browser(String),
}

impl TestEnvironment {
    /// Sort key giving the reporting order: declarations, server,
    /// then browsers by engine name.
    fn order_key(&self) -> (u8, &str) {
        match self {
            TestEnvironment::Declarations => (0, ""),
            TestEnvironment::Server => (1, ""),
            TestEnvironment::Browser(engine) => (2, engine.as_str()),
        }
    }
}

impl std::fmt::Display for TestEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestEnvironment::Declarations => write!(f, "declarations"),
            TestEnvironment::Server => write!(f, "server"),
            TestEnvironment::Browser(engine) => write!(f, "browser:{}", engine),
        }
    }
}

/// Outcome of one (environment, suite) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Passed => write!(f, "pass"),
            TestStatus::Failed => write!(f, "FAIL"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// One record per (environment, suite) pair in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunResult {
    pub environment: TestEnvironment,
    pub suite: String,
    pub status: TestStatus,
    /// Raw output from the underlying runner, kept on failure.
    pub diagnostics: Option<String>,
}

impl TestRunResult {
    pub fn passed(environment: TestEnvironment, suite: &str) -> Self {
        Self {
            environment,
            suite: suite.to_string(),
            status: TestStatus::Passed,
            diagnostics: None,
        }
    }

    pub fn failed(environment: TestEnvironment, suite: &str, diagnostics: &str) -> Self {
        Self {
            environment,
            suite: suite.to_string(),
            status: TestStatus::Failed,
            diagnostics: Some(diagnostics.to_string()),
        }
    }

    pub fn errored(environment: TestEnvironment, suite: &str, diagnostics: &str) -> Self {
        Self {
            environment,
            suite: suite.to_string(),
            status: TestStatus::Error,
            diagnostics: Some(diagnostics.to_string()),
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// The collected records of one orchestrator run.
///
/// The overall command fails (non-zero exit) if the run itself failed
/// or any record is not passing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub run_id: Uuid,
    pub results: Vec<TestRunResult>,
    /// The run-level failure, when the task graph aborted.
    pub error: Option<String>,
}

impl TestReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            results: Vec::new(),
            error: None,
        }
    }

    pub fn push(&mut self, result: TestRunResult) {
        self.results.push(result);
    }

    /// True when the run completed and every record passed.
    pub fn ok(&self) -> bool {
        self.error.is_none() && self.results.iter().all(|r| r.is_passed())
    }

    /// Render the report in declarations → server → browser order.
    pub fn render(&self) -> String {
        let mut sorted: Vec<&TestRunResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| a.environment.order_key().cmp(&b.environment.order_key()));

        let mut out = String::new();
        for result in sorted {
            out.push_str(&format!(
                "  {:<20} {:<10} {}\n",
                result.environment.to_string(),
                result.suite,
                result.status
            ));
            if let Some(diagnostics) = &result.diagnostics {
                if !result.is_passed() {
                    for line in diagnostics.lines().take(20) {
                        out.push_str(&format!("      {}\n", line));
                    }
                }
            }
        }
        if let Some(error) = &self.error {
            out.push_str(&format!("  run failed: {}\n", error));
        }
        out
    }
}

impl Default for TestReport {
    fn default() -> Self {
        Self::new()
    }
}

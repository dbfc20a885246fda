//! Project configuration loaded from `duplex.toml`.
//!
//! The configuration describes the library being built (paths, entry
//! point, version file), the opaque external tools duplex drives, the
//! closed set of browser engines, and the integration-test fixture
//! service. A missing file means defaults; every section and field has
//! a default so partial files work.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{dlog_debug, Error, Result};

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "duplex.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Project root the configuration was loaded for. Not part of the
    /// file; set by [`Config::load`].
    #[serde(skip)]
    pub root: PathBuf,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub declarations: DeclarationsConfig,
    #[serde(default)]
    pub fixture: FixtureConfig,
}

/// Paths and identity of the library under build.
///
/// All paths are interpreted relative to the project root unless
/// absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Package name used for the sandbox dependency declaration.
    pub name: String,
    /// Source tree root.
    pub src_dir: PathBuf,
    /// Test tree root.
    pub test_dir: PathBuf,
    /// Disposable build-output directory. Safe to delete between runs.
    pub out_dir: PathBuf,
    /// Bundle entry point, relative to `src_dir`.
    pub entry: PathBuf,
    /// File whose version placeholder `set-version` rewrites.
    pub version_file: PathBuf,
    /// The placeholder token replaced by `set-version`.
    pub version_placeholder: String,
    /// Package descriptor copied into the server artifact.
    pub descriptor: PathBuf,
    /// Test file suffix used during discovery.
    pub test_suffix: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "client".to_string(),
            src_dir: PathBuf::from("lib"),
            test_dir: PathBuf::from("test"),
            out_dir: PathBuf::from("build"),
            entry: PathBuf::from("index.js"),
            version_file: PathBuf::from("lib/version.js"),
            version_placeholder: "__VERSION__".to_string(),
            descriptor: PathBuf::from("package.json"),
            test_suffix: ".test.js".to_string(),
        }
    }
}

/// Command lines for the opaque external tools.
///
/// Each value is a full command line; the first word is the program,
/// the rest are leading arguments. duplex appends operation-specific
/// arguments when invoking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Server-tree compiler, invoked as `<compile> <src> <out>`.
    /// Empty means copy the tree verbatim.
    #[serde(default)]
    pub compile: String,
    /// Minifier, invoked as `<minify> <bundle> -o <out>`.
    pub minify: String,
    /// Dependency installer, invoked inside the sandbox directory.
    pub install: String,
    /// Server-side test runner, invoked with the discovered test files.
    pub test_runner: String,
    /// Browser automation launcher, invoked as `<launcher> -l <engine> <bundle>`.
    pub launcher: String,
    /// Declaration type-checker, invoked with strict flags and the
    /// configured declaration files.
    pub typecheck: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            compile: String::new(),
            minify: "uglifyjs".to_string(),
            install: "npm install".to_string(),
            test_runner: "mocha".to_string(),
            launcher: "testem ci".to_string(),
            typecheck: "tsc".to_string(),
        }
    }
}

/// Browser-target settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// The closed set of accepted engine names.
    pub engines: Vec<String>,
    /// Engines exercised by the plain `test` command. Must be a subset
    /// of `engines`.
    pub default_engines: Vec<String>,
    /// Bare (non-relative) references allowed to stay unresolved in
    /// browser bundles. Anything else unresolvable is a build error.
    #[serde(default)]
    pub externals: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engines: vec![
                "firefox".to_string(),
                "chrome".to_string(),
                "safari".to_string(),
            ],
            default_engines: vec!["firefox".to_string()],
            externals: Vec::new(),
        }
    }
}

/// Declaration/usage files checked by the Declaration Checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclarationsConfig {
    pub files: Vec<PathBuf>,
}

impl Default for DeclarationsConfig {
    fn default() -> Self {
        Self {
            files: vec![
                PathBuf::from("index.d.ts"),
                PathBuf::from("test-typings.ts"),
            ],
        }
    }
}

/// The database-like external service used as an integration-test
/// fixture. Started and stopped via the `fixture` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub command: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            command: "rethinkdb --no-update-check".to_string(),
        }
    }
}

impl Config {
    /// Load the configuration for the project rooted at `root`.
    ///
    /// A missing `duplex.toml` yields the defaults; a present but
    /// malformed one is an error. Relative paths are resolved against
    /// `root` so downstream code never has to.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        dlog_debug!("Config::load path={}", path.display());
        let mut config = if path.exists() {
            toml::from_str(&fs::read_to_string(&path)?)?
        } else {
            dlog_debug!("Config file not found, using defaults");
            Self::default()
        };
        config.resolve_paths(root);
        config.validate()?;
        Ok(config)
    }

    /// Resolve relative paths against the project root.
    fn resolve_paths(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        for path in [
            &mut self.project.src_dir,
            &mut self.project.test_dir,
            &mut self.project.out_dir,
            &mut self.project.version_file,
            &mut self.project.descriptor,
        ] {
            if path.is_relative() {
                *path = root.join(path.as_path());
            }
        }
        for file in &mut self.declarations.files {
            if file.is_relative() {
                *file = root.join(file.as_path());
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.browser.engines.is_empty() {
            return Err(Error::Validation(
                "browser.engines must not be empty".to_string(),
            ));
        }
        for engine in &self.browser.default_engines {
            if !self.browser.engines.contains(engine) {
                return Err(Error::Validation(format!(
                    "default engine '{}' is not in browser.engines",
                    engine
                )));
            }
        }
        Ok(())
    }

    /// Check that an engine name is in the closed configured set.
    pub fn require_engine(&self, engine: &str) -> Result<()> {
        if self.browser.engines.iter().any(|e| e == engine) {
            Ok(())
        } else {
            Err(Error::UnknownEngine(engine.to_string()))
        }
    }

    /// Bundle entry point as an absolute path.
    pub fn entry_path(&self) -> PathBuf {
        self.project.src_dir.join(&self.project.entry)
    }

    /// Server module tree output directory.
    pub fn node_dir(&self) -> PathBuf {
        self.project.out_dir.join("node")
    }

    /// Unminified browser bundle path.
    pub fn bundle_path(&self) -> PathBuf {
        self.project.out_dir.join(format!("{}.js", self.project.name))
    }

    /// Minified browser bundle path.
    pub fn bundle_min_path(&self) -> PathBuf {
        self.project
            .out_dir
            .join(format!("{}.min.js", self.project.name))
    }

    /// Browser test bundle path.
    pub fn test_bundle_path(&self) -> PathBuf {
        self.project.out_dir.join("tests.js")
    }

    /// Sandbox install directory.
    pub fn sandbox_dir(&self) -> PathBuf {
        self.project.out_dir.join("sandbox")
    }

    /// Pid file for the fixture service.
    pub fn fixture_pid_path(&self) -> PathBuf {
        self.project.out_dir.join("fixture.pid")
    }
}

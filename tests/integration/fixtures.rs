//! Test fixtures for integration tests.
//!
//! Provides disposable project trees with a realistic dual-target
//! layout and a configuration whose external tools are inert
//! stand-ins.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use duplex::Config;

/// A disposable project tree.
pub struct TestProject {
    /// Keeps the directory alive for the test's duration.
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestProject {
    /// Create an empty project.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    /// Create a project with a dual-implementation library, shared and
    /// environment-pinned tests, declaration files, and a version file.
    pub fn with_library() -> Self {
        let project = Self::new();
        project.write(
            "lib/index.js",
            "exports.connect = require('./connection-node');\nexports.codec = require('./codec');\n",
        );
        project.write(
            "lib/connection-node.js",
            "var codec = require('./codec');\nexports.kind = 'tcp';\n",
        );
        project.write(
            "lib/connection-browser.js",
            "var codec = require('./codec');\nexports.kind = 'websocket';\n",
        );
        project.write("lib/codec.js", "exports.encode = function (v) { return v; };\n");
        project.write("lib/version.js", "exports.version = '__VERSION__';\n");
        project.write(
            "test/codec.test.js",
            "var codec = require('../lib/codec');\n",
        );
        project.write(
            "test/connection.test.js",
            "var conn = require('../lib/connection-node');\n",
        );
        project.write("test/install-node.test.js", "// server only\n");
        project.write("test/dom-browser.test.js", "// browser only\n");
        project.write("index.d.ts", "export declare function connect(): void;\n");
        project.write("test-typings.ts", "import './index';\n");
        project.write(
            "package.json",
            "{\n  \"name\": \"client\",\n  \"version\": \"0.0.0\",\n  \"main\": \"lib/index.js\"\n}\n",
        );
        project
    }

    /// Write a file under the project root, creating parents.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent dirs");
        fs::write(&path, contents).expect("Failed to write file");
    }

    /// Read a file under the project root.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative)).expect("Failed to read file")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Load the configuration with every external tool stubbed out to
    /// succeed without side effects.
    pub fn config(&self) -> Config {
        let mut config = Config::load(&self.root).expect("Failed to load config");
        config.tools.minify = "true".to_string();
        config.tools.install = "true".to_string();
        config.tools.test_runner = "true".to_string();
        config.tools.launcher = "true".to_string();
        config.tools.typecheck = "true".to_string();
        config
    }

    /// Snapshot every file under the root as (relative path, bytes).
    pub fn snapshot(&self) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files = Vec::new();
        collect_files(&self.root, &self.root, &mut files);
        files.sort();
        files
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<(PathBuf, Vec<u8>)>) {
    for entry in fs::read_dir(dir).expect("Failed to read dir") {
        let entry = entry.expect("Failed to read entry");
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).unwrap().to_path_buf();
            files.push((relative, fs::read(&path).expect("Failed to read file")));
        }
    }
}

//! Test file discovery.
//!
//! Tests are discovered by filename suffix under the test tree. Files
//! reserved for one environment are marked in the path: a filename
//! stem ending in the environment suffix (`connection-node.test.js`)
//! or a `node`/`browser` directory component. Discovery for a target
//! environment excludes files pinned to the other one.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::transform::EnvironmentTarget;

/// The environment a test file is pinned to, if any.
pub fn file_environment(path: &Path, test_suffix: &str) -> Option<EnvironmentTarget> {
    // Directory markers take precedence: test/node/... and
    // test/browser/... partition whole subtrees.
    for component in path.components() {
        match component.as_os_str().to_str() {
            Some("node") => return Some(EnvironmentTarget::Server),
            Some("browser") => return Some(EnvironmentTarget::Browser),
            _ => {}
        }
    }

    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(test_suffix)?;
    EnvironmentTarget::classify(stem)
}

/// Discover test files for the given target environment, sorted.
pub fn discover(config: &Config, target: EnvironmentTarget) -> Result<Vec<PathBuf>> {
    let test_dir = &config.project.test_dir;
    if !test_dir.is_dir() {
        return Ok(Vec::new());
    }

    let suffix = &config.project.test_suffix;
    let mut files = Vec::new();
    for entry in WalkDir::new(test_dir) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(suffix.as_str()) {
            continue;
        }
        // Classify on the path relative to the test tree so directory
        // names above it never act as markers.
        let relative = entry.path().strip_prefix(test_dir).unwrap_or(entry.path());
        match file_environment(relative, suffix) {
            Some(environment) if environment != target => continue,
            _ => files.push(entry.path().to_path_buf()),
        }
    }
    files.sort();
    Ok(files)
}

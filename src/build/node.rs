//! Node Artifact Builder.
//!
//! Materializes the server module tree under the output directory with
//! the identity transform: module references are left exactly as
//! written. When a compiler tool is configured it is invoked over the
//! source tree; otherwise the tree is copied verbatim. The package
//! descriptor rides along so the artifact is installable by local
//! path.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tool::Tool;
use crate::dlog;

/// Builds the server module tree for a configured project.
pub struct NodeBuilder<'a> {
    config: &'a Config,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Build the server artifact, returning its directory.
    pub async fn build(&self) -> Result<PathBuf> {
        let out = self.config.node_dir();
        if out.exists() {
            fs::remove_dir_all(&out)?;
        }
        fs::create_dir_all(&out)?;

        let src = &self.config.project.src_dir;
        let tree_name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lib".to_string());
        let tree_out = out.join(&tree_name);

        if self.config.tools.compile.trim().is_empty() {
            copy_tree(src, &tree_out)?;
        } else {
            let tool = Tool::from_command_line(&self.config.tools.compile)?;
            tool.ensure_available()?;
            let result = tool
                .run(
                    &[src.display().to_string(), tree_out.display().to_string()],
                    None,
                )
                .await?;
            if !result.success() {
                return Err(Error::Build(format!(
                    "compiler failed on {}: {}",
                    src.display(),
                    result.detail()
                )));
            }
        }

        self.write_descriptor(&out, &tree_name)?;
        dlog!("Server artifact built at {}", out.display());
        Ok(out)
    }

    /// Carry the package descriptor into the artifact, synthesizing a
    /// minimal one when the project has none.
    fn write_descriptor(&self, out: &Path, tree_name: &str) -> Result<()> {
        let descriptor = &self.config.project.descriptor;
        let target = out.join("package.json");
        if descriptor.is_file() {
            fs::copy(descriptor, &target)?;
        } else {
            let minimal = serde_json::json!({
                "name": self.config.project.name,
                "version": "0.0.0",
                "main": format!("{}/index.js", tree_name),
            });
            fs::write(&target, serde_json::to_string_pretty(&minimal)?)?;
        }
        Ok(())
    }
}

/// Recursively copy a directory tree.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Validation(e.to_string()))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

//! Browser Artifact Builder.
//!
//! Resolves the full transitive reference graph from the entry point,
//! applies the environment transform to every reference, and emits a
//! single self-contained script: a small module-registry prelude
//! followed by every module body keyed by its id. The minified variant
//! is the same bundle piped through the configured minifier tool, so
//! the two are behaviorally identical by construction.

use std::fs;
use std::path::{Path, PathBuf};

use crate::build::resolver::{rewrite_source, ModuleGraph, Resolver};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::tool::Tool;
use crate::dlog;

/// Builds browser-targeted bundles for a configured project.
pub struct BrowserBuilder<'a> {
    config: &'a Config,
}

impl<'a> BrowserBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Resolve and bundle the given entries into `out`.
    ///
    /// Returns the resolved module graph so callers can report what
    /// went into the bundle.
    pub fn bundle_to(&self, entries: &[PathBuf], out: &Path) -> Result<ModuleGraph> {
        let resolver = Resolver::new(&self.config.root, &self.config.browser.externals);
        let graph = resolver.resolve_graph(entries)?;

        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(out, emit_bundle(&graph))?;
        dlog!(
            "Bundled {} modules into {}",
            graph.module_count(),
            out.display()
        );
        Ok(graph)
    }

    /// Build the unminified library bundle.
    pub async fn build(&self) -> Result<()> {
        self.bundle_to(&[self.config.entry_path()], &self.config.bundle_path())?;
        Ok(())
    }

    /// Produce the minified variant from the unminified bundle.
    pub async fn minify(&self) -> Result<()> {
        let input = self.config.bundle_path();
        let output = self.config.bundle_min_path();

        let tool = Tool::from_command_line(&self.config.tools.minify)?;
        tool.ensure_available()?;

        let result = tool
            .run(
                &[
                    input.display().to_string(),
                    "-o".to_string(),
                    output.display().to_string(),
                ],
                None,
            )
            .await?;

        if !result.success() {
            return Err(Error::Build(format!(
                "minifier failed on {}: {}",
                input.display(),
                result.detail()
            )));
        }
        dlog!("Minified bundle written to {}", output.display());
        Ok(())
    }
}

/// Emit the self-contained bundle script for a resolved module graph.
///
/// Every module body is wrapped in a registry function keyed by module
/// id; externals get a shim that resolves the name against the global
/// object. Entries are loaded in order once the registry is defined.
pub fn emit_bundle(graph: &ModuleGraph) -> String {
    let mut script = String::new();
    script.push_str("(function (modules, entries) {\n");
    script.push_str("  var cache = {};\n");
    script.push_str("  function require(id) {\n");
    script.push_str("    if (cache[id]) { return cache[id].exports; }\n");
    script.push_str(
        "    if (!modules[id]) { throw new Error(\"Cannot find module \" + id); }\n",
    );
    script.push_str("    var module = cache[id] = { exports: {} };\n");
    script
        .push_str("    modules[id].call(module.exports, module, module.exports, require);\n");
    script.push_str("    return module.exports;\n");
    script.push_str("  }\n");
    script.push_str("  for (var i = 0; i < entries.length; i++) { require(entries[i]); }\n");
    script.push_str("})({\n");

    for module in &graph.modules {
        script.push_str(&format!(
            "{}: function (module, exports, require) {{\n",
            quote(&module.id)
        ));
        script.push_str(&rewrite_source(module));
        script.push_str("\n},\n");
    }
    for external in &graph.externals {
        let name = quote(external);
        script.push_str(&format!(
            "{}: function (module) {{ module.exports = (typeof globalThis !== \"undefined\" ? globalThis : window)[{}]; }},\n",
            name, name
        ));
    }

    script.push_str("}, [");
    let entries: Vec<String> = graph.entries.iter().map(|e| quote(e)).collect();
    script.push_str(&entries.join(", "));
    script.push_str("]);\n");
    script
}

/// JSON-quote a module id for embedding in the bundle script.
fn quote(id: &str) -> String {
    serde_json::Value::String(id.to_string()).to_string()
}

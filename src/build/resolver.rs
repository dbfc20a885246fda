//! Module reference resolution for browser-targeted bundles.
//!
//! Starting from one or more entry points, the resolver scans source
//! text for module-reference expressions, applies the environment
//! transform to each literal, and resolves relative references against
//! the including file. The result is the full transitive module graph
//! a bundle needs, with every reference mapped to either an internal
//! module id or a declared external. Any reference that cannot be
//! resolved fails the build, naming the reference and the including
//! file.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::transform::{rewrite_reference, EnvironmentTarget};
use crate::dlog_trace;

fn require_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).expect("require pattern is valid")
    })
}

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"import\s+(?:[\w$*{},\s]+\s+from\s+)?['"]([^'"]+)['"]"#)
            .expect("import pattern is valid")
    })
}

/// Where a reference resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// Another module in the graph, by module id.
    Module(String),
    /// A declared external left unresolved in the bundle.
    External(String),
}

/// One reference literal inside a module, with its resolution.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// The literal exactly as written in the source.
    pub literal: String,
    /// The environment the literal is pinned to, classified once at
    /// resolution time.
    pub environment: Option<EnvironmentTarget>,
    pub target: ReferenceTarget,
}

/// A resolved module: id, on-disk path, source text, and references.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    /// Stable id: the path relative to the resolver root, `/`-separated.
    pub id: String,
    pub path: PathBuf,
    pub source: String,
    pub references: Vec<ResolvedReference>,
}

/// The transitive module graph of a bundle.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    /// Modules in deterministic breadth-first discovery order.
    pub modules: Vec<ResolvedModule>,
    /// Ids of the entry modules, in entry order.
    pub entries: Vec<String>,
    /// Externals referenced anywhere in the graph, in first-use order.
    pub externals: Vec<String>,
}

impl ModuleGraph {
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m.id == id)
    }
}

/// Extract module-reference literals from source text, in order.
pub fn scan_references(source: &str) -> Vec<String> {
    let mut literals = Vec::new();
    for capture in require_pattern().captures_iter(source) {
        literals.push(capture[1].to_string());
    }
    for capture in import_pattern().captures_iter(source) {
        literals.push(capture[1].to_string());
    }
    literals
}

/// Resolves reference graphs rooted at a project directory.
pub struct Resolver {
    root: PathBuf,
    externals: Vec<String>,
    /// Apply the environment transform to every reference before
    /// resolution. On for browser-targeted bundles, off would be the
    /// identity policy (the server tree is never bundled, so the
    /// resolver is only ever used with the transform on).
    transform: bool,
}

impl Resolver {
    pub fn new(root: &Path, externals: &[String]) -> Self {
        // Canonicalize so module ids stay stable when entry paths come
        // in through symlinked directories.
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        Self {
            root,
            externals: externals.to_vec(),
            transform: true,
        }
    }

    /// Resolve the transitive reference graph from the given entries.
    pub fn resolve_graph(&self, entry_paths: &[PathBuf]) -> Result<ModuleGraph> {
        let mut modules = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut externals_used: Vec<String> = Vec::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut entries = Vec::new();

        for entry in entry_paths {
            let path = entry
                .canonicalize()
                .map_err(|_| Error::Resolution {
                    reference: entry.display().to_string(),
                    from: self.root.clone(),
                })?;
            entries.push(self.module_id(&path));
            queue.push_back(path);
        }

        while let Some(path) = queue.pop_front() {
            let id = self.module_id(&path);
            if !visited.insert(id.clone()) {
                continue;
            }

            let source = fs::read_to_string(&path)?;
            let mut references = Vec::new();

            for literal in scan_references(&source) {
                let environment = EnvironmentTarget::classify(&literal);
                let effective = match environment {
                    Some(EnvironmentTarget::Server) if self.transform => {
                        rewrite_reference(&literal)
                    }
                    _ => literal.clone(),
                };

                if is_relative(&effective) {
                    let resolved = self.resolve_relative(&path, &effective)?;
                    dlog_trace!(
                        "Resolved '{}' from {} -> {}",
                        literal,
                        path.display(),
                        resolved.display()
                    );
                    references.push(ResolvedReference {
                        literal,
                        environment,
                        target: ReferenceTarget::Module(self.module_id(&resolved)),
                    });
                    queue.push_back(resolved);
                } else if self.externals.iter().any(|e| e == &effective) {
                    if !externals_used.contains(&effective) {
                        externals_used.push(effective.clone());
                    }
                    references.push(ResolvedReference {
                        literal,
                        environment,
                        target: ReferenceTarget::External(effective),
                    });
                } else {
                    return Err(Error::Resolution {
                        reference: effective,
                        from: path,
                    });
                }
            }

            modules.push(ResolvedModule {
                id,
                path,
                source,
                references,
            });
        }

        Ok(ModuleGraph {
            modules,
            entries,
            externals: externals_used,
        })
    }

    /// Resolve a relative reference against the including file.
    ///
    /// Candidates, in order: the exact path, the path with a `.js`
    /// extension, the path as a directory with `index.js`.
    fn resolve_relative(&self, from: &Path, reference: &str) -> Result<PathBuf> {
        let base = from.parent().unwrap_or(Path::new("."));
        let joined = normalize(&base.join(reference));

        let mut candidates = vec![joined.clone()];
        if joined.extension().is_none() {
            candidates.push(joined.with_extension("js"));
        }
        candidates.push(joined.join("index.js"));

        for candidate in candidates {
            if candidate.is_file() {
                return candidate.canonicalize().map_err(Error::Io);
            }
        }

        Err(Error::Resolution {
            reference: reference.to_string(),
            from: from.to_path_buf(),
        })
    }

    /// Module id: path relative to the root, `/`-separated.
    fn module_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        parts.join("/")
    }
}

/// Lexically normalize a path (resolve `.` and `..` components).
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Rewrite the reference literals in a module's source to its resolved
/// targets, producing the text embedded in the bundle.
///
/// Internal references become module ids; externals keep their name.
/// Both quote styles are rewritten so `require('./x')` and
/// `require("./x")` land on the same registry key.
pub fn rewrite_source(module: &ResolvedModule) -> String {
    let mut rewritten = module.source.clone();
    let mut replacements: HashMap<&str, &str> = HashMap::new();
    for reference in &module.references {
        let target = match &reference.target {
            ReferenceTarget::Module(id) => id.as_str(),
            ReferenceTarget::External(name) => name.as_str(),
        };
        replacements.insert(reference.literal.as_str(), target);
    }
    for (literal, target) in replacements {
        let quoted_target = format!("\"{}\"", target);
        rewritten = rewritten.replace(&format!("'{}'", literal), &quoted_target);
        rewritten = rewritten.replace(&format!("\"{}\"", literal), &quoted_target);
    }
    rewritten
}

fn is_relative(reference: &str) -> bool {
    reference.starts_with("./") || reference.starts_with("../")
}

//! Artifact builders: the server module tree, the browser bundles, and
//! the module-reference resolution they share.

pub mod browser;
pub mod node;
pub mod resolver;

pub use browser::BrowserBuilder;
pub use node::NodeBuilder;
pub use resolver::{ModuleGraph, ReferenceTarget, ResolvedModule, Resolver};

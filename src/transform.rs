//! Environment-specific source transform.
//!
//! Dual-implementation modules ship as sibling files distinguished by
//! a reserved name suffix: `foo-node` holds the server implementation
//! (filesystem, process control, native sockets), `foo-browser` the
//! browser implementation of the same interface. Server builds load
//! references as written; browser-targeted bundles rewrite every
//! server reference to its browser sibling so a bundle never pulls in
//! a module that assumes server runtime capabilities.

use serde::{Deserialize, Serialize};

/// Reserved suffix marking the server implementation of a
/// dual-implementation module.
pub const SERVER_SUFFIX: &str = "-node";

/// Reserved suffix marking the browser implementation.
pub const BROWSER_SUFFIX: &str = "-browser";

/// Which environment a module reference is pinned to.
///
/// Resolved once per reference as a tagged value rather than by
/// repeated string inspection at each use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentTarget {
    /// Server-side runtime implementation.
    Server,
    /// Browser implementation.
    Browser,
}

impl EnvironmentTarget {
    /// The reserved reference suffix for this environment.
    pub fn suffix(&self) -> &'static str {
        match self {
            EnvironmentTarget::Server => SERVER_SUFFIX,
            EnvironmentTarget::Browser => BROWSER_SUFFIX,
        }
    }

    /// Classify a literal module reference by its suffix.
    ///
    /// Returns `None` for references that are not environment-pinned.
    /// A trailing `.js` extension is ignored for classification.
    pub fn classify(reference: &str) -> Option<Self> {
        let stem = reference.strip_suffix(".js").unwrap_or(reference);
        if stem.ends_with(SERVER_SUFFIX) {
            Some(EnvironmentTarget::Server)
        } else if stem.ends_with(BROWSER_SUFFIX) {
            Some(EnvironmentTarget::Browser)
        } else {
            None
        }
    }
}

impl std::fmt::Display for EnvironmentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvironmentTarget::Server => write!(f, "server"),
            EnvironmentTarget::Browser => write!(f, "browser"),
        }
    }
}

/// Rewrite a module reference for a browser-targeted bundle.
///
/// A reference ending in the server suffix is redirected to the
/// browser sibling (identical up to the suffix); anything else passes
/// through unchanged. Only exact-suffix matches rewrite, and the
/// rewritten form no longer matches the server suffix, so applying the
/// transform twice equals applying it once.
pub fn rewrite_reference(reference: &str) -> String {
    if let Some(stem) = reference.strip_suffix("-node.js") {
        format!("{}{}.js", stem, BROWSER_SUFFIX)
    } else if let Some(stem) = reference.strip_suffix(SERVER_SUFFIX) {
        format!("{}{}", stem, BROWSER_SUFFIX)
    } else {
        reference.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_server_reference() {
        assert_eq!(rewrite_reference("./transport-node"), "./transport-browser");
        assert_eq!(rewrite_reference("../net-node"), "../net-browser");
    }

    #[test]
    fn test_rewrite_with_extension() {
        assert_eq!(
            rewrite_reference("./transport-node.js"),
            "./transport-browser.js"
        );
    }

    #[test]
    fn test_rewrite_preserves_prefix_characters() {
        let input = "./deep/path/to/socket-node";
        let output = rewrite_reference(input);
        assert_eq!(output, "./deep/path/to/socket-browser");
        // Character-identical up to the suffix
        assert_eq!(
            &output[..output.len() - BROWSER_SUFFIX.len()],
            &input[..input.len() - SERVER_SUFFIX.len()]
        );
    }

    #[test]
    fn test_non_matching_passes_through() {
        assert_eq!(rewrite_reference("./parser"), "./parser");
        assert_eq!(rewrite_reference("./node-helpers"), "./node-helpers");
        assert_eq!(rewrite_reference("events"), "events");
        // Suffix must terminate the reference
        assert_eq!(
            rewrite_reference("./socket-node/extra"),
            "./socket-node/extra"
        );
        // Near-miss suffix
        assert_eq!(rewrite_reference("./socket-nodes"), "./socket-nodes");
    }

    #[test]
    fn test_browser_reference_passes_through() {
        assert_eq!(
            rewrite_reference("./transport-browser"),
            "./transport-browser"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        for reference in [
            "./transport-node",
            "./transport-node.js",
            "./transport-browser",
            "./parser",
            "events",
        ] {
            let once = rewrite_reference(reference);
            let twice = rewrite_reference(&once);
            assert_eq!(once, twice, "not idempotent for {}", reference);
        }
    }

    #[test]
    fn test_classify_server() {
        assert_eq!(
            EnvironmentTarget::classify("./net-node"),
            Some(EnvironmentTarget::Server)
        );
        assert_eq!(
            EnvironmentTarget::classify("./net-node.js"),
            Some(EnvironmentTarget::Server)
        );
    }

    #[test]
    fn test_classify_browser() {
        assert_eq!(
            EnvironmentTarget::classify("./net-browser"),
            Some(EnvironmentTarget::Browser)
        );
    }

    #[test]
    fn test_classify_shared() {
        assert_eq!(EnvironmentTarget::classify("./parser"), None);
        assert_eq!(EnvironmentTarget::classify("events"), None);
    }

    #[test]
    fn test_suffix_accessor() {
        assert_eq!(EnvironmentTarget::Server.suffix(), "-node");
        assert_eq!(EnvironmentTarget::Browser.suffix(), "-browser");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", EnvironmentTarget::Server), "server");
        assert_eq!(format!("{}", EnvironmentTarget::Browser), "browser");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&EnvironmentTarget::Browser).unwrap();
        assert_eq!(json, "\"browser\"");
        let parsed: EnvironmentTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, EnvironmentTarget::Browser);
    }
}

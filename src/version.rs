//! Version Stamper.
//!
//! Rewrites the single version placeholder in the designated source
//! file with an externally supplied semantic version. Validation
//! happens before any filesystem write, so a bad version string leaves
//! every file untouched. This is the only component that mutates a
//! tracked file outside the build-output directory.

use std::fs;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::dlog;

/// Validate a semantic version string.
pub fn parse_version(version: &str) -> Result<semver::Version> {
    semver::Version::parse(version).map_err(|e| Error::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })
}

/// Stamp the configured version file with the given version.
///
/// Replaces exactly one occurrence of the placeholder token. Zero
/// occurrences means the file was already stamped or misconfigured;
/// both are errors rather than silent no-ops.
pub fn stamp(config: &Config, version: &str) -> Result<()> {
    let parsed = parse_version(version)?;

    let path = &config.project.version_file;
    let placeholder = &config.project.version_placeholder;
    let contents = fs::read_to_string(path)?;

    if !contents.contains(placeholder.as_str()) {
        return Err(Error::Validation(format!(
            "Placeholder '{}' not found in {}",
            placeholder,
            path.display()
        )));
    }

    let stamped = contents.replacen(placeholder.as_str(), &parsed.to_string(), 1);
    fs::write(path, stamped)?;
    dlog!("Stamped {} with version {}", path.display(), parsed);
    Ok(())
}

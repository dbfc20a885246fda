//! Filesystem properties of the version stamper.

use duplex::{Error, Pipeline};

use crate::fixtures::TestProject;

#[test]
fn test_stamp_rewrites_exactly_one_occurrence() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    pipeline.set_version("1.2.3").unwrap();

    let stamped = project.read("lib/version.js");
    assert_eq!(stamped, "exports.version = '1.2.3';\n");
}

#[test]
fn test_stamp_leaves_every_other_file_byte_identical() {
    let project = TestProject::with_library();
    let before = project.snapshot();
    let pipeline = Pipeline::new(project.config());

    pipeline.set_version("1.2.3").unwrap();

    let after = project.snapshot();
    assert_eq!(before.len(), after.len());
    for ((path_before, bytes_before), (path_after, bytes_after)) in
        before.iter().zip(after.iter())
    {
        assert_eq!(path_before, path_after);
        if path_before.ends_with("lib/version.js") {
            assert_ne!(bytes_before, bytes_after);
        } else {
            assert_eq!(
                bytes_before, bytes_after,
                "{} changed unexpectedly",
                path_before.display()
            );
        }
    }
}

#[test]
fn test_invalid_version_fails_and_touches_nothing() {
    let project = TestProject::with_library();
    let before = project.snapshot();
    let pipeline = Pipeline::new(project.config());

    let err = pipeline.set_version("not-a-version").unwrap_err();
    assert!(matches!(err, Error::InvalidVersion { ref version, .. } if version == "not-a-version"));

    assert_eq!(before, project.snapshot());
}

#[test]
fn test_prerelease_versions_are_valid() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    pipeline.set_version("2.0.0-rc.1").unwrap();
    assert!(project.read("lib/version.js").contains("2.0.0-rc.1"));
}

#[test]
fn test_second_stamp_fails_once_placeholder_is_gone() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    pipeline.set_version("1.0.0").unwrap();
    let err = pipeline.set_version("1.0.1").unwrap_err();
    assert!(err.to_string().contains("Placeholder"));
}

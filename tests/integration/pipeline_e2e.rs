//! End-to-end pipeline tests against a disposable project tree.

use std::fs;

use duplex::testing::TestEnvironment;
use duplex::{Error, Pipeline};

use crate::fixtures::TestProject;

#[tokio::test]
async fn test_build_emits_all_artifacts() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    pipeline.build().await.unwrap();

    // Server tree: verbatim copy plus the descriptor
    assert!(project.path("build/node/lib/index.js").is_file());
    assert!(project.path("build/node/lib/connection-node.js").is_file());
    assert!(project.path("build/node/package.json").is_file());

    // Browser bundle exists and the transform was applied
    let bundle = project.read("build/client.js");
    assert!(bundle.contains("\"lib/connection-browser.js\""));
    assert!(!bundle.contains("\"lib/connection-node.js\""));
}

#[tokio::test]
async fn test_server_tree_is_untransformed() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    pipeline.build().await.unwrap();

    let index = project.read("build/node/lib/index.js");
    assert!(index.contains("require('./connection-node')"));
    // Byte-identical to the source
    assert_eq!(index, project.read("lib/index.js"));
}

#[tokio::test]
async fn test_bundle_registry_loads_entry() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    pipeline.build().await.unwrap();

    let bundle = project.read("build/client.js");
    // Registry prelude plus the entry list
    assert!(bundle.starts_with("(function (modules, entries)"));
    assert!(bundle.ends_with("}, [\"lib/index.js\"]);\n"));
    // Shared dependency appears exactly once
    assert_eq!(bundle.matches("\"lib/codec.js\": function").count(), 1);
}

#[tokio::test]
async fn test_build_fails_on_unresolvable_reference() {
    let project = TestProject::with_library();
    project.write("lib/index.js", "require('./gone');\n");
    let pipeline = Pipeline::new(project.config());

    let err = pipeline.build().await.unwrap_err();
    match err {
        Error::TaskFailed { task, detail } => {
            assert_eq!(task, "build:browser");
            assert!(detail.contains("./gone"));
            assert!(detail.contains("index.js"));
        }
        other => panic!("Expected TaskFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_full_test_run_all_passing() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    let report = pipeline.test().await.unwrap();

    assert!(report.ok(), "report: {:?}", report);
    let environments: Vec<String> = report
        .results
        .iter()
        .map(|r| r.environment.to_string())
        .collect();
    assert!(environments.contains(&"declarations".to_string()));
    assert!(environments.contains(&"server".to_string()));
    assert!(environments.contains(&"browser:firefox".to_string()));

    // The test bundle excluded the server-only file and kept the
    // browser-only one.
    let test_bundle = project.read("build/tests.js");
    assert!(test_bundle.contains("dom-browser.test.js"));
    assert!(!test_bundle.contains("install-node.test.js"));
}

#[tokio::test]
async fn test_install_failure_blocks_server_tests() {
    let project = TestProject::with_library();
    let mut config = project.config();
    config.tools.install = "false".to_string();
    let pipeline = Pipeline::new(config);

    let report = pipeline.test().await.unwrap();

    assert!(!report.ok());
    assert!(report
        .error
        .as_deref()
        .unwrap()
        .contains("sandbox:install"));
    assert!(!report
        .results
        .iter()
        .any(|r| r.environment == TestEnvironment::Server));
}

#[tokio::test]
async fn test_failing_engine_yields_failed_record_per_engine() {
    let project = TestProject::with_library();
    let mut config = project.config();
    config.tools.launcher = "false".to_string();
    let pipeline = Pipeline::new(config);

    let report = pipeline.test_browser("firefox").await.unwrap();

    assert!(!report.ok());
    assert_eq!(report.results.len(), 1);
    let record = &report.results[0];
    assert_eq!(
        record.environment,
        TestEnvironment::Browser("firefox".to_string())
    );
    assert!(!record.is_passed());
}

#[tokio::test]
async fn test_passing_engine_yields_ok_report() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    let report = pipeline.test_browser("firefox").await.unwrap();

    assert!(report.ok());
    assert!(project.path("build/tests.js").is_file());
}

#[tokio::test]
async fn test_unknown_engine_is_rejected_up_front() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    let err = pipeline.test_browser("netscape").await.unwrap_err();
    assert!(matches!(err, Error::UnknownEngine(ref name) if name == "netscape"));
    assert!(!project.path("build/tests.js").exists());
}

#[tokio::test]
async fn test_output_directory_is_disposable() {
    let project = TestProject::with_library();
    let pipeline = Pipeline::new(project.config());

    pipeline.build().await.unwrap();
    fs::remove_dir_all(project.path("build")).unwrap();

    // A fresh run regenerates everything from scratch
    pipeline.build().await.unwrap();
    assert!(project.path("build/client.js").is_file());
    assert!(project.path("build/node/lib/index.js").is_file());
}

//! End-to-end tests for the bumpscout CLI
//!
//! These tests verify:
//! - Conflicting output options are rejected before any query
//! - Lines, JSON and text output against a local registry
//! - `-u` rewrites package.json and exit codes follow `--error-level`
//! - yarn without a lockfile fails with its precondition message

use assert_cmd::Command;
use mockito::{Mock, Server, ServerGuard};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PACKAGE_JSON: &str = r#"{
  "name": "test-project",
  "version": "1.0.0",
  "dependencies": {
    "ncu-test-v2": "^1.0.0",
    "ncu-test-tag": "1.0.0"
  }
}
"#;

/// Create a project directory with a package.json
fn create_test_project() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::write(temp_dir.path().join("package.json"), PACKAGE_JSON).unwrap();
    temp_dir
}

/// Local registry serving the two packages of the test project
struct Registry {
    server: ServerGuard,
    _mocks: Vec<Mock>,
}

impl Registry {
    fn url(&self) -> String {
        self.server.url()
    }
}

fn create_registry() -> Registry {
    let mut server = Server::new();
    let v2 = server
        .mock("GET", "/ncu-test-v2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "dist-tags": { "latest": "2.0.0" },
                "time": { "2.0.0": "2017-10-15T21:48:11.660Z" },
                "versions": { "1.0.0": {}, "1.1.0": {}, "2.0.0": {} }
            }"#,
        )
        .create();
    let tag = server
        .mock("GET", "/ncu-test-tag")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "dist-tags": { "latest": "1.1.0", "beta": "2.0.0-beta.1" },
                "versions": { "1.0.0": {}, "1.1.0": {}, "2.0.0-beta.1": {} }
            }"#,
        )
        .create();
    Registry {
        server,
        _mocks: vec![v2, tag],
    }
}

fn bumpscout() -> Command {
    let mut cmd = Command::cargo_bin("bumpscout").expect("binary should be built");
    cmd.env_remove("RUST_LOG");
    cmd
}

mod option_validation {
    use super::*;

    #[test]
    fn test_lines_with_json_upgraded() {
        bumpscout()
            .args(["--format", "lines", "--jsonUpgraded"])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Cannot specify both --format lines and --jsonUpgraded.",
            ));
    }

    #[test]
    fn test_lines_with_json_all() {
        bumpscout()
            .args(["--format", "lines", "--jsonAll"])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Cannot specify both --format lines and --jsonAll.",
            ));
    }

    #[test]
    fn test_lines_with_other_format() {
        bumpscout()
            .args(["--format", "lines,group"])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Cannot use --format lines with other formatting options.",
            ));
    }

    #[test]
    fn test_validation_happens_before_reading_manifest() {
        let empty = tempfile::tempdir().unwrap();
        bumpscout()
            .arg("--cwd")
            .arg(empty.path())
            .args(["--format", "lines", "--jsonAll"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("package.json").not());
    }

    #[test]
    fn test_invalid_target() {
        bumpscout().args(["--target", "newest"]).assert().failure();
    }

    #[test]
    fn test_help() {
        bumpscout()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("package.json"));
    }
}

mod registry_runs {
    use super::*;

    fn run_in(project: &TempDir, server: &Registry) -> Command {
        let mut cmd = bumpscout();
        cmd.arg("--cwd")
            .arg(project.path())
            .args(["--packageManager", "npm", "--registry"])
            .arg(server.url());
        cmd
    }

    #[test]
    fn test_lines_output() {
        let project = create_test_project();
        let server = create_registry();
        run_in(&project, &server)
            .args(["--format", "lines"])
            .assert()
            .success()
            .stdout("ncu-test-v2@^2.0.0\nncu-test-tag@1.1.0\n");
    }

    #[test]
    fn test_json_upgraded_output() {
        let project = create_test_project();
        let server = create_registry();
        let output = run_in(&project, &server)
            .arg("--jsonUpgraded")
            .output()
            .unwrap();

        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "ncu-test-v2": "^2.0.0", "ncu-test-tag": "1.1.0" })
        );
    }

    #[test]
    fn test_tag_target() {
        let project = create_test_project();
        let server = create_registry();
        run_in(&project, &server)
            .args(["--format", "lines", "--target", "@beta", "ncu-test-tag"])
            .assert()
            .success()
            .stdout("ncu-test-tag@2.0.0-beta.1\n");
    }

    #[test]
    fn test_time_format_prints_publish_time() {
        let project = create_test_project();
        let server = create_registry();
        run_in(&project, &server)
            .args(["--format", "time"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2017-10-15T21:48:11.660Z"));
    }

    #[test]
    fn test_upgrade_rewrites_manifest() {
        let project = create_test_project();
        let server = create_registry();
        run_in(&project, &server)
            .arg("-u")
            .assert()
            .success()
            .stdout(predicate::str::contains("Run npm install to install new versions."));

        let written = fs::read_to_string(project.path().join("package.json")).unwrap();
        assert_eq!(
            written,
            PACKAGE_JSON
                .replace("\"^1.0.0\"", "\"^2.0.0\"")
                .replace("\"1.0.0\"\n", "\"1.1.0\"\n")
        );
        assert!(written.contains("\"version\": \"1.0.0\""));
    }

    #[test]
    fn test_error_level_two_fails_when_upgrades_exist() {
        let project = create_test_project();
        let server = create_registry();
        run_in(&project, &server)
            .args(["--error-level", "2"])
            .assert()
            .code(1);
    }

    #[test]
    fn test_stdin_manifest() {
        let empty = tempfile::tempdir().unwrap();
        let server = create_registry();
        bumpscout()
            .arg("--cwd")
            .arg(empty.path())
            .args(["--packageManager", "npm", "--stdin", "--format", "lines", "--registry"])
            .arg(server.url())
            .write_stdin(PACKAGE_JSON)
            .assert()
            .success()
            .stdout("ncu-test-v2@^2.0.0\nncu-test-tag@1.1.0\n");
    }
}

mod backend_preconditions {
    use super::*;

    #[test]
    fn test_yarn_without_lockfile() {
        let project = create_test_project();
        bumpscout()
            .arg("--cwd")
            .arg(project.path())
            .args(["--packageManager", "yarn"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains(
                "No lockfile in this directory. Run `yarn install` to generate one.",
            ));
    }

    #[test]
    fn test_missing_manifest() {
        let empty = tempfile::tempdir().unwrap();
        bumpscout()
            .arg("--cwd")
            .arg(empty.path())
            .args(["--packageManager", "npm"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("package.json"));
    }
}

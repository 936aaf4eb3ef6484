use predicates::prelude::*;
mod common;
use common::isolated;

fn outside_project() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// The help lists every command
#[test]
fn test_cli_help() {
    let dir = outside_project();
    isolated(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Static websites and serverless APIs"))
        .stdout(predicate::str::contains("programs"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("outputs"))
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn test_cli_version() {
    let dir = outside_project();
    isolated(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sitestack"));
}

/// Programs are listed without a project
#[test]
fn test_programs_list() {
    let dir = outside_project();
    isolated(dir.path())
        .arg("programs")
        .assert()
        .success()
        .stdout(predicate::str::contains("static-website-aws"))
        .stdout(predicate::str::contains("static-website-azure"))
        .stdout(predicate::str::contains("static-website-gcp"))
        .stdout(predicate::str::contains("serverless-azure"))
        .stdout(predicate::str::contains("serverless-azure-public"));
}

#[test]
fn test_up_help() {
    let dir = outside_project();
    isolated(dir.path())
        .arg("up")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[STACK]"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_outputs_help() {
    let dir = outside_project();
    isolated(dir.path())
        .arg("outputs")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[STACK]"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_invalid_command() {
    let dir = outside_project();
    isolated(dir.path()).arg("invalid-command").assert().failure();
}

/// Outside a project the root cannot be found
#[test]
fn test_preview_without_project() {
    let dir = outside_project();
    isolated(dir.path())
        .arg("preview")
        .assert()
        .failure()
        .stderr(predicate::str::contains("project root not found"));
}

/// The hidden -s flag still parses
#[test]
fn test_stack_flag_parses() {
    let dir = outside_project();
    isolated(dir.path())
        .arg("preview")
        .arg("-s")
        .arg("prod")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument").not());
}

#[test]
fn test_stack_positional_conflicts_with_flag() {
    let dir = outside_project();
    isolated(dir.path())
        .arg("preview")
        .arg("prod")
        .arg("-s")
        .arg("dev")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

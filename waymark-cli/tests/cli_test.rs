//! Drives the `waymark` binary against a shell store in a temporary project

use std::path::Path;
use std::process::{Command, Output};

fn waymark(project: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_waymark"))
        .current_dir(project)
        .env("WAYMARK_MIGRATIONS_ROOT", project.join("migrations"))
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("failed to run waymark")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_create_apply_status_revert() {
    let project = tempfile::tempdir().unwrap();
    let store = project.path().join("migrations").join("shell");
    std::fs::create_dir_all(&store).unwrap();
    std::fs::write(
        project.path().join("waymark.yaml"),
        "shell:\n  ledger: ledger.json\n",
    )
    .unwrap();

    let output = waymark(project.path(), &["create", "--dir", "migrations/shell", "Touch Marker"]);
    assert!(output.status.success(), "{:?}", output);

    let created: Vec<_> = std::fs::read_dir(&store)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(created.len(), 1);
    let unit = &created[0];
    assert!(unit.to_string_lossy().ends_with("-touch-marker.sql"));
    std::fs::write(unit, "-- forward\ntouch marker\n-- reverse\nrm -f marker\n").unwrap();

    let output = waymark(project.path(), &["apply"]);
    assert!(output.status.success(), "{:?}", output);
    assert!(project.path().join("marker").exists());
    assert!(project.path().join("ledger.json").exists());

    // Nothing left to do on a second run
    let output = waymark(project.path(), &["apply"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("0 applied"));

    let output = waymark(project.path(), &["status", "--dir", "migrations/shell"]);
    assert!(stdout(&output).contains("applied"));
    assert!(stdout(&output).contains("0 pending"));

    let unit_arg = unit.to_string_lossy().into_owned();
    let output = waymark(project.path(), &["apply", &unit_arg]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("has already been applied"));

    let output = waymark(project.path(), &["revert", &unit_arg]);
    assert!(output.status.success(), "{:?}", output);
    assert!(!project.path().join("marker").exists());
}

#[test]
fn test_unknown_store_fails() {
    let project = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(project.path().join("migrations").join("mongo")).unwrap();

    let output = waymark(project.path(), &["apply"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("mongo"));
}

#[test]
fn test_stores_lists_builtin_adapters() {
    let project = tempfile::tempdir().unwrap();
    let output = waymark(project.path(), &["stores"]);
    assert!(output.status.success());
    let listed = stdout(&output);
    assert!(listed.contains("sqlite"));
    assert!(listed.contains("shell"));
}

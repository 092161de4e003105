//! Integration tests for the fsbridge binary

use std::process::{Command, Output};

/// Helper to run fsbridge with an isolated HOME and working directory
fn fsbridge(args: &[&str], home: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fsbridge"))
        .args(args)
        .env("HOME", home)
        .env_remove("FSBRIDGE_TEST_ROOT")
        .env_remove("FSBRIDGE_MAX_FILE_SIZE_MB")
        .env_remove("FSBRIDGE_LOG")
        .current_dir(home)
        .output()
        .expect("Failed to execute fsbridge")
}

#[test]
fn test_help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    let output = fsbridge(&["--help"], home.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for cmd in ["probe", "compare", "regressions", "report", "config"] {
        assert!(stdout.contains(cmd), "missing {cmd} in:\n{stdout}");
    }
}

#[test]
fn test_probe_succeeds_in_temp_dir() {
    let home = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let output = fsbridge(&["probe", target.path().to_str().unwrap()], home.path());
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "{stderr}");
    assert!(stderr.contains("0 failed"));
}

#[test]
fn test_probe_uses_configured_test_root() {
    let home = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(home.path().join(".fsbridge")).unwrap();
    std::fs::write(
        home.path().join(".fsbridge/config.toml"),
        format!("[behavior]\ntest_root = {:?}\n", target.path().to_str().unwrap()),
    )
    .unwrap();

    let output = fsbridge(&["probe"], home.path());
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "{stderr}");
    assert!(stderr.contains(target.path().to_str().unwrap()));
}

#[test]
fn test_regressions_pass_on_same_filesystem() {
    let home = tempfile::tempdir().unwrap();
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let output = fsbridge(
        &["regressions", a.path().to_str().unwrap(), b.path().to_str().unwrap()],
        home.path(),
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stderr).contains("4 regressions replayed"));
}

#[test]
fn test_compare_small_run() {
    let home = tempfile::tempdir().unwrap();
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let output = fsbridge(
        &[
            "compare",
            a.path().to_str().unwrap(),
            b.path().to_str().unwrap(),
            "--max-file-size-mb",
            "1",
            "-n",
            "3",
        ],
        home.path(),
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stderr).contains("3 sequences agreed"));
}

#[test]
fn test_compare_missing_dir_fails() {
    let home = tempfile::tempdir().unwrap();
    let a = tempfile::tempdir().unwrap();
    let output = fsbridge(
        &["compare", a.path().to_str().unwrap(), "/definitely/not/here", "-n", "1"],
        home.path(),
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a directory"));
}

#[test]
fn test_compare_oversized_max_file_size_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let huge = (usize::MAX / 2).to_string();
    let output = fsbridge(
        &[
            "compare",
            a.path().to_str().unwrap(),
            b.path().to_str().unwrap(),
            "--max-file-size-mb",
            &huge,
            "-n",
            "1",
        ],
        home.path(),
    );

    // A clean error exit, not an abort
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not fit"));
}

fn write_results(dir: &std::path::Path) {
    std::fs::write(
        dir.join("ext4.json"),
        concat!(
            r#"{ "type": "test", "name": "open::nonexistent::rdonly_creat", "event": "ok" }"#,
            "\n",
            r#"{ "type": "test", "name": "statfs::test_statfs", "event": "ok" }"#,
            "\n",
        ),
    )
    .unwrap();
    std::fs::write(
        dir.join("fuse.json"),
        r#"{ "type": "test", "name": "open::nonexistent::rdonly_creat", "event": "failed" }"#,
    )
    .unwrap();
}

#[test]
fn test_report_prints_csv_matrix() {
    let home = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    write_results(results.path());

    let output = fsbridge(&["report", results.path().to_str().unwrap()], home.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines[0], "test,ext4,fuse");
    assert_eq!(lines[1], "open::nonexistent::rdonly_creat,\u{2705},\u{274c}");
    assert_eq!(lines[2], "statfs::test_statfs,\u{2705},\u{26a0}");
}

#[test]
fn test_report_markdown_and_strict() {
    let home = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    write_results(results.path());
    let dir = results.path().to_str().unwrap();

    let output = fsbridge(&["report", dir, "--format", "markdown"], home.path());
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("| test | ext4 | fuse |"));

    let output = fsbridge(&["report", dir, "--strict"], home.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_config_show_outputs_toml() {
    let home = tempfile::tempdir().unwrap();
    let output = fsbridge(&["config", "show"], home.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("[behavior]"));
    assert!(stdout.contains("[logging]"));
}

#[test]
fn test_config_path() {
    let home = tempfile::tempdir().unwrap();
    let output = fsbridge(&["config", "path"], home.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Global:"));
    assert!(stdout.contains(".fsbridge/config.toml"));
    assert!(stdout.contains("Project:"));
}

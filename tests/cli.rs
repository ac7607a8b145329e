#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

fn muxrun() -> Command {
    let mut cmd = Command::cargo_bin("muxrun").unwrap();
    cmd.timeout(Duration::from_secs(30));
    cmd
}

#[test]
fn test_runs_processes_from_flags() {
    muxrun()
        .args(["--no-color", "-p", "api=echo hello", "-p", "web=echo world"])
        .assert()
        .success()
        .stdout(predicate::str::contains("│ api │ hello"))
        .stdout(predicate::str::contains("│ web │ world"));
}

#[test]
fn test_runs_processes_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("data.txt"), "from the file\n").unwrap();
    let config = dir.path().join("muxrun.yml");
    std::fs::write(
        &config,
        r#"
prefix_column_size: 8
processes:
  - label: reader
    command: cat data.txt
    cwd: .
  - label: greeter
    command: echo "$GREETING"
    env:
      GREETING: hi
"#,
    )
    .unwrap();

    muxrun()
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("│ reader   │ from the file"))
        .stdout(predicate::str::contains("│ greeter  │ hi"));
}

#[test]
fn test_finds_config_in_current_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("muxrun.yml"),
        "processes:\n  - label: local\n    command: echo found\n",
    )
    .unwrap();

    muxrun()
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("│ local │ found"));
}

#[test]
fn test_failing_process_exits_non_zero() {
    muxrun()
        .args(["-p", "bad=echo nope; exit 4", "-p", "slow=sleep 20"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("│ bad  │ nope"))
        .stderr(predicate::str::contains("bad exited with status 4"));
}

#[test]
fn test_keep_running_stops_on_timeout() {
    muxrun()
        .args(["--keep-running", "--timeout", "1", "-p", "once=echo done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("│ once │ done"));
}

#[test]
fn test_rejects_malformed_process_argument() {
    muxrun()
        .args(["-p", "nonsense"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected LABEL=COMMAND"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_no_process_file() {
    let dir = tempfile::tempdir().unwrap();
    muxrun()
        .current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no process file found"));
}

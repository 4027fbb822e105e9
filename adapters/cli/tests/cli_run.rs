use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run(args: &[&str], script: &str) -> (bool, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_compynation"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn compynation");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(script.as_bytes())
        .expect("failed to write script");
    let output = child.wait_with_output().expect("compynation exits");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn plays_a_whole_run() {
    let config = fixture("untimed.toml");
    let script = "3 8 right\n9 5 right\n4 3 left\n12 7 l\n";
    let config = config.to_str().expect("utf-8 path");
    let (success, stdout, stderr) = run(&["--config", config], script);

    assert!(success, "run failed: {stderr}");
    assert!(stdout.contains("== level 1 == lives: 2"));
    assert!(stdout.contains("next up: level 2, password: BACARDI"));
    assert!(stdout.contains("3 blocks cleared, +40"));
    assert!(stdout.contains("all levels solved!"));
    assert!(stdout.contains("final score: 100"));
}

#[test]
fn password_skips_ahead_and_restarts_cost_lives() {
    let config = fixture("untimed.toml");
    let (success, stdout, stderr) = run(
        &[
            "--config",
            config.to_str().expect("utf-8 path"),
            "--password",
            "bacardi",
        ],
        "restart\nrestart\n",
    );

    assert!(success, "run failed: {stderr}");
    assert!(stdout.contains("== level 2 == lives: 2"));
    assert!(stdout.contains("attempt lost, 1 lives left"));
    assert!(stdout.contains("game over"));
    assert!(stdout.contains("final score: 0"));
}

#[test]
fn missing_configuration_fails() {
    let (success, _, stderr) = run(&["--config", "does/not/exist.toml"], "");
    assert!(!success);
    assert!(stderr.contains("failed to read game configuration"));
}

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn plugpin_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("plugpin"));
    cmd.current_dir(dir).env_remove("GITHUB_AUTH").env_remove("RUST_LOG");
    cmd
}

/// Config pointing at a port nothing listens on, with a single attempt.
fn unreachable_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("plugpin.yaml");
    fs::write(
        &path,
        "api_url: http://127.0.0.1:9\narchive_url: http://127.0.0.1:9\nretry:\n  attempts: 1\n  delay_secs: 0\n",
    )
    .expect("write config");
    path
}

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().expect("tempdir");
    plugpin_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("update"))
        .stdout(contains("diff"))
        .stdout(contains("quota"));
}

#[test]
fn missing_rules_file_fails_and_keeps_artifact() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("data.nix"), "{ kept = 1; }\n").expect("seed artifact");

    plugpin_cmd(dir.path())
        .arg("update")
        .assert()
        .failure()
        .stderr(contains("plugins.txt"));

    assert_eq!(
        fs::read_to_string(dir.path().join("data.nix")).expect("read artifact"),
        "{ kept = 1; }\n"
    );
}

#[test]
fn invalid_rule_reports_line_number() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("plugins.txt"),
        "nix-community/nixops-aws\nnix-community/nixops-gce extra\n",
    )
    .expect("write rules");

    plugpin_cmd(dir.path())
        .arg("update")
        .assert()
        .failure()
        .stderr(contains("line 2"));

    assert!(!dir.path().join("data.nix").exists());
}

#[test]
fn unknown_config_key_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("plugins.txt"), "nix-community/nixops-aws\n").expect("write rules");
    fs::write(dir.path().join("plugpin.yaml"), "retries: 3\n").expect("write config");

    plugpin_cmd(dir.path())
        .args(["update", "--config", "plugpin.yaml"])
        .assert()
        .failure()
        .stderr(contains("plugpin.yaml"));
}

#[test]
fn network_failure_leaves_artifact_byte_identical() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("plugins.txt"), "nix-community/nixops-aws\n").expect("write rules");
    let original = "# pinned\n{\n  aws = { version = \"1.0\"; };\n}\n";
    fs::write(dir.path().join("pins.nix"), original).expect("seed artifact");
    let config = unreachable_config(dir.path());

    plugpin_cmd(dir.path())
        .arg("update")
        .arg("--output")
        .arg("pins.nix")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("left as it was"));

    assert_eq!(
        fs::read_to_string(dir.path().join("pins.nix")).expect("read artifact"),
        original
    );
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(".plugpin-backup-") || n.ends_with(".plugpin.tmp"))
        .collect();
    assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
}

#[test]
fn diff_does_not_create_artifact_on_failure() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("plugins.txt"), "nix-community/nixops-aws\n").expect("write rules");
    let config = unreachable_config(dir.path());

    plugpin_cmd(dir.path())
        .arg("diff")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure();

    assert!(!dir.path().join("data.nix").exists());
}

#[test]
#[cfg(unix)]
fn interrupt_during_retry_wait_leaves_no_scratch_files() {
    use std::process::Stdio;
    use std::thread::sleep;
    use std::time::Duration;

    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("plugins.txt"), "nix-community/nixops-aws\n").expect("write rules");
    fs::write(dir.path().join("data.nix"), "keep\n").expect("seed artifact");
    fs::write(
        dir.path().join("plugpin.yaml"),
        "api_url: http://127.0.0.1:9\nretry:\n  attempts: 30\n  delay_secs: 5\n",
    )
    .expect("write config");

    let mut child = plugpin_cmd(dir.path())
        .args(["update", "--config", "plugpin.yaml"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn plugpin update");

    // The first quota check fails at once; the process is now sleeping
    // before its second attempt.
    sleep(Duration::from_millis(1500));
    let killed = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()
        .expect("run kill");
    assert!(killed.success());
    let status = child.wait().expect("wait for plugpin");
    assert!(!status.success());

    let mut names: Vec<_> = fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["data.nix", "plugins.txt", "plugpin.yaml"]);
    assert_eq!(
        fs::read_to_string(dir.path().join("data.nix")).expect("read artifact"),
        "keep\n"
    );
}

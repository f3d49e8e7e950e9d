#[path = "common/mod.rs"]
mod common;

use std::{env, fs, os::unix::fs::PermissionsExt};

use common::{install_global, npkg, write_package};
use npkg::hash::identity;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn help_lists_the_commands() {
    let home = tempdir().unwrap();
    npkg(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn empty_reference_is_rejected() {
    let home = tempdir().unwrap();
    npkg(home.path())
        .args(["run", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no package given"));
}

#[test]
fn missing_home_is_reported() {
    let home = tempdir().unwrap();
    npkg(home.path())
        .env_remove("HOME")
        .args(["list", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HOME environment variable not set"));
}

#[test]
fn invalid_port_variable_is_reported() {
    let home = tempdir().unwrap();
    npkg(home.path())
        .env("PORT", "eighty")
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid supervisor port 'eighty'"));
}

#[test]
fn missing_start_script_creates_no_directories() {
    let temp = tempdir().unwrap();
    write_package(&temp.path().join("svc"), r#"{"name":"svc"}"#);
    let logs = temp.path().join("logs");

    npkg(temp.path())
        .current_dir(temp.path())
        .env("LOGDIR", &logs)
        .args(["start", "./svc", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no start script"));
    assert!(!logs.exists());
}

#[test]
fn show_lists_installed_packages() {
    let home = tempdir().unwrap();
    install_global(home.path(), "web", r#"{"scripts":{"start":"node .","test":"tap"}}"#);
    install_global(home.path(), "tool", r#"{"bin":{"tool":"bin/tool.js"}}"#);
    install_global(home.path(), "@acme/worker", r#"{"scripts":{"start":"node w.js"}}"#);

    npkg(home.path())
        .args(["show", "--start"])
        .assert()
        .success()
        .stdout("@acme/worker\nweb\n");

    npkg(home.path())
        .args(["show", "--bin"])
        .assert()
        .success()
        .stdout("tool\n");

    npkg(home.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Can start"))
        .stdout(predicate::str::contains("@acme/worker"));
}

#[test]
fn logs_prints_the_tail_of_the_job_log() {
    let temp = tempdir().unwrap();
    write_package(&temp.path().join("svc"), r#"{"scripts":{"start":"node ."}}"#);
    fs::write(
        temp.path().join(format!("{}.log", identity("./svc"))),
        "one\ntwo\nthree\n",
    )
    .unwrap();

    npkg(temp.path())
        .current_dir(temp.path())
        .args(["logs", "./svc", "-n", "2"])
        .assert()
        .success()
        .stdout("two\nthree\n");
}

#[test]
fn logs_without_a_file_warns() {
    let temp = tempdir().unwrap();
    write_package(&temp.path().join("svc"), r#"{"scripts":{"start":"node ."}}"#);

    npkg(temp.path())
        .current_dir(temp.path())
        .args(["logs", "./svc"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("No log file for './svc'"));
}

#[test]
fn install_uses_the_package_manager_on_path() {
    let temp = tempdir().unwrap();
    let home = temp.path().join("home");
    let bin = temp.path().join("bin");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&bin).unwrap();

    let npm = bin.join("npm");
    fs::write(
        &npm,
        r#"#!/bin/sh
pkg="$4/lib/node_modules/worker"
mkdir -p "$pkg"
printf '{"scripts":{"start":"node ."},"environment":{"PORT":"port","LOGDIR":"logs"}}' > "$pkg/package.json"
"#,
    )
    .unwrap();
    fs::set_permissions(&npm, fs::Permissions::from_mode(0o755)).unwrap();

    let path = format!(
        "{}:{}",
        bin.display(),
        env::var("PATH").unwrap_or_default()
    );
    let defaults = home.join("etc/worker/defaults.json");

    npkg(&home)
        .env("PATH", path)
        .args(["install", "worker@1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "config    : {}",
            defaults.display()
        )));

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&defaults).unwrap()).unwrap();
    assert!(stored["PORT"].is_null());
    assert!(stored["LOGDIR"].is_null());
}

#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::{install_global, npkg, write_defaults};
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn set_then_get_system_defaults() {
    let home = tempdir().expect("failed to create tempdir");

    npkg(home.path())
        .args(["config", "set", "LOGDIR=/var/log/npkg"])
        .assert()
        .success();
    npkg(home.path())
        .args(["config", "get", "LOGDIR"])
        .assert()
        .success()
        .stdout("/var/log/npkg\n");

    let stored = fs::read_to_string(home.path().join("etc/defaults.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["LOGDIR"], "/var/log/npkg");
}

#[test]
fn package_defaults_are_separate() {
    let home = tempdir().expect("failed to create tempdir");

    npkg(home.path())
        .args(["config", "-n", "worker", "set", "PORT", "8080"])
        .assert()
        .success();
    npkg(home.path())
        .args(["cfg", "get", "PORT", "--name", "worker"])
        .assert()
        .success()
        .stdout("8080\n");
    npkg(home.path())
        .args(["config", "get", "PORT"])
        .assert()
        .success()
        .stdout("\n");

    assert!(home.path().join("etc/worker/defaults.json").exists());
}

#[test]
fn cat_list_and_rm() {
    let home = tempdir().expect("failed to create tempdir");
    write_defaults(
        home.path(),
        Some("worker"),
        r#"{"PORT":"8080","TOKEN":null,"LOGDIR":"/var/log/worker"}"#,
    );

    npkg(home.path())
        .args(["config", "cat", "-n", "worker"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PORT=8080"))
        .stdout(predicate::str::contains("TOKEN=null"))
        .stdout(predicate::str::contains("LOGDIR=/var/log/worker"));

    npkg(home.path())
        .args(["config", "rm", "TOKEN", "-n", "worker"])
        .assert()
        .success();

    npkg(home.path())
        .args(["config", "ls", "-n", "worker"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PORT"))
        .stdout(predicate::str::contains("LOGDIR"))
        .stdout(predicate::str::contains("TOKEN").not());
}

#[test]
fn set_rejects_an_empty_key() {
    let home = tempdir().expect("failed to create tempdir");

    npkg(home.path())
        .args(["config", "set", "=value"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config key cannot be empty"));
    assert!(!home.path().join("etc/defaults.json").exists());
}

#[test]
fn gen_prints_the_layered_environment() {
    let home = tempdir().expect("failed to create tempdir");
    install_global(home.path(), "worker", r#"{"scripts":{"start":"node ."}}"#);
    write_defaults(
        home.path(),
        None,
        r#"{"LOGDIR":"/var/log/all","REGION":"eu","HOST":"%{hostname}"}"#,
    );
    write_defaults(
        home.path(),
        Some("worker"),
        r#"{"LOGDIR":"/var/log/%{package}","DATA":"%{root}/data","UNSET":null}"#,
    );

    let root = home.path().join("lib/node_modules/worker").canonicalize().unwrap();

    npkg(home.path())
        .args(["config", "gen", "worker"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LOGDIR=/var/log/worker\n"))
        .stdout(predicate::str::contains("REGION=eu\n"))
        .stdout(predicate::str::contains(format!(
            "DATA={}/data\n",
            root.display()
        )))
        .stdout(predicate::str::contains("HOST=%{hostname}").not())
        .stdout(predicate::str::contains("UNSET").not());

    // gen previews without creating runtime directories
    assert!(!root.join("data").exists());
}

#[test]
fn gen_for_unknown_package_fails() {
    let home = tempdir().expect("failed to create tempdir");

    npkg(home.path())
        .args(["config", "gen", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("package 'ghost' not found"));
}

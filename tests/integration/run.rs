#[path = "common/mod.rs"]
mod common;

use common::{npkg, write_package};
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn run_passes_the_exit_code_through() {
    let temp = tempdir().expect("failed to create tempdir");
    write_package(
        &temp.path().join("svc"),
        r#"{"scripts":{"start":"sh -c 'exit 7'"}}"#,
    );

    npkg(temp.path())
        .current_dir(temp.path())
        .args(["run", "./svc"])
        .assert()
        .code(7);
}

#[test]
fn run_maps_signal_deaths_to_51() {
    let temp = tempdir().expect("failed to create tempdir");
    write_package(
        &temp.path().join("svc"),
        r#"{"scripts":{"start":"sh -c 'kill -TERM $$'"}}"#,
    );

    npkg(temp.path())
        .current_dir(temp.path())
        .args(["run", "./svc"])
        .assert()
        .code(51);
}

#[test]
fn run_gives_the_job_its_resolved_environment() {
    let temp = tempdir().expect("failed to create tempdir");
    let svc = write_package(
        &temp.path().join("svc"),
        r#"{"scripts":{"start":"GREETING=hello sh -c 'echo $GREETING from $(pwd -P); echo inherited=$FROM_SHELL'"}}"#,
    );

    npkg(temp.path())
        .current_dir(temp.path())
        .env("FROM_SHELL", "yes")
        .args(["run", "./svc"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "hello from {}",
            svc.canonicalize().unwrap().display()
        )))
        .stdout(predicate::str::contains("inherited=yes"));
}

#[test]
fn global_run_does_not_inherit_the_shell() {
    let temp = tempdir().expect("failed to create tempdir");
    let home = temp.path();
    common::install_global(
        home,
        "worker",
        r#"{"scripts":{"start":"/bin/sh -c 'echo inherited=${FROM_SHELL:-none} region=$REGION'"}}"#,
    );
    common::write_defaults(home, None, r#"{"REGION":"eu"}"#);

    npkg(home)
        .env("FROM_SHELL", "yes")
        .args(["run", "worker"])
        .assert()
        .success()
        .stdout(predicate::str::contains("inherited=none region=eu"));
}

#[test]
fn run_without_a_start_script_fails() {
    let temp = tempdir().expect("failed to create tempdir");
    write_package(&temp.path().join("svc"), r#"{"name":"svc"}"#);

    npkg(temp.path())
        .current_dir(temp.path())
        .args(["run", "./svc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("package './svc' has no start script"));
}

#[test]
fn run_of_a_missing_executable_fails_to_spawn() {
    let temp = tempdir().expect("failed to create tempdir");
    write_package(
        &temp.path().join("svc"),
        r#"{"scripts":{"start":"definitely-not-a-real-binary-npkg"}}"#,
    );

    npkg(temp.path())
        .current_dir(temp.path())
        .args(["run", "./svc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "failed to spawn 'definitely-not-a-real-binary-npkg'",
        ));
}

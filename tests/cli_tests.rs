//! CLI integration tests using the real graphpack binary

mod common;

use common::TestEnv;
use predicates::prelude::*;

const DESCRIPTOR: &str = r#"
id: ex/a
version: 1
description: Example bundle
includes:
  - http://example.org/ctx
files:
  includes: [README.md]
"#;

const STORE: &str = "<http://example.org/s> <http://example.org/p> \"o\" <http://example.org/ctx> .\n\
                     <http://example.org/t> <http://example.org/p> \"x\" <http://example.org/other> .\n";

fn prepare(env: &TestEnv) {
    env.write_file("bundle.yaml", DESCRIPTOR);
    env.write_file("data.nq", STORE);
    env.write_file("README.md", "readme\n");
}

#[test]
fn test_help_output() {
    let env = TestEnv::new();
    env.command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("remote"));
}

#[test]
fn test_install_list_show() {
    let env = TestEnv::new();
    prepare(&env);

    env.command()
        .args(["install", "bundle.yaml", "--store", "data.nq"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ex/a@1"))
        .stdout(predicate::str::contains("1 context, 1 file"));

    env.command()
        .args(["install", "bundle.yaml", "--store", "data.nq"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already installed"));

    env.command()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed bundles (1)"))
        .stdout(predicate::str::contains("ex/a@1"));

    env.command()
        .args(["show", "ex/a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example bundle"))
        .stdout(predicate::str::contains("http://example.org/ctx"))
        .stdout(predicate::str::contains("README.md"))
        .stdout(predicate::str::contains("http://example.org/other").not());
}

#[test]
fn test_list_empty_cache() {
    let env = TestEnv::new();
    env.command()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No bundles installed."));
}

#[test]
fn test_show_missing_bundle_fails() {
    let env = TestEnv::new();
    env.command()
        .args(["show", "ex/none"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("ex/none"));
}

#[test]
fn test_remote_add_list_remove() {
    let env = TestEnv::new();
    let root = env.remote_root.display().to_string();

    env.command()
        .args(["remote", "add", "origin", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));
    env.command()
        .args(["remote", "add", "origin", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("already has"));
    env.command()
        .args(["remote", "add", "origin", "sftp://deploy@example.org/srv/bundles"])
        .assert()
        .success();

    env.command()
        .args(["remote", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("origin"))
        .stdout(predicate::str::contains("sftp://deploy@example.org:22/srv/bundles"));

    env.command()
        .args(["remote", "remove", "origin"])
        .assert()
        .success();
    env.command()
        .args(["remote", "remove", "origin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown remote"));
}

#[test]
fn test_deploy_and_fetch_through_cli() {
    let env = TestEnv::new();
    prepare(&env);
    let root = env.remote_root.display().to_string();

    env.command()
        .args(["install", "bundle.yaml", "--store", "data.nq"])
        .assert()
        .success();
    env.command()
        .args(["remote", "add", "origin", &root])
        .assert()
        .success();
    env.command()
        .args(["deploy", "ex/a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deployed ex/a@1 to origin"));

    let consumer = env.temp.path().join("consumer");
    env.command()
        .args(["fetch", "ex/a", "--cache-dir"])
        .arg(&consumer)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetched ex/a@1"));
    assert!(consumer.join("bundles").is_dir());

    env.command()
        .args(["fetch", "ex/a", "--cache-dir"])
        .arg(&consumer)
        .assert()
        .success()
        .stdout(predicate::str::contains("already in the cache"));
}

#[test]
fn test_deploy_archive_file_through_cli() {
    let env = TestEnv::new();
    prepare(&env);
    let root = env.remote_root.display().to_string();
    let archive = env.temp.path().join("ex-a.tar.gz");

    env.command()
        .args(["install", "bundle.yaml", "--store", "data.nq"])
        .assert()
        .success();
    let cache = env.cache();
    let installed = cache.lookup("ex/a", 1).unwrap().found().unwrap();
    std::fs::write(&archive, graphpack::bundle::pack(&installed.path).unwrap()).unwrap();
    env.command()
        .args(["cache", "evict", "ex/a", "1"])
        .assert()
        .success();

    env.command()
        .args(["remote", "add", "origin", &root])
        .assert()
        .success();
    env.command()
        .args(["deploy", "--archive"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Deployed ex/a@1 to origin"));
    assert!(!env.cache().contains("ex/a", 1));
}

#[test]
fn test_deploy_without_remotes_fails() {
    let env = TestEnv::new();
    prepare(&env);
    env.command()
        .args(["install", "bundle.yaml", "--store", "data.nq"])
        .assert()
        .success();
    env.command()
        .args(["deploy", "ex/a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no remotes configured"));
}

#[test]
fn test_cache_path_and_evict() {
    let env = TestEnv::new();
    prepare(&env);
    env.command()
        .args(["install", "bundle.yaml", "--store", "data.nq"])
        .assert()
        .success();

    env.command()
        .args(["cache", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env.cache_dir.display().to_string()));

    env.command()
        .args(["cache", "evict", "ex/a", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Evicted ex/a@1"));
    env.command()
        .args(["cache", "evict", "ex/a", "1"])
        .assert()
        .failure();
}

#[test]
fn test_install_empty_selection_fails() {
    let env = TestEnv::new();
    env.write_file("bundle.yaml", "id: ex/a\nincludes: ['urn:missing']\n");
    env.write_file("data.nq", STORE);
    env.command()
        .args(["install", "bundle.yaml", "--store", "data.nq"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("selects no contexts"));
}

#[test]
fn test_completions() {
    let env = TestEnv::new();
    env.command()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graphpack"));
    env.command()
        .args(["completions", "tcsh"])
        .assert()
        .failure();
}

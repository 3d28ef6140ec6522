// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

#[cfg(test)]
extern crate assert_cmd;

use assert_cmd::prelude::*;
use httpmock::{
    Method::{GET, POST, PUT},
    MockServer,
};
use predicates::prelude::*;
use serde_json::json;
use uuid::Uuid;

use std::process::Command;

fn config_path() -> String {
    format!("{}/tests/resources/settee.toml", env!("CARGO_MANIFEST_DIR"))
}

/// The binary, configured from the test config file but pointed at `server`.
fn settee(server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("settee").expect("Calling binary failed");
    cmd.arg("--config")
        .arg(config_path())
        .env("SETTEE__CLOUDANT__URL", server.base_url());
    cmd
}

#[test]
fn test_cli() {
    let mut cmd = Command::cargo_bin("settee").expect("Calling binary failed");
    cmd.assert().failure();
}

#[test]
fn test_config_redacts_password() {
    let mut cmd = Command::cargo_bin("settee").expect("Calling binary failed");
    cmd.arg("--config").arg(config_path()).arg("config");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("[cloudant]"))
        .stdout(predicate::str::contains("username = \"user\""))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_missing_config_file() {
    let mut cmd = Command::cargo_bin("settee").expect("Calling binary failed");
    cmd.arg("--config")
        .arg("tests/resources/does-not-exist.toml")
        .arg("ls-dbs");
    cmd.assert().failure();
}

#[test]
fn test_ls_dbs_with_env_override() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .header("Authorization", "Basic dXNlcjpodW50ZXIy")
            .path("/_all_dbs");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!(["animals", "plants"]));
    });

    settee(&server)
        .args(&["--format", "json", "ls-dbs"])
        .assert()
        .success()
        .stdout("[\"animals\",\"plants\"]\n");
    mock.assert();
}

#[test]
fn test_create_db_existing() {
    let database = format!("settee-{}", Uuid::new_v4());
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT).path(format!("/{}", database));
        then.status(412)
            .header("Content-Type", "application/json")
            .json_body(json!({"error": "file_exists"}));
    });

    settee(&server)
        .args(&["--format", "json", "create-db", database.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\":false"));
    mock.assert();
}

#[test]
fn test_create_db_unauthorized() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT).path("/animals");
        then.status(401)
            .header("Content-Type", "application/json")
            .json_body(json!({"error": "unauthorized"}));
    });

    settee(&server)
        .args(&["create-db", "animals"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("401 Unauthorized"));
    mock.assert();
}

#[test]
fn test_delete_goes_through_bulk_docs() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/animals/_bulk_docs").json_body(json!({
            "docs": [{"_id": "aardvark", "_rev": "1-abc", "_deleted": true}]
        }));
        then.status(201)
            .header("Content-Type", "application/json")
            .json_body(json!([{"ok": true, "id": "aardvark", "rev": "2-def"}]));
    });

    settee(&server)
        .args(&["delete", "animals", "aardvark", "1-abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2-def"));
    mock.assert();
}

#[test]
fn test_insert_rejects_bad_json() {
    let server = MockServer::start();

    settee(&server)
        .args(&["insert", "animals", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("isn't valid JSON"));
}

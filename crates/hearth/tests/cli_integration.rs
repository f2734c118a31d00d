//! CLI integration tests for the hearth command-line interface.
//!
//! Every test points the binary at its own temporary config directory and
//! store file. Tests that need an identity server run one with wiremock.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command for the hearth binary, isolated in `dir`.
fn hearth(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hearth").unwrap();
    cmd.current_dir(dir)
        .env("HEARTH_CONFIG_DIR", dir.join("config"))
        .env_remove("HEARTH_SERVER_URL")
        .arg("--store")
        .arg(store_path(dir));
    cmd
}

fn store_path(dir: &Path) -> PathBuf {
    dir.join("store.json")
}

/// Run a prepared command off the async runtime and return its stdout.
async fn run(mut cmd: Command) -> String {
    tokio::task::spawn_blocking(move || {
        let output = cmd.assert().success().get_output().stdout.clone();
        String::from_utf8(output).unwrap()
    })
    .await
    .unwrap()
}

async fn identity_server(username: Option<&str>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .and(query_param("action", "ident"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": username })))
        .mount(&server)
        .await;
    server
}

fn endpoint(server: &MockServer) -> String {
    format!("{}/session", server.uri())
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    hearth(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    hearth(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hearth"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    hearth(dir.path())
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_status_without_endpoint_is_config_error() {
    let dir = TempDir::new().unwrap();
    hearth(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Wrong session config"));
}

#[test]
fn test_inspect_empty_store() {
    let dir = TempDir::new().unwrap();
    let output = hearth(dir.path())
        .args(["--json", "inspect"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["state"], "unestablished");
    assert_eq!(value["record"]["established"], false);
    assert!(!store_path(dir.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_project_config_supplies_endpoint() {
    let dir = TempDir::new().unwrap();
    let server = identity_server(Some("pat")).await;
    std::fs::write(
        dir.path().join("hearth.toml"),
        format!("[session]\nurl = \"{}\"\n", endpoint(&server)),
    )
    .unwrap();

    let stdout = run({
        let mut cmd = hearth(dir.path());
        cmd.arg("status");
        cmd
    })
    .await;

    assert!(stdout.contains("Logged in as pat."));
    assert!(stdout.contains("Log out: hearth logout"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_remember_saves_endpoint() {
    let dir = TempDir::new().unwrap();
    let server = identity_server(Some("uma")).await;

    let mut login = hearth(dir.path());
    login.args(["--server", &endpoint(&server), "login", "--remember"]);
    let stdout = run(login).await;
    assert!(stdout.contains("Saved to:"));

    let saved = std::fs::read_to_string(dir.path().join("config").join("config.toml")).unwrap();
    assert!(saved.contains(&endpoint(&server)));

    // Later invocations find the endpoint without --server.
    let mut status = hearth(dir.path());
    status.arg("status");
    assert!(run(status).await.contains("Logged in as uma."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_verbose_status_shows_endpoint_and_store() {
    let dir = TempDir::new().unwrap();
    let server = identity_server(Some("val")).await;

    let mut status = hearth(dir.path());
    status.args(["--verbose", "--server", &endpoint(&server), "status"]);
    let stdout = run(status).await;

    assert!(stdout.contains(&format!("Endpoint: {}", endpoint(&server))));
    assert!(stdout.contains(&format!("Store: {}", store_path(dir.path()).display())));
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_then_cache_hit() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .and(query_param("action", "ident"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "alice" })))
        .expect(1)
        .mount(&server)
        .await;

    let status = |dir: &Path| {
        let mut cmd = hearth(dir);
        cmd.args(["--json", "--server", &endpoint(&server), "status"]);
        cmd
    };

    let first: Value = serde_json::from_str(&run(status(dir.path())).await).unwrap();
    assert_eq!(first["username"], "alice");
    assert_eq!(first["source"], "server");

    // A second process trusts the stored answer.
    let second: Value = serde_json::from_str(&run(status(dir.path())).await).unwrap();
    assert_eq!(second["username"], "alice");
    assert_eq!(second["source"], "cache");

    let mut inspect = hearth(dir.path());
    inspect.args(["--json", "inspect"]);
    let record: Value = serde_json::from_str(&run(inspect).await).unwrap();
    assert_eq!(record["state"], "valid");
    assert_eq!(record["record"]["username"], "alice");
    assert_eq!(record["record"]["locked"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthenticated_status_offers_sign_in() {
    let dir = TempDir::new().unwrap();
    let server = identity_server(None).await;

    let mut cmd = hearth(dir.path());
    cmd.args(["--server", &endpoint(&server), "status"]);
    let stdout = run(cmd).await;

    assert!(stdout.contains("Not signed in."));
    assert!(stdout.contains("Sign in:"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sign_in_resumes_saved_location() {
    let dir = TempDir::new().unwrap();
    let server = identity_server(Some("quinn")).await;
    let url = endpoint(&server);

    let mut login = hearth(dir.path());
    login.args(["--server", &url, "--location", "https://app.example.org/docs", "login"]);
    let stdout = run(login).await;
    assert!(stdout.contains("Sign in"));

    let mut landing = hearth(dir.path());
    landing.args([
        "--json",
        "--server",
        &url,
        "--location",
        "https://app.example.org/#auth",
        "status",
    ]);
    let event: Value = serde_json::from_str(&run(landing).await).unwrap();

    assert_eq!(event["username"], "quinn");
    assert_eq!(event["resume_to"], "https://app.example.org/docs");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_logout_leaves_session() {
    let dir = TempDir::new().unwrap();
    let server = identity_server(Some("rae")).await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .and(query_param("action", "logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let url = endpoint(&server);

    let mut status = hearth(dir.path());
    status.args(["--server", &url, "status"]);
    run(status).await;

    let dir_path = dir.path().to_path_buf();
    let logout_url = url.clone();
    tokio::task::spawn_blocking(move || {
        hearth(&dir_path)
            .args(["--server", &logout_url, "logout"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Logout failed"));
    })
    .await
    .unwrap();

    let mut inspect = hearth(dir.path());
    inspect.args(["--json", "inspect"]);
    let record: Value = serde_json::from_str(&run(inspect).await).unwrap();
    assert_eq!(record["record"]["username"], "rae");
    assert_eq!(record["record"]["established"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_asks_server_again() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .and(query_param("action", "ident"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "sol" })))
        .expect(2)
        .mount(&server)
        .await;
    let url = endpoint(&server);

    let mut status = hearth(dir.path());
    status.args(["--server", &url, "status"]);
    run(status).await;

    let mut refresh = hearth(dir.path());
    refresh.args(["--json", "--server", &url, "refresh"]);
    let event: Value = serde_json::from_str(&run(refresh).await).unwrap();
    assert_eq!(event["source"], "server");
}

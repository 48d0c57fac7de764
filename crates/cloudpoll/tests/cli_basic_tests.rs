use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command isolated from the user's config file and token
fn cloudpoll(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cloudpoll").unwrap();
    cmd.env("CLOUDPOLL_CONFIG_FILE", config_dir.path().join("config.toml"))
        .env_remove("CLOUDPOLL_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    cloudpoll(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("terminal state"))
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    cloudpoll(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cloudpoll"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    cloudpoll(&dir)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_kinds_lists_catalogue() {
    let dir = TempDir::new().unwrap();
    cloudpoll(&dir)
        .arg("kinds")
        .assert()
        .success()
        .stdout(predicate::str::contains("volume_detach"))
        .stdout(predicate::str::contains("RUNNING, TERMINATED, ERROR"))
        .stdout(predicate::str::contains("instance_create"))
        .stdout(predicate::str::contains("attached, detached"))
        .stdout(predicate::str::contains("3600s"));
}

#[test]
fn test_kinds_json_uses_config_overrides() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[polling.instance_stop]\ntimeout_secs = 7200\ninterval_secs = 120\n",
    )
    .unwrap();

    let output = cloudpoll(&dir)
        .args(["kinds", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let stop = rows
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["kind"] == "instance_stop")
        .unwrap();
    assert_eq!(stop["timeout_secs"], 7200);
    assert_eq!(stop["interval_secs"], 120);
}

#[test]
fn test_config_path_honours_override() {
    let dir = TempDir::new().unwrap();
    let expected = dir.path().join("config.toml");
    cloudpoll(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn test_config_show_defaults() {
    let dir = TempDir::new().unwrap();
    cloudpoll(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[polling.cluster_create]"))
        .stdout(predicate::str::contains("delay_secs = 600"));
}

#[test]
fn test_corrupt_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[polling\n").unwrap();
    cloudpoll(&dir)
        .arg("kinds")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("cloudpoll config path"));
}

#[test]
fn test_wait_requires_terminal_states() {
    let dir = TempDir::new().unwrap();
    cloudpoll(&dir)
        .args(["wait", "http://127.0.0.1:9/state"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no terminal states"));
}

#[test]
fn test_wait_rejects_zero_interval() {
    let dir = TempDir::new().unwrap();
    cloudpoll(&dir)
        .args(["wait", "http://127.0.0.1:9/state", "-t", "done", "--interval", "0"])
        .assert()
        .failure()
        .code(2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wait_until_terminal_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snapshots/snap-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "pending"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/snapshots/snap-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "completed"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let log = dir.path().join("progress.jsonl");
    let url = format!("{}/snapshots/snap-1", server.uri());

    cloudpoll(&dir)
        .args(["wait", &url, "--kind", "snapshot-create", "--interval", "1", "-o", "json"])
        .arg("--progress-log")
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"completed\""))
        .stdout(predicate::str::contains("\"kind\": \"snapshot_create\""));

    let events: Vec<serde_json::Value> = std::fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "polling");
    assert_eq!(events[1]["event"], "completed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wait_timeout_exits_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "detaching"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/volumes/vol-1", server.uri());

    cloudpoll(&dir)
        .args(["wait", &url, "--kind", "volume-detach", "--timeout", "0", "--interval", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Timed out waiting"))
        .stderr(predicate::str::contains("detaching"))
        .stderr(predicate::str::contains("--timeout"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wait_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DBInstances": [{"DBInstanceStatus": "stopped"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/db/pg-prod", server.uri());

    cloudpoll(&dir)
        .args(["wait", &url, "--kind", "instance-stop"])
        .args(["--state-pointer", "/DBInstances/0/DBInstanceStatus"])
        .env("CLOUDPOLL_TOKEN", "tok-123")
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped"));

    cloudpoll(&dir)
        .args(["wait", &url, "--kind", "instance-stop"])
        .args(["--state-pointer", "/DBInstances/0/DBInstanceStatus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("401"))
        .stderr(predicate::str::contains("--token"));
}

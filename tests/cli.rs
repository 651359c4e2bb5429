// End-to-end tests for the elastic-health binary

use assert_cmd::cargo::cargo_bin_cmd;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::net::TcpListener;
use tempfile::TempDir;

const FIXTURE: &str = include_str!("fixtures/nodes.json");

/// Runs the binary with config lookups pointed at an empty temp dir.
fn elastic_health(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("elastic-health");
    cmd.current_dir(home.path())
        .env("ELASTIC_HEALTH_CONFIG_DIR", home.path().join("config"))
        .env_remove("ELASTIC_HEALTH_LOG");
    cmd
}

fn nodes_server() -> MockServer {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/_nodes");
        then.status(200)
            .header("content-type", "application/json")
            .body(FIXTURE);
    });
    server
}

#[test]
fn help_lists_flags_and_exits_zero() {
    let home = TempDir::new().unwrap();
    elastic_health(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--insecure"))
        .stdout(predicate::str::contains("--node"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn missing_server_exits_two() {
    let home = TempDir::new().unwrap();
    elastic_health(&home).assert().code(2);
}

#[test]
fn bad_flag_or_pattern_exits_two() {
    let home = TempDir::new().unwrap();
    elastic_health(&home)
        .args(["--bogus", "localhost"])
        .assert()
        .code(2);
    elastic_health(&home)
        .args(["-n", "es-(", "localhost"])
        .assert()
        .code(2);
    elastic_health(&home)
        .args(["-p", "not-a-port", "localhost"])
        .assert()
        .code(2);
}

#[test]
fn prints_reduced_table_sorted_by_name() {
    let server = nodes_server();
    let home = TempDir::new().unwrap();

    let output = elastic_health(&home)
        .args(["-k", "-p", &server.port().to_string(), "127.0.0.1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert!(lines[0].starts_with("Name"));
    assert!(!lines[0].contains("Cluster"));
    assert!(lines[2].starts_with("db-node3.example.com"));
    assert!(lines[3].starts_with("es-node1.example.com"));
    assert!(lines[4].starts_with("es-node2.example.com"));
}

#[test]
fn node_filter_and_verbose_columns() {
    let server = nodes_server();
    let home = TempDir::new().unwrap();

    elastic_health(&home)
        .args(["-k", "-v", "-n", "es-node"])
        .args(["-s", "127.0.0.1", "-p", &server.port().to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cluster"))
        .stdout(predicate::str::contains("JVM Name"))
        .stdout(predicate::str::contains("prod-logs"))
        .stdout(predicate::str::contains("es-node2.example.com"))
        .stdout(predicate::str::contains("db-node3").not());
}

#[test]
fn server_and_port_can_come_from_config() {
    let server = nodes_server();
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join(".elastic-health.yaml"),
        format!("server: 127.0.0.1\nport: {}\ninsecure: true\n", server.port()),
    )
    .unwrap();

    elastic_health(&home)
        .args(["--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Name\": \"db-node3.example.com\""));
}

#[test]
fn unreachable_server_prints_no_data() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let home = TempDir::new().unwrap();

    elastic_health(&home)
        .args(["-k", "-p", &port.to_string(), "127.0.0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Connection Error"))
        .stdout(predicate::str::ends_with("No Data\n"));
}

#[test]
fn tls_failure_points_at_insecure_flag() {
    let server = nodes_server();
    let home = TempDir::new().unwrap();

    elastic_health(&home)
        .args(["-p", &server.port().to_string(), "127.0.0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SSL Error"))
        .stdout(predicate::str::contains("--insecure"))
        .stdout(predicate::str::ends_with("No Data\n"));
}

#[test]
fn malformed_response_fails_the_run() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/_nodes");
        then.status(200).body(r#"{"nodes": {"abc": {"name": "es-node1"}}}"#);
    });
    let home = TempDir::new().unwrap();

    elastic_health(&home)
        .args(["-k", "-p", &server.port().to_string(), "127.0.0.1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Name").not())
        .stderr(predicate::str::contains("missing key"));
}

#[test]
fn fetch_failure_is_logged_under_debug_without_colour() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let home = TempDir::new().unwrap();

    let quiet = elastic_health(&home)
        .args(["-k", "-p", &port.to_string(), "127.0.0.1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let quiet = String::from_utf8(quiet).unwrap();
    assert_eq!(quiet.lines().count(), 2, "{quiet}");

    elastic_health(&home)
        .args(["-d", "-k", "-p", &port.to_string(), "127.0.0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WARN"))
        .stdout(predicate::str::contains("nodes query failed"))
        .stdout(predicate::str::contains("\u{1b}[").not());
}

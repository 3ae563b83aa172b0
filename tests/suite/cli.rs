//! End-to-end runs of the `pacer` binary.

use std::path::Path;
use std::process::{Command, Output};

use wiremock::MockServer;

use crate::common::{Arrivals, mount_recording, mount_text};

async fn run_pacer(args: Vec<String>, home: &Path) -> Output {
    let home = home.to_path_buf();
    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_pacer"))
            .args(&args)
            .env("HOME", &home)
            .env("PACER_CONFIG", home.join("missing.toml"))
            .env_remove("PACER_DELAY_MS")
            .env_remove("PACER_POLICY")
            .env("RUST_LOG", "warn")
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn prints_one_line_per_url_in_order() {
    let server = MockServer::start().await;
    let arrivals = Arrivals::default();
    mount_recording(&server, "/one", 200, "1", &arrivals).await;
    mount_recording(&server, "/two", 404, "nope", &arrivals).await;
    mount_recording(&server, "/three", 200, "3", &arrivals).await;
    let home = tempfile::tempdir().unwrap();

    let urls: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|p| format!("{}/{p}", server.uri()))
        .collect();
    let mut args = vec!["--delay-ms".to_string(), "30".to_string()];
    args.extend(urls.iter().cloned());

    let output = run_pacer(args, home.path()).await;
    assert!(!output.status.success(), "a 404 should fail the run");

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 3, "stdout: {lines:?}");
    let expected_status = ["200", "404", "200"];
    let mut last_offset = 0u128;
    for ((line, url), status) in lines.iter().zip(&urls).zip(expected_status) {
        let fields: Vec<&str> = line.split(' ').collect();
        let offset: u128 = fields[0].parse().unwrap();
        assert!(offset >= last_offset);
        last_offset = offset;
        assert_eq!(fields[1], status);
        assert_eq!(fields[2], url);
    }
    assert!(last_offset >= 55, "three requests 30ms apart, got {last_offset}");
    assert_eq!(arrivals.paths(), vec!["/one", "/two", "/three"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn all_success_exits_zero() {
    let server = MockServer::start().await;
    mount_text(&server, "/ok", 200, "fine").await;
    let home = tempfile::tempdir().unwrap();

    let output = run_pacer(
        vec![
            "--delay-ms=0".to_string(),
            "--policy".to_string(),
            "finish-to-start".to_string(),
            format!("{}/ok", server.uri()),
        ],
        home.path(),
    )
    .await;

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(&format!(" 200 {}/ok", server.uri())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relative_url_without_base_reports_error_line() {
    let home = tempfile::tempdir().unwrap();
    let output = run_pacer(
        vec!["--delay-ms".to_string(), "0".to_string(), "items".to_string()],
        home.path(),
    )
    .await;

    assert!(!output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(" error items: "), "got {lines:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn usage_errors_fail_without_output() {
    let home = tempfile::tempdir().unwrap();
    let output = run_pacer(vec!["--bogus".to_string()], home.path()).await;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected argument"));
}

//! Config file -> resolved settings -> working client.

use std::fs;
use std::time::Duration;

use pacer_client::RateLimitedClient;
use pacer_config::{ConfigError, PacerConfig};
use pacer_types::DelayPolicy;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn config_file_drives_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .and(header("authorization", "Token from-file"))
        .and(header("user-agent", "pacer-it"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[executor]
delay_ms = 20
policy = "finish_to_start"

[http]
base_url = "{}/v1"
auth_scheme = "Token"
auth_token = "from-file"
user_agent = "pacer-it"
timeout_seconds = 5
"#,
            server.uri()
        ),
    )
    .unwrap();

    let config = PacerConfig::load_from(&config_path).unwrap().unwrap();
    let resolved = config.resolve().unwrap();
    assert_eq!(resolved.executor.delay(), Duration::from_millis(20));
    assert_eq!(resolved.executor.policy(), DelayPolicy::FinishToStart);
    assert_eq!(resolved.http.timeout(), Some(Duration::from_secs(5)));

    let client = RateLimitedClient::new(resolved.executor, resolved.http).unwrap();
    assert_eq!(client.get("items").await.unwrap(), "[1,2,3]");
}

#[test]
fn token_comes_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        "[http]\nauth_scheme = \"Bearer\"\nauth_token = \"${PACER_IT_TOKEN_VAR}\"\n",
    )
    .unwrap();

    unsafe {
        std::env::set_var("PACER_IT_TOKEN_VAR", "expanded");
    }
    let config = PacerConfig::load_from(&config_path).unwrap().unwrap();
    let http = config.http_settings().unwrap();
    unsafe {
        std::env::remove_var("PACER_IT_TOKEN_VAR");
    }

    let auth = http.auth().unwrap();
    assert_eq!(auth.header_value(), "Bearer expanded");
    assert!(!format!("{config:?}").contains("PACER_IT_TOKEN_VAR"));
    assert!(!format!("{auth:?}").contains("expanded"));
}

#[test]
fn broken_file_is_a_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[executor]\ndelay_ms = \"soon\"\n").unwrap();

    let err = PacerConfig::load_from(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.toml"));
}

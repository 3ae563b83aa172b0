//! Rate-limited client driven through the executor against a mock server.

use std::time::Duration;

use pacer_client::{ClientError, Method, RateLimitedClient, Reply};
use pacer_executor::{DelayPolicy, DelayedExecutor, ExecutorSettings};
use pacer_types::{AuthHeader, HttpSettings};
use reqwest::StatusCode;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{Arrivals, assert_at_least, mount_recording};

fn base(server: &MockServer) -> HttpSettings {
    HttpSettings::new().with_base_url(&server.uri()).unwrap()
}

#[tokio::test]
async fn start_to_start_spacing_survives_a_failed_request() {
    let server = MockServer::start().await;
    let arrivals = Arrivals::default();
    mount_recording(&server, "/a", 200, "alpha", &arrivals).await;
    mount_recording(&server, "/b", 503, "unavailable", &arrivals).await;
    mount_recording(&server, "/c", 200, "gamma", &arrivals).await;

    let delay = Duration::from_millis(80);
    let client = RateLimitedClient::new(
        ExecutorSettings::new(delay, DelayPolicy::StartToStart),
        base(&server),
    )
    .unwrap();

    let a = client.submit(Method::GET, "a", None).unwrap();
    let b = client.submit(Method::GET, "b", None).unwrap();
    let c = client.submit(Method::GET, "c", None).unwrap();

    assert_eq!(a.await.unwrap().body, "alpha");
    assert_eq!(
        b.await.unwrap_err().status(),
        Some(StatusCode::SERVICE_UNAVAILABLE)
    );
    assert_eq!(c.await.unwrap().body, "gamma");

    assert_eq!(arrivals.paths(), vec!["/a", "/b", "/c"]);
    for gap in arrivals.gaps() {
        assert_at_least(gap, delay);
    }
}

#[tokio::test]
async fn finish_to_start_waits_for_slow_responses() {
    let server = MockServer::start().await;
    let arrivals = Arrivals::default();
    let recorder = arrivals.clone();
    Mock::given(method("GET"))
        .respond_with(move |req: &wiremock::Request| {
            recorder.record(req.url.path());
            ResponseTemplate::new(200)
                .set_body_string("slow")
                .set_delay(Duration::from_millis(40))
        })
        .mount(&server)
        .await;

    let client = RateLimitedClient::new(
        ExecutorSettings::from_millis(60, DelayPolicy::FinishToStart),
        base(&server),
    )
    .unwrap();

    let pending: Vec<_> = (0..3)
        .map(|i| client.submit(Method::GET, &format!("slow/{i}"), None).unwrap())
        .collect();
    for reply in pending {
        reply.await.unwrap();
    }

    assert_eq!(arrivals.paths(), vec!["/slow/0", "/slow/1", "/slow/2"]);
    for gap in arrivals.gaps() {
        assert_at_least(gap, Duration::from_millis(100));
    }
}

#[tokio::test]
async fn clients_sharing_an_executor_share_the_pace() {
    let server = MockServer::start().await;
    let arrivals = Arrivals::default();
    mount_recording(&server, "/shared", 200, "ok", &arrivals).await;

    let delay = Duration::from_millis(50);
    let executor: DelayedExecutor<Reply, ClientError> =
        DelayedExecutor::new(ExecutorSettings::new(delay, DelayPolicy::StartToStart));
    let first = RateLimitedClient::with_executor(executor.clone(), base(&server)).unwrap();
    let second = RateLimitedClient::with_executor(
        executor.clone(),
        base(&server).with_auth(AuthHeader::new("Bearer", "other").unwrap()),
    )
    .unwrap();

    let pending = vec![
        first.submit(Method::GET, "shared", None).unwrap(),
        second.submit(Method::GET, "shared", None).unwrap(),
        first.submit(Method::GET, "shared", None).unwrap(),
    ];
    assert_eq!(executor.next_seq().value(), 3);
    for reply in pending {
        assert_eq!(reply.await.unwrap().status, StatusCode::OK);
    }

    assert_eq!(arrivals.paths().len(), 3);
    for gap in arrivals.gaps() {
        assert_at_least(gap, delay);
    }
}

#[tokio::test]
async fn auth_header_only_on_configured_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("authorized"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("who are you"))
        .mount(&server)
        .await;

    let zero = ExecutorSettings::from_millis(0, DelayPolicy::StartToStart);
    let anonymous = RateLimitedClient::new(zero, base(&server)).unwrap();
    let authed = RateLimitedClient::new(
        zero,
        base(&server).with_auth(AuthHeader::new("Bearer", "t0ken").unwrap()),
    )
    .unwrap();

    assert_eq!(authed.get("me").await.unwrap(), "authorized");
    let err = anonymous.get("me").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_lose_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(|req: &wiremock::Request| {
            ResponseTemplate::new(200).set_body_string(req.url.path().to_string())
        })
        .expect(20)
        .mount(&server)
        .await;

    let client = RateLimitedClient::new(
        ExecutorSettings::from_millis(0, DelayPolicy::StartToStart),
        base(&server),
    )
    .unwrap();

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let client = client.clone();
            tokio::spawn(async move {
                let mut bodies = Vec::new();
                for i in 0..5 {
                    let target = format!("p{producer}/{i}");
                    bodies.push(client.get(&target).await.unwrap());
                }
                bodies
            })
        })
        .collect();

    let mut bodies = Vec::new();
    for producer in producers {
        bodies.extend(producer.await.unwrap());
    }
    bodies.sort();
    bodies.dedup();
    assert_eq!(bodies.len(), 20);
    assert_eq!(client.executor().queue_len(), 0);
}

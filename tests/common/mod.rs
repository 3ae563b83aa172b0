//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Arrival times of requests at a mock endpoint, in arrival order.
#[derive(Clone, Default)]
pub struct Arrivals(Arc<Mutex<Vec<(String, Instant)>>>);

impl Arrivals {
    pub fn record(&self, path: &str) {
        self.0.lock().unwrap().push((path.to_string(), Instant::now()));
    }

    pub fn paths(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Gaps between consecutive arrivals.
    pub fn gaps(&self) -> Vec<Duration> {
        let times: Vec<Instant> = self.0.lock().unwrap().iter().map(|(_, t)| *t).collect();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// Mount a GET responder on `route` that records every arrival.
pub async fn mount_recording(
    server: &MockServer,
    route: &str,
    status: u16,
    body: &str,
    arrivals: &Arrivals,
) {
    let arrivals = arrivals.clone();
    let body = body.to_string();
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(move |req: &wiremock::Request| {
            arrivals.record(req.url.path());
            ResponseTemplate::new(status).set_body_string(body.clone())
        })
        .mount(server)
        .await;
}

/// Mount a plain GET responder with a fixed status and body.
pub async fn mount_text(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Allow a little scheduler slack under real time.
pub fn assert_at_least(actual: Duration, expected: Duration) {
    let slack = Duration::from_millis(5);
    assert!(
        actual + slack >= expected,
        "expected at least {expected:?}, got {actual:?}"
    );
}

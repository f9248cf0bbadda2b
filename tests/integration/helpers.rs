//! Helper functions for integration tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dogan::config::ResolvedActionConfig;
use dogan::{Direction, ExecutionError, ExecutionReport, FetchError, MetricSource, RawResponse, Trigger};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn create_test_action(
    name: &str,
    metric: &str,
    threshold: f64,
    direction: Direction,
    command: &str,
) -> ResolvedActionConfig {
    ResolvedActionConfig {
        name: name.to_string(),
        metric: metric.to_string(),
        threshold,
        direction,
        command: command.to_string(),
        interval: 3600,
    }
}

/// Graphite stand-in answering every render request with `body`
pub async fn mock_graphite(body: &str) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    mock_server
}

pub fn render_base(server: &MockServer) -> String {
    format!("{}/render", server.uri())
}

/// Source that fails every request and counts how often it was asked
#[derive(Default)]
pub struct FailingSource {
    pub calls: AtomicUsize,
}

impl FailingSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricSource for FailingSource {
    async fn get(&self, _url: &str) -> Result<RawResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Network("connection refused".to_string()))
    }
}

/// Trigger that only records what it was asked to run
#[derive(Default)]
pub struct RecordingTrigger {
    commands: Mutex<Vec<String>>,
    delay: Option<Duration>,
    finished: AtomicUsize,
}

impl RecordingTrigger {
    /// A trigger whose every execution takes `delay`
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Trigger for RecordingTrigger {
    async fn execute(&self, command: &str) -> Result<ExecutionReport, ExecutionError> {
        self.commands.lock().unwrap().push(command.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);

        Ok(ExecutionReport {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            truncated: false,
            duration: self.delay.unwrap_or_default(),
        })
    }
}

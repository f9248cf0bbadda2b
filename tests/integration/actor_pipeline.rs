//! End-to-end tests: graphite mock → action actor → real command

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use dogan::actors::action::ActionHandle;
use dogan::actors::messages::CheckOutcome;
use dogan::actors::supervisor::Supervisor;
use dogan::config::parse_config;
use dogan::{CommandTrigger, Direction, ExecutionError, HttpSource};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn http_source() -> Arc<HttpSource> {
    Arc::new(HttpSource::new(Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn test_threshold_crossing_runs_command() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/render"))
        .and(query_param("target", "keepLastValue(servers.db1.disk.free)"))
        .respond_with(ResponseTemplate::new(200).set_body_string("12.0,8.0,3.5\n"))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("fired");
    let action = create_test_action(
        "disk",
        "servers.db1.disk.free",
        5.0,
        Direction::Below,
        &format!("echo fired > {}", marker.display()),
    );

    let (handle, task) = ActionHandle::spawn(
        action,
        &render_base(&mock_server),
        http_source(),
        Arc::new(CommandTrigger::default()),
    );

    let report = handle.check_now().await.unwrap();
    assert_matches!(report.outcome, CheckOutcome::Triggered { value, execution: Ok(_) } if value == 3.5);
    assert_eq!(std::fs::read_to_string(&marker).unwrap().trim(), "fired");

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_failing_command_is_reported_not_fatal() {
    let mock_server = mock_graphite("99").await;

    let action = create_test_action("hot", "temp", 50.0, Direction::Above, "exit 3");
    let (handle, task) = ActionHandle::spawn(
        action,
        &render_base(&mock_server),
        http_source(),
        Arc::new(CommandTrigger::default()),
    );

    let report = handle.check_now().await.unwrap();
    assert_matches!(
        report.outcome,
        CheckOutcome::Triggered {
            execution: Err(ExecutionError::NonZero { code: 3, .. }),
            ..
        }
    );

    // The actor keeps serving checks
    let report = handle.check_now().await.unwrap();
    assert!(report.outcome.is_triggered());

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_non_200_does_not_trigger() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("1000"))
        .mount(&mock_server)
        .await;

    let trigger = Arc::new(RecordingTrigger::default());
    let action = create_test_action("a", "m", 0.0, Direction::Above, "page");
    let (handle, task) =
        ActionHandle::spawn(action, &render_base(&mock_server), http_source(), trigger.clone());

    let report = handle.check_now().await.unwrap();
    assert_matches!(
        report.outcome,
        CheckOutcome::FetchFailed(dogan::FetchError::Status { got: 503 })
    );
    assert!(trigger.commands().is_empty());

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

fn marker_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_supervisor_from_config() {
    let mock_server = mock_graphite("1,2,3\n").await;
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("alerts.log");

    let config = parse_config(
        &format!(
            r#"
GraphiteBase = "{base}"
CheckInterval = 3600
FetchTimeout = 5

[Command]
Timeout = 5

[Actions.high]
Metric = "servers.app.errors"
Threshold = 3
Direction = "above"
Command = "echo high >> {log}"

[Actions.low]
Metric = "servers.app.errors"
Threshold = 2
Direction = "below"
Command = "echo low >> {log}"
"#,
            base = render_base(&mock_server),
            log = log.display(),
        ),
        Path::new("dogan.toml"),
    )
    .unwrap();

    let supervisor = Supervisor::start(&config).unwrap();
    assert_eq!(supervisor.len(), 2);

    let high = supervisor.handle("high").unwrap().check_now().await.unwrap();
    assert!(high.outcome.is_triggered());

    let low = supervisor.handle("low").unwrap().check_now().await.unwrap();
    assert_matches!(low.outcome, CheckOutcome::Idle { value } if value == 3.0);

    supervisor.shutdown().await;

    let lines = marker_lines(&log);
    assert!(lines.iter().any(|line| line == "high"));
    assert!(!lines.iter().any(|line| line == "low"));
}

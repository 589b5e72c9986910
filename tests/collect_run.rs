//! End-to-end runs of the collector against a wiremock GitHub.

use std::cell::RefCell;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use repo_pulse::clock::Clock;
use repo_pulse::collector::Collector;
use repo_pulse::config::{Config, PauseRange};
use repo_pulse::store::Store;
use repo_pulse::transport::HttpTransport;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fixed wall clock that records sleeps instead of blocking.
struct FrozenClock {
    now: DateTime<Utc>,
    sleeps: RefCell<Vec<Duration>>,
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

fn frozen() -> FrozenClock {
    FrozenClock {
        now: Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        sleeps: RefCell::new(Vec::new()),
    }
}

fn config(server: &MockServer, output: std::path::PathBuf) -> Config {
    Config {
        api_base_url: server.uri(),
        output_file: output,
        repo_pause: PauseRange::NONE,
        page_pause: PauseRange::NONE,
        ..Config::default()
    }
}

async fn mount_github(server: &MockServer) {
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "items": [
                {"full_name": "acme/huge", "language": "Python", "stargazers_count": 12000, "forks_count": 900},
                {"full_name": "acme/tool", "language": "Python", "stargazers_count": 180, "forks_count": 11}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/tool/pulls"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"created_at": "2024-05-09T08:00:00Z", "updated_at": "2024-05-09T20:00:00Z",
             "user": {"id": 10}, "comments_url": format!("{base}/repos/acme/tool/issues/12/comments")},
            {"created_at": "2024-04-01T08:00:00Z", "updated_at": "2024-04-02T08:00:00Z",
             "user": {"id": 11}, "comments_url": format!("{base}/repos/acme/tool/issues/3/comments")}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/tool/issues"))
        .and(query_param("since", "2024-05-03T12:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"created_at": "2024-05-08T00:00:00Z", "user": {"id": 20},
             "comments_url": format!("{base}/repos/acme/tool/issues/13/comments")},
            {"created_at": "2024-05-09T08:00:00Z", "user": {"id": 10},
             "comments_url": format!("{base}/repos/acme/tool/issues/12/comments"),
             "pull_request": {"url": format!("{base}/repos/acme/tool/pulls/12")}}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/tool/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"sha": "1"}, {"sha": "2"}])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/tool/issues/12/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"user": {"id": 30}, "created_at": "2024-05-09T12:30:00Z"}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/tool/issues/13/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"user": {"id": 20}, "created_at": "2024-05-08T01:00:00Z"},
            {"user": {"id": 31}, "created_at": "2024-05-08T06:00:00Z"}
        ])))
        .mount(server)
        .await;
}

#[test]
fn collects_matching_repository_over_http() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(mount_github(&server));

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("github_metrics.json");
    let transport = HttpTransport::new(Some("test-token"), "GitHub-Metrics-Collector", None).unwrap();
    let clock = frozen();
    let config = config(&server, output.clone());
    let queries = config.queries.clone();

    let mut collector = Collector::new(config, &transport, &clock, Store::load(&output).unwrap());
    let summary = collector.run(1, &queries).unwrap();
    assert_eq!(summary.recorded, 1);
    assert_eq!(summary.filtered_out, 1);

    let store = Store::load(&output).unwrap();
    assert_eq!(store.len(), 1);
    let record = store.get("acme/tool").unwrap();
    assert_eq!(record.stars, 180);
    assert_eq!(record.forks, 11);
    assert_eq!(record.pull_requests_last_7d, 1);
    assert_eq!(record.issues_last_7d, 1);
    assert_eq!(record.commits_last_7d, 2);
    assert_eq!(record.avg_pr_response_time_hours, Some(4.5));
    assert_eq!(record.avg_issue_response_time_hours, Some(6.0));
    assert_eq!(record.collected_at, clock.now);

    let received = rt.block_on(server.received_requests()).unwrap();
    assert!(received.iter().all(|r| !r.url.path().contains("acme/huge")));
    assert!(
        received
            .iter()
            .all(|r| r.headers.get("authorization").map(|v| v.as_bytes()) == Some(b"token test-token".as_slice()))
    );
}

#[test]
fn resumed_run_only_searches() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(mount_github(&server));

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("github_metrics.json");
    let transport = HttpTransport::new(Some("test-token"), "GitHub-Metrics-Collector", None).unwrap();
    let clock = frozen();
    let queries = Config::default().queries;

    Collector::new(config(&server, output.clone()), &transport, &clock, Store::load(&output).unwrap())
        .run(1, &queries)
        .unwrap();
    let before = rt.block_on(server.received_requests()).unwrap().len();
    let stored = std::fs::read_to_string(&output).unwrap();

    Collector::new(config(&server, output.clone()), &transport, &clock, Store::load(&output).unwrap())
        .run(1, &queries)
        .unwrap();
    let after = rt.block_on(server.received_requests()).unwrap();

    assert_eq!(after.len(), before + 1);
    assert!(after[before..].iter().all(|r| r.url.path() == "/search/repositories"));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), stored);
}

#[test]
fn corrupt_store_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("github_metrics.json");
    std::fs::write(&output, "{\"acme/tool\": {\"repo_name\": ").unwrap();
    let store = Store::load(&output).unwrap();
    assert!(store.is_empty());
}

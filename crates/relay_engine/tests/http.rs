use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_core::{JobId, JobResult, RemoteStatus};
use relay_engine::{
    Artifact, HttpSettings, HttpStatusChannel, HttpTransferChannel, PollErrorKind, ProgressSink,
    StatusChannel, SubmitOptions, TransferChannel, TransferFailureKind,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    reported: Arc<Mutex<Vec<u32>>>,
}

impl TestSink {
    fn take(&self) -> Vec<u32> {
        self.reported.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn report(&self, percent: u32) {
        self.reported.lock().unwrap().push(percent);
    }
}

fn settings(server: &MockServer) -> HttpSettings {
    HttpSettings {
        base_url: server.uri(),
        ..HttpSettings::default()
    }
}

fn write_artifact(dir: &TempDir, name: &str, len: usize) -> Artifact {
    let file = dir.path().join(name);
    std::fs::write(&file, vec![7u8; len]).unwrap();
    Artifact::from_path(file)
}

#[tokio::test]
async fn upload_streams_file_and_returns_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"job_id": "abc", "status": "queued"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let artifact = write_artifact(&dir, "talk.mp4", 64 * 1024);
    let channel = HttpTransferChannel::new(settings(&server));
    let sink = TestSink::default();

    let job_id = channel
        .send(&artifact, &SubmitOptions::new("french"), &sink)
        .await
        .expect("upload ok");
    assert_eq!(job_id, JobId::new("abc"));

    let reported = sink.take();
    assert_eq!(reported.first(), Some(&0));
    assert_eq!(reported.last(), Some(&100));
    assert!(reported.windows(2).all(|pair| pair[0] <= pair[1]));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"target_language\""));
    assert!(body.contains("french"));
    assert!(body.contains("name=\"video\"; filename=\"talk.mp4\""));
}

#[tokio::test]
async fn upload_rejected_by_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let artifact = write_artifact(&dir, "talk.mp4", 128);
    let channel = HttpTransferChannel::new(settings(&server));

    let err = channel
        .send(&artifact, &SubmitOptions::default(), &TestSink::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransferFailureKind::Rejected { status: 413 });
}

#[tokio::test]
async fn oversized_artifact_is_refused_before_sending() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let artifact = write_artifact(&dir, "talk.mp4", 11);
    let channel = HttpTransferChannel::new(HttpSettings {
        max_upload_bytes: 10,
        ..settings(&server)
    });

    let err = channel
        .send(&artifact, &SubmitOptions::default(), &TestSink::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        TransferFailureKind::TooLarge {
            max_bytes: 10,
            actual: 11
        }
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_and_empty_artifacts_fail_locally() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let channel = HttpTransferChannel::new(settings(&server));

    let missing = Artifact::from_path(dir.path().join("nope.mp4"));
    let err = channel
        .send(&missing, &SubmitOptions::default(), &TestSink::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransferFailureKind::Io);

    let empty = write_artifact(&dir, "empty.mp4", 0);
    let err = channel
        .send(&empty, &SubmitOptions::default(), &TestSink::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransferFailureKind::Empty);
}

#[tokio::test]
async fn upload_with_unreadable_reply_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(202).set_body_string("not json"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let artifact = write_artifact(&dir, "talk.mp4", 16);
    let channel = HttpTransferChannel::new(settings(&server));

    let err = channel
        .send(&artifact, &SubmitOptions::default(), &TestSink::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransferFailureKind::MalformedResponse);
}

async fn status_server(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn queued_and_processing_are_not_terminal() {
    for status in ["queued", "processing"] {
        let server = status_server(json!({"job_id": "abc", "status": status})).await;
        let channel = HttpStatusChannel::new(settings(&server));

        let reply = channel.poll(&JobId::new("abc")).await.unwrap();
        assert_eq!(reply, RemoteStatus::Processing);
    }
}

#[tokio::test]
async fn complete_carries_output_urls() {
    let server = status_server(json!({
        "job_id": "abc",
        "status": "complete",
        "final_video_url": "http://cdn/videos/abc",
        "subtitle_url": "http://cdn/subtitles/abc"
    }))
    .await;
    let channel = HttpStatusChannel::new(settings(&server));

    let reply = channel.poll(&JobId::new("abc")).await.unwrap();
    assert_eq!(
        reply,
        RemoteStatus::Complete(
            JobResult::new("http://cdn/videos/abc").with_auxiliary("http://cdn/subtitles/abc")
        )
    );
}

#[tokio::test]
async fn complete_without_video_is_malformed() {
    let server = status_server(json!({"job_id": "abc", "status": "complete"})).await;
    let channel = HttpStatusChannel::new(settings(&server));

    let err = channel.poll(&JobId::new("abc")).await.unwrap_err();
    assert_eq!(err.kind, PollErrorKind::Malformed);
}

#[tokio::test]
async fn failed_status_is_a_remote_failure() {
    let server = status_server(json!({"job_id": "abc", "status": "failed"})).await;
    let channel = HttpStatusChannel::new(settings(&server));

    assert_eq!(
        channel.poll(&JobId::new("abc")).await.unwrap(),
        RemoteStatus::Failed
    );
}

#[tokio::test]
async fn unknown_status_is_malformed() {
    let server = status_server(json!({"job_id": "abc", "status": "exploded"})).await;
    let channel = HttpStatusChannel::new(settings(&server));

    let err = channel.poll(&JobId::new("abc")).await.unwrap_err();
    assert_eq!(err.kind, PollErrorKind::Malformed);
}

#[tokio::test]
async fn server_errors_and_timeouts_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"job_id": "slow", "status": "processing"})),
        )
        .mount(&server)
        .await;

    let channel = HttpStatusChannel::new(HttpSettings {
        request_timeout: Duration::from_millis(50),
        ..settings(&server)
    });

    let err = channel.poll(&JobId::new("missing")).await.unwrap_err();
    assert_eq!(err.kind, PollErrorKind::HttpStatus(404));

    let err = channel.poll(&JobId::new("slow")).await.unwrap_err();
    assert_eq!(err.kind, PollErrorKind::Timeout);
}

#[tokio::test]
async fn invalid_base_url_is_reported() {
    let channel = HttpStatusChannel::new(HttpSettings {
        base_url: "not a url".to_string(),
        ..HttpSettings::default()
    });

    let err = channel.poll(&JobId::new("abc")).await.unwrap_err();
    assert_eq!(err.kind, PollErrorKind::InvalidUrl);
}

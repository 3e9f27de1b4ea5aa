//! HTTPクライアントの統合テスト
//!
//! tiny_httpのモックサーバーに対してreqwestクライアントを動かす

use kaong_common::dashboard::DashboardState;
use kaong_common::protocol::SaveAssessmentForm;
use kaong_inspect::client::{ApiClient, ImageUpload};
use kaong_inspect::error::InspectError;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tempfile::tempdir;
use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    url: String,
    body: String,
}

struct MockServer {
    url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    /// 決められた応答を順に返すサーバーを起動する
    fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let server = Server::http("127.0.0.1:0").expect("モックサーバー起動失敗");
        let addr = server.server_addr().to_ip().expect("IPアドレスがない");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let handle = std::thread::spawn(move || {
            for (status, body) in responses {
                let Ok(mut request) = server.recv() else { return };
                let mut raw = Vec::new();
                let _ = request.as_reader().read_to_end(&mut raw);
                recorded.lock().expect("lock").push(Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    body: String::from_utf8_lossy(&raw).to_string(),
                });

                let header = Header::from_bytes("Content-Type", "application/json").expect("header");
                let response = Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            url: format!("http://{}", addr),
            requests,
            handle: Some(handle),
        }
    }

    fn client(&self) -> ApiClient {
        ApiClient::new(self.url.clone(), Duration::from_secs(5)).expect("クライアント作成失敗")
    }

    fn finish(mut self) -> Vec<Recorded> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("モックサーバー異常終了");
        }
        let requests = self.requests.lock().expect("lock").clone();
        requests
    }
}

const RECORDS: &str = r#"[
    {"id": 1, "timestamp": "2025-03-01T10:00:00", "assessment": "12 Ripe, 3 Rotten", "confidence": 0.9,
     "source": "camera_ws", "image_url": "/static/uploads/1.jpg", "ripe_image_url": "/static/uploads/1_ripe.jpg"},
    {"id": 2, "timestamp": "2025-03-02T08:00:00", "assessment": "4 Unripe", "confidence": 0.55,
     "source": "upload", "image_url": "/static/uploads/2.jpg"}
]"#;

fn write_image(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).expect("書き込み失敗");
    path
}

#[tokio::test]
async fn test_fetch_assessments() {
    let server = MockServer::start(vec![(200, RECORDS)]);
    let records = server.client().fetch_assessments().await.expect("取得失敗");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ripe_image_url.as_deref(), Some("/static/uploads/1_ripe.jpg"));
    assert_eq!(records[1].source, "upload");

    let requests = server.finish();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/get_assessment_data");
}

#[tokio::test]
async fn test_fetch_server_error() {
    let server = MockServer::start(vec![(500, r#"{"error": "db down"}"#)]);
    let result = server.client().fetch_assessments().await;
    assert!(matches!(result, Err(InspectError::ServerStatus { status: 500, .. })));
    server.finish();
}

#[tokio::test]
async fn test_delete_then_reload() {
    let server = MockServer::start(vec![
        (200, RECORDS),
        (200, r#"{"success": true}"#),
        (200, r#"[{"id": 1, "assessment": "12 Ripe", "confidence": 0.9}]"#),
    ]);
    let client = server.client();

    let mut state = DashboardState::default();
    let token = state.begin_reload();
    let records = client.fetch_assessments().await.map_err(|e| e.to_string());
    state.finish_reload(token, records);

    let outcome = client.delete_and_reload(&mut state, 2).await.expect("削除失敗");
    assert!(outcome.needs_reload());
    assert_eq!(state.records().len(), 1, "再読み込み後のレコード数");

    let requests = server.finish();
    assert_eq!(requests[1].method, "DELETE");
    assert_eq!(requests[1].url, "/api/delete-assessment/2");
    assert_eq!(requests[2].url, "/get_assessment_data");
}

#[tokio::test]
async fn test_delete_failure_is_an_error() {
    let server = MockServer::start(vec![(200, RECORDS), (500, r#"{"error": "db locked"}"#)]);
    let client = server.client();

    let mut state = DashboardState::default();
    let token = state.begin_reload();
    state.finish_reload(token, client.fetch_assessments().await.map_err(|e| e.to_string()));

    let result = client.delete_and_reload(&mut state, 2).await;
    assert!(
        matches!(result, Err(InspectError::DeleteFailed { id: 2, .. })),
        "サーバーエラーはコマンドの失敗として返ること: {:?}",
        result.map(|o| o.needs_reload())
    );
    assert_eq!(state.records().len(), 2, "失敗時は状態を変えない");

    let requests = server.finish();
    assert_eq!(requests.len(), 2, "失敗後に再読み込みしない");
}

#[tokio::test]
async fn test_delete_failure_keeps_records() {
    let server = MockServer::start(vec![(200, RECORDS), (404, "{}")]);
    let client = server.client();

    let mut state = DashboardState::default();
    let token = state.begin_reload();
    state.finish_reload(token, client.fetch_assessments().await.map_err(|e| e.to_string()));

    let response = client.delete_assessment(99).await.map_err(|e| e.to_string());
    let outcome = state.finish_delete(99, response);
    assert!(!outcome.needs_reload());
    assert_eq!(state.records().len(), 2);
    server.finish();
}

#[tokio::test]
async fn test_detect_image_multipart() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_image(dir.path(), "kaong.jpg");

    let server = MockServer::start(vec![(
        200,
        r#"{"detections": [{"label": "Ripe", "box_relative": [0.1, 0.1, 0.5, 0.5], "score": 0.93}], "warning": null}"#,
    )]);
    let upload = ImageUpload::from_path(&path).expect("読み込み失敗");
    assert_eq!(upload.media_type, "image/jpeg");

    let response = server.client().detect_image(&upload).await.expect("検出失敗");
    assert_eq!(response.detections.len(), 1);
    assert_eq!(response.detections[0].label, "Ripe");

    let requests = server.finish();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, "/detect_frame");
    assert!(requests[0].body.contains(r#"name="image""#));
    assert!(requests[0].body.contains(r#"filename="kaong.jpg""#));
}

#[tokio::test]
async fn test_detect_error_body_is_returned() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_image(dir.path(), "kaong.png");

    let server = MockServer::start(vec![(400, r#"{"error": "Invalid image"}"#)]);
    let upload = ImageUpload::from_path(&path).expect("読み込み失敗");
    let response = server.client().detect_image(&upload).await.expect("応答がない");
    assert_eq!(response.error.as_deref(), Some("Invalid image"));
    server.finish();
}

#[tokio::test]
async fn test_save_assessment_fields() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_image(dir.path(), "kaong.jpg");

    let server = MockServer::start(vec![(200, r#"{"success": true}"#)]);
    let upload = ImageUpload::from_path(&path).expect("読み込み失敗");
    let form = SaveAssessmentForm {
        assessment: "2 Ripe, 1 Rotten".into(),
        confidence: 0.8,
        source: "upload".into(),
    };
    server.client().save_assessment(&upload, &form).await.expect("保存失敗");

    let requests = server.finish();
    assert_eq!(requests[0].url, "/save_assessment");
    let body = &requests[0].body;
    assert!(body.contains(r#"name="assessment""#));
    assert!(body.contains("2 Ripe, 1 Rotten"));
    assert!(body.contains(r#"name="confidence""#));
    assert!(body.contains(r#"name="source""#));
}

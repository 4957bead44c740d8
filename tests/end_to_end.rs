use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use tempfile::TempDir;
use tower::ServiceExt;

use trails::{
    config::ServerConfig,
    core::session::{FixOutcome, RecordingSession},
    engine::geodesy::distance_between,
    persist::sqlite::SqliteQueue,
    runtime::{
        handle::spawn_uploader,
        pump::{RetryPolicy, Transport, UploadAck, UploadError, UploadPump},
    },
    server::{AppState, auth::StaticCredentials, router},
    trail::Trail,
    types::{ActivityType, DeviceInfo},
};

/// Delivers uploads straight into the router, the way the HTTP transport would over the network.
struct InProcessTransport {
    app: Router,
    uri: String,
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn upload(&self, payload: &str) -> Result<UploadAck, UploadError> {
        let req = Request::post(self.uri.as_str())
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let resp = self
            .app
            .clone()
            .oneshot(req)
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        if status.is_success() {
            Ok(serde_json::from_slice(&body).unwrap_or_default())
        } else if status.is_client_error() {
            Err(UploadError::Rejected(status.as_u16()))
        } else {
            Err(UploadError::Status(status.as_u16()))
        }
    }
}

#[tokio::test]
async fn recorded_trail_reaches_the_plot() {
    let tmp = TempDir::new().expect("tmp");
    let config = ServerConfig {
        data_dir: tmp.path().join("server"),
        ..ServerConfig::default()
    };
    let creds = StaticCredentials::new().with_user("alice", "pw");
    let app = router(AppState::new(config, Arc::new(creds)));

    // record
    let mut session = RecordingSession::new();
    session.start(1_000).expect("start");
    assert!(matches!(
        session.record_fix(60.0, 10.0, 1_000).expect("fix"),
        FixOutcome::Appended { .. }
    ));
    assert_eq!(session.record_fix(60.0, 10.0, 1_500).expect("fix"), FixOutcome::Duplicate);
    session.record_fix(60.001, 10.001, 2_000).expect("fix");
    let device = DeviceInfo {
        name: "pocket".into(),
        hardware: "phone".into(),
        os: "linux".into(),
        ua: "trails-test".into(),
    };
    let recorded = session.stop(3_000, &device, ActivityType::Bike).expect("stop");
    assert!(!session.is_recording());
    assert_eq!(recorded.readings.len(), 2);
    let expected = distance_between(60.0, 10.0, 60.001, 10.001);
    assert!((recorded.distance - expected).abs() < 1e-9);
    let trail = Trail::from(recorded);

    // queue and upload
    let queue = SqliteQueue::open(tmp.path().join("client.db")).expect("open sqlite");
    let transport = Arc::new(InProcessTransport {
        app: app.clone(),
        uri: "/trail/alice/pw".to_string(),
    });
    let pump = UploadPump::new(Box::new(queue), transport, RetryPolicy::default());
    let uploader = spawn_uploader(pump);
    uploader.enqueue_trail(&trail).await.expect("enqueue");
    let report = uploader.drain().await.expect("drain");
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.remaining, 0);
    uploader.shutdown().await.expect("shutdown");

    // persisted under the user's directory
    let user_dir = tmp.path().join("server").join("alice");
    let stored: Vec<_> = std::fs::read_dir(&user_dir)
        .expect("user dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(stored, vec![format!(
        "{}-{}.json",
        &stored[0][..14],
        trail.storage_id()
    )]);

    // plot
    let req = Request::get("/plot/alice/pw/all").body(Body::empty()).expect("request");
    let resp = app.clone().oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    let html = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let html = String::from_utf8_lossy(&html);

    assert_eq!(html.matches("<polyline").count(), 1);
    assert!(html.contains("points=\"0 1000, 500 0\""), "got {html}");
    assert!(!html.contains("<circle"));
}

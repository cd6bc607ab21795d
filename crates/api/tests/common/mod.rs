//! In-process app with fake collaborators, plus request helpers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use printloop_api::config::ServerConfig;
use printloop_api::router::build_app_router;
use printloop_api::state::AppState;
use printloop_core::job::{Job, JobStatus};
use printloop_core::types::JobId;
use printloop_events::EventBus;
use printloop_geometry::{ExportFormat, GeometryEngine, Mesh, TriMeshEngine};
use printloop_meshy::task::ModelUrls;
use printloop_meshy::{GenerationService, GenerationTask, MeshyError, TaskRequest, TaskStatus};
use printloop_pipeline::{
    AssetFetcher, ConversionPipeline, FetchError, GenerationConfig, GenerationCoordinator,
    JobService, PrintDispatcher,
};
use printloop_printer::{PrinterCommand, PrinterStateSync, PrinterTransport, TransportError, UploadAck};
use printloop_store::JobStore;
use tempfile::{NamedTempFile, TempDir};
use tower::ServiceExt;

/// Every task succeeds on its first poll.
struct InstantGenerator;

#[async_trait]
impl GenerationService for InstantGenerator {
    async fn create(&self, request: &TaskRequest) -> Result<String, MeshyError> {
        Ok(format!("{}-1", request.mode()))
    }

    async fn get(&self, task_id: &str) -> Result<GenerationTask, MeshyError> {
        Ok(GenerationTask {
            id: task_id.to_string(),
            status: TaskStatus::Succeeded,
            progress: 100,
            model_urls: Some(ModelUrls {
                glb: Some("https://assets.test/model.glb".into()),
                ..Default::default()
            }),
            thumbnail_url: None,
            task_error: None,
        })
    }
}

struct CubeFetcher;

#[async_trait]
impl AssetFetcher for CubeFetcher {
    async fn fetch(&self, _url: &str) -> Result<NamedTempFile, FetchError> {
        let bytes = TriMeshEngine
            .export(&Mesh::cuboid(10.0, 10.0, 10.0), ExportFormat::Stl)
            .unwrap();
        let file = NamedTempFile::new()?;
        std::fs::write(file.path(), bytes)?;
        Ok(file)
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    pub published: Mutex<Vec<PrinterCommand>>,
}

#[async_trait]
impl PrinterTransport for RecordingTransport {
    async fn publish(&self, command: &PrinterCommand) -> Result<(), TransportError> {
        self.published.lock().unwrap().push(command.clone());
        Ok(())
    }

    async fn upload(&self, _bytes: Vec<u8>, name: &str) -> Result<UploadAck, TransportError> {
        Ok(UploadAck {
            remote_name: name.to_string(),
        })
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
    }
}

/// Handles kept by a test alongside the router.
pub struct TestContext {
    pub store: Arc<JobStore>,
    pub printer: Arc<PrinterStateSync>,
    pub transport: Arc<RecordingTransport>,
    pub artifacts: TempDir,
}

impl TestContext {
    /// Connect the printer and report `gcode_state`.
    pub async fn printer_reports(&self, gcode_state: &str) {
        if !self.printer.snapshot().connected {
            self.printer.on_connect().await;
        }
        let report = serde_json::json!({ "print": { "gcode_state": gcode_state } });
        self.printer.on_telemetry(report.to_string().as_bytes());
    }

    pub async fn wait_for(&self, id: JobId, status: JobStatus) -> Job {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let job = self.store.get(id).await.unwrap();
            if job.status == status {
                return job;
            }
            assert!(
                !job.status.is_terminal() && tokio::time::Instant::now() < deadline,
                "job is {} ({:?}), expected {status}",
                job.status,
                job.error
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Build the full application router over fake collaborators.
pub fn build_test_app() -> (Router, TestContext) {
    let events = Arc::new(EventBus::default());
    let store = Arc::new(JobStore::new(Arc::clone(&events)));
    let artifacts = tempfile::tempdir().unwrap();

    let conversion = Arc::new(ConversionPipeline::new(
        Arc::new(TriMeshEngine),
        Arc::new(CubeFetcher),
        artifacts.path(),
    ));
    let coordinator = Arc::new(GenerationCoordinator::new(
        Arc::clone(&store),
        Arc::new(InstantGenerator),
        conversion,
        GenerationConfig {
            poll_interval: Duration::from_millis(10),
            ..GenerationConfig::default()
        },
    ));

    let transport = Arc::new(RecordingTransport::default());
    let printer = Arc::new(PrinterStateSync::new(
        Arc::clone(&transport) as Arc<dyn PrinterTransport>,
        Duration::from_secs(1),
    ));
    let dispatcher = Arc::new(PrintDispatcher::new(Arc::clone(&store), Arc::clone(&printer)));
    let jobs = Arc::new(JobService::new(Arc::clone(&store), coordinator, dispatcher));

    let state = AppState {
        config: Arc::new(test_config()),
        jobs,
        printer: Arc::clone(&printer),
        events,
    };

    let ctx = TestContext {
        store,
        printer,
        transport,
        artifacts,
    };
    (build_app_router(state), ctx)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

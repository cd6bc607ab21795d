//! Fakes for the pipeline's collaborator seams and a wired-up harness.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use printloop_core::job::{Job, JobStatus};
use printloop_core::types::JobId;
use printloop_events::EventBus;
use printloop_geometry::{ExportFormat, GeometryEngine, Mesh, TriMeshEngine};
use printloop_meshy::task::{ModelUrls, TaskError};
use printloop_meshy::{GenerationService, GenerationTask, MeshyError, TaskRequest, TaskStatus};
use printloop_pipeline::{
    AssetFetcher, ConversionPipeline, FetchError, GenerationConfig, GenerationCoordinator,
    JobService, PrintDispatcher,
};
use printloop_printer::{PrinterCommand, PrinterStateSync, PrinterTransport, TransportError, UploadAck};
use printloop_store::JobStore;
use tempfile::{NamedTempFile, TempDir};

pub const MODEL_URL: &str = "https://assets.test/refined.glb";
pub const THUMBNAIL_URL: &str = "https://assets.test/refined.png";

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// One scripted answer to a status poll.
#[derive(Debug, Clone)]
pub enum Poll {
    Task(TaskStatus, u32),
    Failed(&'static str),
    Error,
}

/// Answers polls from per-stage scripts. The last entry of a script
/// repeats forever.
#[derive(Default)]
pub struct ScriptedGenerator {
    preview: Mutex<VecDeque<Poll>>,
    refine: Mutex<VecDeque<Poll>>,
    pub created: Mutex<Vec<TaskRequest>>,
    pub polls: AtomicUsize,
    pub panic_on_create: bool,
    /// Delay before answering a create call.
    pub stall_create: Option<Duration>,
    /// Delay before answering each poll.
    pub stall_poll: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(preview: Vec<Poll>, refine: Vec<Poll>) -> Self {
        Self {
            preview: Mutex::new(preview.into()),
            refine: Mutex::new(refine.into()),
            ..Default::default()
        }
    }

    /// Both stages succeed on the first poll.
    pub fn instant() -> Self {
        Self::new(
            vec![Poll::Task(TaskStatus::Succeeded, 100)],
            vec![Poll::Task(TaskStatus::Succeeded, 100)],
        )
    }

    /// Panics inside the job task on the first create call.
    pub fn panicking() -> Self {
        Self {
            panic_on_create: true,
            ..Default::default()
        }
    }

    /// Every poll hangs for `stall` before reporting progress.
    pub fn stalling_polls(stall: Duration) -> Self {
        Self {
            stall_poll: Some(stall),
            ..Self::new(vec![Poll::Task(TaskStatus::InProgress, 10)], vec![])
        }
    }

    /// Task creation hangs for `stall`.
    pub fn stalling_create(stall: Duration) -> Self {
        Self {
            stall_create: Some(stall),
            ..Self::instant()
        }
    }

    pub fn modes_created(&self) -> Vec<&'static str> {
        self.created.lock().unwrap().iter().map(|r| r.mode()).collect()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn create(&self, request: &TaskRequest) -> Result<String, MeshyError> {
        if self.panic_on_create {
            panic!("generator exploded");
        }
        if let Some(stall) = self.stall_create {
            tokio::time::sleep(stall).await;
        }
        self.created.lock().unwrap().push(request.clone());
        Ok(format!("{}-task", request.mode()))
    }

    async fn get(&self, task_id: &str) -> Result<GenerationTask, MeshyError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(stall) = self.stall_poll {
            tokio::time::sleep(stall).await;
        }
        let script = if task_id.starts_with("preview") {
            &self.preview
        } else {
            &self.refine
        };
        let poll = {
            let mut script = script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        let mut task = GenerationTask {
            id: task_id.to_string(),
            status: TaskStatus::Pending,
            progress: 0,
            model_urls: None,
            thumbnail_url: None,
            task_error: None,
        };
        match poll {
            Some(Poll::Task(status, progress)) => {
                task.status = status;
                task.progress = progress;
            }
            Some(Poll::Failed(message)) => {
                task.status = TaskStatus::Failed;
                task.task_error = Some(TaskError {
                    message: message.to_string(),
                });
            }
            Some(Poll::Error) | None => {
                return Err(MeshyError::Api {
                    status: 503,
                    body: "try again".into(),
                });
            }
        }
        if task.status == TaskStatus::Succeeded && task_id.starts_with("refine") {
            task.model_urls = Some(ModelUrls {
                glb: Some(MODEL_URL.into()),
                ..Default::default()
            });
            task.thumbnail_url = Some(THUMBNAIL_URL.into());
        }
        Ok(task)
    }
}

// ---------------------------------------------------------------------------
// Asset download
// ---------------------------------------------------------------------------

/// Serves fixed model bytes for every URL.
pub struct StaticFetcher {
    bytes: Vec<u8>,
    pub urls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            urls: Mutex::new(Vec::new()),
        }
    }

    /// A closed box exported as binary STL.
    pub fn cuboid(width: f64, depth: f64, height: f64) -> Self {
        let bytes = TriMeshEngine
            .export(&Mesh::cuboid(width, depth, height), ExportFormat::Stl)
            .unwrap();
        Self::new(bytes)
    }
}

#[async_trait]
impl AssetFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<NamedTempFile, FetchError> {
        self.urls.lock().unwrap().push(url.to_string());
        let file = NamedTempFile::new()?;
        std::fs::write(file.path(), &self.bytes)?;
        Ok(file)
    }
}

// ---------------------------------------------------------------------------
// Printer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeTransport {
    pub published: Mutex<Vec<PrinterCommand>>,
    pub uploads: Mutex<Vec<(String, usize)>>,
    pub fail_publish: AtomicBool,
    pub fail_upload: AtomicBool,
}

impl FakeTransport {
    /// Published commands other than status requests.
    pub fn commands(&self) -> Vec<PrinterCommand> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !matches!(c, PrinterCommand::PushAll))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PrinterTransport for FakeTransport {
    async fn publish(&self, command: &PrinterCommand) -> Result<(), TransportError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Mqtt("broker unreachable".into()));
        }
        self.published.lock().unwrap().push(command.clone());
        Ok(())
    }

    async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<UploadAck, TransportError> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(TransportError::UploadRejected {
                status: 500,
                body: "disk full".into(),
            });
        }
        self.uploads.lock().unwrap().push((name.to_string(), bytes.len()));
        Ok(UploadAck {
            remote_name: name.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub fn fast_config() -> GenerationConfig {
    GenerationConfig {
        poll_interval: Duration::from_millis(10),
        stage_timeout: Duration::from_secs(5),
        auto_repair: true,
    }
}

pub struct Harness {
    pub events: Arc<EventBus>,
    pub store: Arc<JobStore>,
    pub generator: Arc<ScriptedGenerator>,
    pub fetcher: Arc<StaticFetcher>,
    pub transport: Arc<FakeTransport>,
    pub printer: Arc<PrinterStateSync>,
    pub coordinator: Arc<GenerationCoordinator>,
    pub dispatcher: Arc<PrintDispatcher>,
    pub service: JobService,
    pub artifacts: TempDir,
}

impl Harness {
    pub fn new(generator: ScriptedGenerator) -> Self {
        Self::build(generator, StaticFetcher::cuboid(4.0, 2.0, 1.0), fast_config())
    }

    pub fn build(generator: ScriptedGenerator, fetcher: StaticFetcher, config: GenerationConfig) -> Self {
        let events = Arc::new(EventBus::default());
        let store = Arc::new(JobStore::new(Arc::clone(&events)));
        let generator = Arc::new(generator);
        let fetcher = Arc::new(fetcher);
        let artifacts = tempfile::tempdir().unwrap();

        let conversion = Arc::new(ConversionPipeline::new(
            Arc::new(TriMeshEngine),
            Arc::clone(&fetcher) as Arc<dyn AssetFetcher>,
            artifacts.path(),
        ));
        let coordinator = Arc::new(GenerationCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&generator) as Arc<dyn GenerationService>,
            conversion,
            config,
        ));

        let transport = Arc::new(FakeTransport::default());
        let printer = Arc::new(PrinterStateSync::new(
            Arc::clone(&transport) as Arc<dyn PrinterTransport>,
            Duration::from_secs(1),
        ));
        let dispatcher = Arc::new(PrintDispatcher::new(Arc::clone(&store), Arc::clone(&printer)));
        let service = JobService::new(
            Arc::clone(&store),
            Arc::clone(&coordinator),
            Arc::clone(&dispatcher),
        );

        Self {
            events,
            store,
            generator,
            fetcher,
            transport,
            printer,
            coordinator,
            dispatcher,
            service,
            artifacts,
        }
    }

    /// Connect the printer and report the given `gcode_state`.
    pub async fn printer_reports(&self, gcode_state: &str) {
        if !self.printer.snapshot().connected {
            self.printer.on_connect().await;
        }
        let report = serde_json::json!({ "print": { "gcode_state": gcode_state } });
        self.printer.on_telemetry(report.to_string().as_bytes());
    }

    pub async fn wait_for(&self, id: JobId, status: JobStatus) -> Job {
        wait_for_status(&self.store, id, status).await
    }
}

/// Poll the store until the job reaches `status`.
///
/// Panics if the job settles in a different terminal status or the wait
/// takes longer than five seconds.
pub async fn wait_for_status(store: &JobStore, id: JobId, status: JobStatus) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job = store.get(id).await.unwrap();
        if job.status == status {
            return job;
        }
        if job.status.is_terminal() {
            panic!("job ended {} (error {:?}), expected {status}", job.status, job.error);
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {status}; job is {}", job.status);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

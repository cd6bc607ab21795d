use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use printloop_api::config::AppConfig;
use printloop_api::router::build_app_router;
use printloop_api::state::AppState;
use printloop_events::{EventBus, EventLog};
use printloop_geometry::TriMeshEngine;
use printloop_meshy::MeshyClient;
use printloop_pipeline::{
    ConversionPipeline, GenerationCoordinator, HttpFetcher, JobService, PrintDispatcher, PrintMonitor,
};
use printloop_printer::{run_telemetry_loop, BambuTransport, PrinterStateSync, ReconnectConfig};
use printloop_store::JobStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "printloop_api=debug,printloop_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AppConfig::from_env().expect("Invalid configuration");
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        artifact_dir = %config.artifact_dir.display(),
        "Loaded configuration",
    );

    // --- Event bus ---
    let events = Arc::new(EventBus::default());
    let event_log_handle = tokio::spawn(EventLog::run(events.subscribe()));

    // --- Jobs and generation ---
    let store = Arc::new(JobStore::new(Arc::clone(&events)));
    if config.meshy.api_key.is_empty() {
        tracing::warn!("MESHY_API_KEY is not set; generation requests will be rejected upstream");
    }
    let meshy = MeshyClient::new(&config.meshy.base_url, &config.meshy.api_key)
        .expect("Failed to build generation client");
    let fetcher = HttpFetcher::new().expect("Failed to build download client");
    let conversion = Arc::new(ConversionPipeline::new(
        Arc::new(TriMeshEngine),
        Arc::new(fetcher),
        &config.artifact_dir,
    ));
    let coordinator = Arc::new(GenerationCoordinator::new(
        Arc::clone(&store),
        Arc::new(meshy),
        conversion,
        config.generation,
    ));

    // --- Printer ---
    let bambu = &config.printer.bambu;
    let upload_client = reqwest::Client::builder()
        .timeout(config.printer.request_timeout)
        .build()
        .expect("Failed to build upload client");
    let (transport, event_loop) =
        BambuTransport::new(bambu, upload_client).expect("Failed to configure printer TLS");
    let mqtt_client = transport.client();
    let printer = Arc::new(PrinterStateSync::new(
        Arc::new(transport),
        config.printer.request_timeout,
    ));

    let background = CancellationToken::new();
    let telemetry_handle = if bambu.is_configured() {
        tracing::info!(host = %bambu.host, serial = %bambu.serial, "Starting printer telemetry");
        Some(tokio::spawn(run_telemetry_loop(
            Arc::clone(&printer),
            mqtt_client,
            event_loop,
            bambu.report_topic(),
            ReconnectConfig::default(),
            background.clone(),
        )))
    } else {
        tracing::warn!("BAMBU_SERIAL_NUMBER or BAMBU_ACCESS_CODE not set; printer telemetry disabled");
        drop(event_loop);
        None
    };

    let monitor_handle = tokio::spawn(
        PrintMonitor::new(Arc::clone(&store), printer.subscribe()).run(background.clone()),
    );

    // --- App state ---
    let dispatcher = Arc::new(PrintDispatcher::new(Arc::clone(&store), Arc::clone(&printer)));
    let jobs = Arc::new(JobService::new(
        Arc::clone(&store),
        Arc::clone(&coordinator),
        dispatcher,
    ));
    let state = AppState {
        config: Arc::new(config.server.clone()),
        jobs,
        printer,
        events,
    };
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.server.host.parse().expect("Invalid HOST address"),
        config.server.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    coordinator.shutdown();
    background.cancel();
    if let Some(handle) = telemetry_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), monitor_handle).await;
    tracing::info!("Background tasks stopped");

    // Job tasks still hold the bus; stop logging rather than wait for them.
    event_log_handle.abort();

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

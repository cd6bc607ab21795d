//! Print start and print cancel through the dispatcher.

mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use common::{Harness, ScriptedGenerator};
use printloop_core::error::CoreError;
use printloop_core::job::{FailureKind, Job, JobSpec, JobStatus, Style};
use printloop_core::printer::PrinterState;
use printloop_core::types::JobId;
use printloop_printer::commands::PrintOptions;
use printloop_printer::PrinterCommand;

async fn ready_job(h: &Harness) -> Job {
    let job = h
        .service
        .create_job(JobSpec::new("benchy", Style::Realistic, 60.0))
        .await
        .unwrap();
    h.wait_for(job.id, JobStatus::Ready).await
}

#[tokio::test]
async fn busy_printer_rejects_without_touching_the_job() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("RUNNING").await;

    let result = h.service.start_print(job.id, PrintOptions::default()).await;

    assert_matches!(result, Err(CoreError::PrinterBusy(PrinterState::Running)));
    let after = h.service.get_job(job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Ready);
    assert_eq!(after.updated_at, job.updated_at);
    assert!(h.transport.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn second_start_waits_for_the_first_print() {
    let h = Harness::new(ScriptedGenerator::instant());
    let first = ready_job(&h).await;
    let second = ready_job(&h).await;
    h.printer_reports("IDLE").await;

    h.service.start_print(first.id, PrintOptions::default()).await.unwrap();
    // Telemetry has not caught up: the snapshot still reads idle.
    assert!(h.printer.readiness());

    let result = h.service.start_print(second.id, PrintOptions::default()).await;

    assert_matches!(result, Err(CoreError::PrinterBusy(PrinterState::Running)));
    let after = h.service.get_job(second.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Ready);
    assert_eq!(after.updated_at, second.updated_at);
    assert_eq!(h.transport.uploads.lock().unwrap().len(), 1);
    assert_eq!(h.transport.commands().len(), 1);
}

#[tokio::test]
async fn concurrent_starts_dispatch_one_job() {
    let h = Harness::new(ScriptedGenerator::instant());
    let a = ready_job(&h).await;
    let b = ready_job(&h).await;
    h.printer_reports("IDLE").await;

    let (ra, rb) = tokio::join!(
        h.service.start_print(a.id, PrintOptions::default()),
        h.service.start_print(b.id, PrintOptions::default()),
    );

    assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
    let loser = if ra.is_ok() { rb } else { ra };
    assert_matches!(loser, Err(CoreError::PrinterBusy(_)));

    let mut statuses = vec![
        h.service.get_job(a.id).await.unwrap().status,
        h.service.get_job(b.id).await.unwrap().status,
    ];
    statuses.sort_by_key(|s| s.to_string());
    assert_eq!(statuses, vec![JobStatus::Printing, JobStatus::Ready]);
    assert_eq!(h.transport.commands().len(), 1);
}

#[tokio::test]
async fn disconnected_printer_is_offline() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;

    assert_matches!(
        h.service.start_print(job.id, PrintOptions::default()).await,
        Err(CoreError::PrinterOffline)
    );
    assert_eq!(h.service.get_job(job.id).await.unwrap().status, JobStatus::Ready);
}

#[tokio::test]
async fn ready_printer_uploads_and_starts() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("IDLE").await;
    let options = PrintOptions {
        bed_leveling: false,
        use_ams: true,
    };

    let printing = h.service.start_print(job.id, options).await.unwrap();

    let file_name = format!("{}.3mf", job.id);
    assert_eq!(printing.status, JobStatus::Printing);
    assert_eq!(printing.printer_job_ref.as_deref(), Some(file_name.as_str()));
    assert!(printing.print_started_at.is_some());

    let uploads = h.transport.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, file_name);
    assert!(uploads[0].1 > 0);
    assert_eq!(
        h.transport.commands(),
        vec![PrinterCommand::PrintStart { file_name, options }]
    );
    // Only telemetry moves the snapshot.
    assert_eq!(h.printer.snapshot().state, PrinterState::Idle);
}

#[tokio::test]
async fn finished_printer_accepts_next_print() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("FINISH").await;

    let printing = h.service.start_print(job.id, PrintOptions::default()).await.unwrap();
    assert_eq!(printing.status, JobStatus::Printing);
}

#[tokio::test]
async fn upload_failure_fails_the_job() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("IDLE").await;
    h.transport.fail_upload.store(true, Ordering::SeqCst);

    assert_matches!(
        h.service.start_print(job.id, PrintOptions::default()).await,
        Err(CoreError::Transport(_))
    );

    let failed = h.service.get_job(job.id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.unwrap().kind, FailureKind::Transport);
    assert!(h.transport.commands().is_empty());
}

#[tokio::test]
async fn start_command_failure_fails_the_job() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("IDLE").await;
    h.transport.fail_publish.store(true, Ordering::SeqCst);

    assert_matches!(
        h.service.start_print(job.id, PrintOptions::default()).await,
        Err(CoreError::Transport(_))
    );

    let failed = h.service.get_job(job.id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.unwrap().kind, FailureKind::Transport);
}

#[tokio::test]
async fn only_ready_jobs_can_print() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("IDLE").await;
    h.service.start_print(job.id, PrintOptions::default()).await.unwrap();

    assert_matches!(
        h.service.start_print(job.id, PrintOptions::default()).await,
        Err(CoreError::InvalidTransition {
            from: JobStatus::Printing,
            to: JobStatus::Uploading,
            ..
        })
    );
    assert_matches!(
        h.service.start_print(JobId::nil(), PrintOptions::default()).await,
        Err(CoreError::NotFound(_))
    );
}

#[tokio::test]
async fn cancel_print_stops_the_printer() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("IDLE").await;
    h.service.start_print(job.id, PrintOptions::default()).await.unwrap();

    let cancelled = h.service.cancel_job(job.id).await.unwrap();

    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.print_ended_at.is_some());
    assert_eq!(h.transport.commands().last(), Some(&PrinterCommand::Stop));
}

#[tokio::test]
async fn failed_stop_leaves_the_job_printing() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("IDLE").await;
    h.service.start_print(job.id, PrintOptions::default()).await.unwrap();
    h.transport.fail_publish.store(true, Ordering::SeqCst);

    assert_matches!(h.service.cancel_job(job.id).await, Err(CoreError::Transport(_)));
    assert_eq!(h.service.get_job(job.id).await.unwrap().status, JobStatus::Printing);
}

#[tokio::test]
async fn printing_job_cannot_be_deleted() {
    let h = Harness::new(ScriptedGenerator::instant());
    let job = ready_job(&h).await;
    h.printer_reports("IDLE").await;
    h.service.start_print(job.id, PrintOptions::default()).await.unwrap();

    assert_matches!(h.service.delete_job(job.id).await, Err(CoreError::Conflict(_)));
    let artifact = h.service.get_job(job.id).await.unwrap().artifact_path.unwrap();
    assert!(artifact.exists());
}

//! The process-wide printer snapshot and command gateway.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use printloop_core::error::CoreError;
use printloop_core::printer::PrinterSnapshot;
use tokio::sync::watch;

use crate::commands::PrinterCommand;
use crate::telemetry::TelemetryUpdate;
use crate::transport::{PrinterTransport, TransportError, UploadAck};

/// Default bound on a single transport call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the single [`PrinterSnapshot`].
///
/// The snapshot lives in a `watch` channel: writers replace it under the
/// channel's lock, so readers only ever see whole snapshots, and
/// subscribers are woken on every applied change. Commands never touch
/// the snapshot; it changes only through telemetry and connection events.
pub struct PrinterStateSync {
    snapshot: watch::Sender<PrinterSnapshot>,
    transport: Arc<dyn PrinterTransport>,
    request_timeout: Duration,
}

impl PrinterStateSync {
    pub fn new(transport: Arc<dyn PrinterTransport>, request_timeout: Duration) -> Self {
        let (snapshot, _) = watch::channel(PrinterSnapshot::default());
        Self {
            snapshot,
            transport,
            request_timeout,
        }
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> PrinterSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified after every applied change.
    pub fn subscribe(&self) -> watch::Receiver<PrinterSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn readiness(&self) -> bool {
        self.snapshot.borrow().is_ready()
    }

    /// Readiness as an error: offline when disconnected, busy otherwise.
    pub fn ensure_ready(&self) -> Result<(), CoreError> {
        let snapshot = self.snapshot.borrow();
        if !snapshot.connected {
            return Err(CoreError::PrinterOffline);
        }
        if !snapshot.state.accepts_print() {
            return Err(CoreError::PrinterBusy(snapshot.state));
        }
        Ok(())
    }

    /// Merge one raw report into the snapshot.
    ///
    /// Malformed reports are logged and dropped. Returns whether the
    /// snapshot changed.
    pub fn on_telemetry(&self, raw: &[u8]) -> bool {
        let update = match TelemetryUpdate::parse(raw) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(error = %e, bytes = raw.len(), "Dropping printer report");
                return false;
            }
        };
        if update.is_empty() {
            return false;
        }
        let now = Utc::now();
        self.snapshot
            .send_if_modified(|snapshot| update.apply(snapshot, now))
    }

    /// Mark connected and ask the printer for a full status push.
    pub async fn on_connect(&self) {
        self.set_connected(true);
        tracing::info!("Printer connected");
        if let Err(e) = self.issue_command(PrinterCommand::PushAll).await {
            tracing::warn!(error = %e, "Full status request failed");
        }
    }

    pub fn on_disconnect(&self) {
        if self.set_connected(false) {
            tracing::warn!("Printer disconnected");
        }
    }

    fn set_connected(&self, connected: bool) -> bool {
        self.snapshot.send_if_modified(|snapshot| {
            let changed = snapshot.connected != connected;
            snapshot.connected = connected;
            changed
        })
    }

    /// Forward a command to the transport.
    ///
    /// Fails with `NotConnected` without calling the transport when the
    /// printer is disconnected; transport errors and timeouts surface as
    /// `Transport`.
    pub async fn issue_command(&self, command: PrinterCommand) -> Result<(), CoreError> {
        if !self.snapshot.borrow().connected {
            return Err(CoreError::NotConnected);
        }
        let result = self
            .bounded(self.transport.publish(&command))
            .await;
        match &result {
            Ok(()) => tracing::info!(command = command.kind(), "Printer command sent"),
            Err(e) => tracing::error!(command = command.kind(), error = %e, "Printer command failed"),
        }
        result
    }

    /// Upload a print-ready file, bounded by the request timeout.
    pub async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<UploadAck, CoreError> {
        let size = bytes.len();
        let ack = self.bounded(self.transport.upload(bytes, name)).await?;
        tracing::info!(file = name, remote = %ack.remote_name, size, "File uploaded to printer");
        Ok(ack)
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, TransportError>>,
    ) -> Result<T, CoreError> {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CoreError::Transport(e.to_string())),
            Err(_) => Err(CoreError::Transport(
                TransportError::Timeout(self.request_timeout).to_string(),
            )),
        }
    }
}

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::commands::PrinterCommand;

/// Errors from the printer transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("MQTT error: {0}")]
    Mqtt(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upload bridge answered with a non-2xx status.
    #[error("Upload rejected ({status}): {body}")]
    UploadRejected { status: u16, body: String },

    #[error("Printer request timed out after {0:?}")]
    Timeout(Duration),
}

/// Acknowledgement of a file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAck {
    /// Name under which the printer stores the file.
    pub remote_name: String,
}

/// Wire-level access to the printer.
#[async_trait]
pub trait PrinterTransport: Send + Sync {
    /// Publish a command to the printer's request channel.
    async fn publish(&self, command: &PrinterCommand) -> Result<(), TransportError>;

    /// Store a print-ready file on the printer.
    async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<UploadAck, TransportError>;
}

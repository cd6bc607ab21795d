//! Bambu Lab transport: MQTT over TLS for commands and telemetry, plus an
//! HTTP bridge endpoint that stores files on the printer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration, Transport};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::commands::PrinterCommand;
use crate::reconnect::{next_delay, wait_or_cancel, ReconnectConfig};
use crate::sync::PrinterStateSync;
use crate::tls::printer_client_config;
use crate::transport::{PrinterTransport, TransportError, UploadAck};

/// Printers listen for MQTT over TLS on this port.
pub const MQTT_PORT: u16 = 8883;

/// Fixed LAN-mode MQTT user.
const MQTT_USER: &str = "bblp";

const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(30);
const MQTT_CHANNEL_CAPACITY: usize = 100;

const PROJECT_MIME: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

/// Connection settings for one printer.
#[derive(Debug, Clone)]
pub struct BambuConfig {
    pub host: String,
    /// MQTT broker port, normally [`MQTT_PORT`].
    pub mqtt_port: u16,
    pub serial: String,
    /// LAN-mode access code shown on the printer.
    pub access_code: String,
    /// Bridge endpoint accepting multipart `file` uploads.
    pub upload_url: String,
}

impl BambuConfig {
    pub fn report_topic(&self) -> String {
        format!("device/{}/report", self.serial)
    }

    pub fn request_topic(&self) -> String {
        format!("device/{}/request", self.serial)
    }

    /// Telemetry needs a serial number and access code.
    pub fn is_configured(&self) -> bool {
        !self.serial.is_empty() && !self.access_code.is_empty()
    }
}

/// [`PrinterTransport`] for Bambu Lab printers.
pub struct BambuTransport {
    client: AsyncClient,
    http: reqwest::Client,
    request_topic: String,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    filename: Option<String>,
}

impl BambuTransport {
    /// Build the MQTT client and its event loop.
    ///
    /// Nothing connects until the event loop is polled, normally by
    /// [`run_telemetry_loop`].
    pub fn new(
        config: &BambuConfig,
        http: reqwest::Client,
    ) -> Result<(Self, EventLoop), TransportError> {
        let client_id = format!("printloop_{}", uuid::Uuid::new_v4().simple());

        let mut options = MqttOptions::new(client_id, config.host.clone(), config.mqtt_port);
        options.set_credentials(MQTT_USER, config.access_code.clone());
        options.set_keep_alive(MQTT_KEEP_ALIVE);
        options.set_clean_session(true);

        let tls = TlsConfiguration::Rustls(Arc::new(printer_client_config()?));
        options.set_transport(Transport::tls_with_config(tls));

        let (client, event_loop) = AsyncClient::new(options, MQTT_CHANNEL_CAPACITY);
        let transport = Self {
            client,
            http,
            request_topic: config.request_topic(),
            upload_url: config.upload_url.clone(),
        };
        Ok((transport, event_loop))
    }

    /// Handle for subscribing from the telemetry loop.
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }
}

#[async_trait]
impl PrinterTransport for BambuTransport {
    async fn publish(&self, command: &PrinterCommand) -> Result<(), TransportError> {
        let payload = command.to_json().to_string();
        self.client
            .publish(&self.request_topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| TransportError::Mqtt(e.to_string()))
    }

    async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<UploadAck, TransportError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(PROJECT_MIME)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.http.post(&self.upload_url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::UploadRejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: UploadResponse = response.json().await?;
        Ok(UploadAck {
            remote_name: body.filename.unwrap_or_else(|| name.to_string()),
        })
    }
}

/// Drive the MQTT event loop until `cancel` fires.
///
/// On every (re)connect the report topic is subscribed and
/// [`PrinterStateSync::on_connect`] runs; reports are fed to
/// [`PrinterStateSync::on_telemetry`]. Connection errors mark the printer
/// disconnected and back off before the next poll reconnects.
pub async fn run_telemetry_loop(
    sync: Arc<PrinterStateSync>,
    client: AsyncClient,
    mut event_loop: EventLoop,
    report_topic: String,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut delay = reconnect.initial_delay;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = event_loop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                delay = reconnect.initial_delay;
                if let Err(e) = client.try_subscribe(report_topic.as_str(), QoS::AtMostOnce) {
                    tracing::error!(error = %e, topic = %report_topic, "Report subscription failed");
                }
                // Publishing from this task could block on the request
                // queue that only this task drains.
                let sync = Arc::clone(&sync);
                tokio::spawn(async move { sync.on_connect().await });
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if publish.topic == report_topic {
                    sync.on_telemetry(&publish.payload);
                }
            }
            Ok(_) => {}
            Err(e) => {
                sync.on_disconnect();
                tracing::warn!(
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Printer connection error",
                );
                if !wait_or_cancel(delay, &cancel).await {
                    break;
                }
                delay = next_delay(delay, &reconnect);
            }
        }
    }

    sync.on_disconnect();
    tracing::info!("Printer telemetry loop stopped");
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use printloop_pipeline::GenerationConfig;
use printloop_printer::bambu::MQTT_PORT;
use printloop_printer::BambuConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MeshyConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub bambu: BambuConfig,
    pub request_timeout: Duration,
}

/// Everything the server needs, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub meshy: MeshyConfig,
    pub generation: GenerationConfig,
    pub artifact_dir: PathBuf,
    pub printer: PrinterConfig,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                         |
    /// |----------------------------------|---------------------------------|
    /// | `HOST`                           | `0.0.0.0`                       |
    /// | `PORT`                           | `3000`                          |
    /// | `CORS_ORIGINS`                   | `http://localhost:3000`         |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                            |
    /// | `MESHY_API_KEY`                  | empty                           |
    /// | `MESHY_BASE_URL`                 | `https://api.meshy.ai`          |
    /// | `GENERATION_POLL_INTERVAL_SECS`  | `5`                             |
    /// | `GENERATION_STAGE_TIMEOUT_SECS`  | `300`                           |
    /// | `ARTIFACT_DIR`                   | `./artifacts`                   |
    /// | `BAMBU_PRINTER_IP`               | `192.168.1.100`                 |
    /// | `BAMBU_MQTT_PORT`                | `8883`                          |
    /// | `BAMBU_SERIAL_NUMBER`            | empty (telemetry disabled)      |
    /// | `BAMBU_ACCESS_CODE`              | empty                           |
    /// | `PRINTER_UPLOAD_URL`             | `http://localhost:8765/upload`  |
    /// | `PRINTER_REQUEST_TIMEOUT_SECS`   | `30`                            |
    pub fn from_env() -> Result<Self, ConfigError> {
        let cors_origins: Vec<String> = var_or("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            if HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::Invalid {
                    name: "CORS_ORIGINS",
                    expected: "origin",
                    value: origin.clone(),
                });
            }
        }

        let server = ServerConfig {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 3000, "port number")?,
            cors_origins,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", 30, "number of seconds")?,
        };

        let meshy = MeshyConfig {
            api_key: var_or("MESHY_API_KEY", ""),
            base_url: var_or("MESHY_BASE_URL", printloop_meshy::client::DEFAULT_BASE_URL),
        };

        let generation = GenerationConfig {
            poll_interval: Duration::from_secs(parse_var(
                "GENERATION_POLL_INTERVAL_SECS",
                5,
                "number of seconds",
            )?),
            stage_timeout: Duration::from_secs(parse_var(
                "GENERATION_STAGE_TIMEOUT_SECS",
                300,
                "number of seconds",
            )?),
            ..GenerationConfig::default()
        };

        let printer = PrinterConfig {
            bambu: BambuConfig {
                host: var_or("BAMBU_PRINTER_IP", "192.168.1.100"),
                mqtt_port: parse_var("BAMBU_MQTT_PORT", MQTT_PORT, "port number")?,
                serial: var_or("BAMBU_SERIAL_NUMBER", ""),
                access_code: var_or("BAMBU_ACCESS_CODE", ""),
                upload_url: var_or("PRINTER_UPLOAD_URL", "http://localhost:8765/upload"),
            },
            request_timeout: Duration::from_secs(parse_var(
                "PRINTER_REQUEST_TIMEOUT_SECS",
                30,
                "number of seconds",
            )?),
        };

        Ok(Self {
            server,
            meshy,
            generation,
            artifact_dir: PathBuf::from(var_or("ARTIFACT_DIR", "./artifacts")),
            printer,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(name: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

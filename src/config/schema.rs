//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the conversion service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upload and output storage.
    pub storage: StorageConfig,

    /// Rendering engine and render pool settings.
    pub renderer: RendererConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
        }
    }
}

/// Storage directory layout and retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Flat directory holding uploaded HTML and generated PDFs.
    pub directory: PathBuf,

    /// URL prefix the directory is served under.
    pub public_prefix: String,

    /// Maximum accepted request body in bytes.
    pub max_upload_bytes: usize,

    /// Keep the uploaded HTML when conversion fails (reaped later by age).
    pub retain_failed_inputs: bool,

    /// Background removal of retained inputs.
    pub reaper: ReaperConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("uploads"),
            public_prefix: "/uploads".to_string(),
            max_upload_bytes: 10 * 1024 * 1024, // 10MB
            retain_failed_inputs: true,
            reaper: ReaperConfig::default(),
        }
    }
}

/// Age-based reaper for retained inputs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReaperConfig {
    pub enabled: bool,

    /// Sweep interval in seconds.
    pub interval_secs: u64,

    /// Retained inputs older than this are deleted.
    pub max_age_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            max_age_secs: 24 * 3600,
        }
    }
}

impl ReaperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// Rendering engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Chromium binary. Auto-detected when unset.
    pub chrome_path: Option<PathBuf>,

    /// Run Chromium with its sandbox enabled.
    pub sandbox: bool,

    /// Maximum engine instances alive at once.
    pub max_concurrent: usize,

    /// How long a request may wait for a free render slot, in milliseconds.
    pub queue_timeout_ms: u64,

    /// Upper bound for one render job in seconds.
    pub render_timeout_secs: u64,

    /// Extra delay after navigation completes, in milliseconds.
    pub settle_ms: u64,

    /// Print CSS backgrounds.
    pub print_background: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            sandbox: true,
            max_concurrent: 4,
            queue_timeout_ms: 5000,
            render_timeout_secs: 60,
            settle_ms: 0,
            print_background: true,
        }
    }
}

impl RendererConfig {
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

/// Timeout configuration for whole requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 120 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

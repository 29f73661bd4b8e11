//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use html2pdf_service::config::ServiceConfig;
use html2pdf_service::render::{RenderError, RenderJob, Renderer};
use html2pdf_service::storage::{Clock, FixedClock, RetainedInputs};
use html2pdf_service::{HttpServer, Shutdown};
use reqwest::multipart::{Form, Part};
use tempfile::TempDir;

pub const FIXED_MILLIS: u64 = 1_700_000_000_000;

/// Renderer producing a fake PDF that embeds the input document.
#[derive(Default)]
pub struct FakeRenderer {
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl FakeRenderer {
    pub fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }
}

impl Renderer for FakeRenderer {
    fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(job.input.is_absolute(), "renderer must get an absolute path");
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let html = std::fs::read(&job.input).map_err(|e| RenderError::Navigation(e.to_string()))?;
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend_from_slice(&html);
        Ok(pdf)
    }
}

/// Renderer whose engine always fails to start.
pub struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn render(&self, _job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Launch("engine exploded".into()))
    }
}

/// Renderer that succeeds but removes the storage directory, so the PDF cannot be written.
pub struct VanishingStorageRenderer;

impl Renderer for VanishingStorageRenderer {
    fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        if let Some(dir) = job.input.parent() {
            std::fs::remove_dir_all(dir).map_err(|e| RenderError::Export(e.to_string()))?;
        }
        Ok(b"%PDF-1.4\n".to_vec())
    }
}

/// A running server with its own storage directory.
pub struct TestServer {
    pub addr: SocketAddr,
    pub dir: TempDir,
    pub retained: Arc<RetainedInputs>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// File names currently in storage, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn stored_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// Start a server with a fixed clock on an ephemeral port.
pub async fn start_server(config: ServiceConfig, renderer: Arc<dyn Renderer>) -> TestServer {
    start_server_in(tempfile::tempdir().unwrap(), config, renderer).await
}

/// Like [`start_server`], over a storage directory prepared by the caller.
pub async fn start_server_in(
    dir: TempDir,
    mut config: ServiceConfig,
    renderer: Arc<dyn Renderer>,
) -> TestServer {
    config.storage.directory = dir.path().to_path_buf();

    let clock: Arc<dyn Clock> = Arc::new(FixedClock(FIXED_MILLIS));
    let server = HttpServer::with_parts(config, renderer, clock);
    let retained = server.retained();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        dir,
        retained,
        shutdown,
    }
}

/// Multipart form with a `file` part. File names are sent verbatim.
pub fn html_form(file_name: &str, html: &str) -> Form {
    let part = Part::bytes(html.as_bytes().to_vec())
        .file_name(file_name.to_string())
        .mime_str("text/html")
        .unwrap();
    Form::new().percent_encode_noop().part("file", part)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! RenderJob { input path, page format }
//!     → pool.rs (wait for a render slot, bounded)
//!     → blocking thread: Renderer::render
//!         → chrome.rs (launch engine → tab → navigate file:// → print A4 → release)
//!     → PDF bytes back to the request handler
//! ```
//!
//! # Design Decisions
//! - One engine process per job, released by a guard on every exit path
//! - Concurrency bounded by a semaphore; waiting is bounded too (503 on overflow)
//! - Renderers are blocking; the pool moves them off the async workers

pub mod chrome;
pub mod pool;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use chrome::ChromeRenderer;
pub use pool::RenderPool;

/// Paper format of the exported PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFormat {
    #[default]
    A4,
}

impl PageFormat {
    /// Paper (width, height) in inches.
    pub fn dimensions_inches(self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (8.27, 11.69),
        }
    }
}

/// A single conversion: one local HTML file to one PDF.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Absolute path of the HTML document.
    pub input: PathBuf,
    pub format: PageFormat,
}

impl RenderJob {
    pub fn a4(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            format: PageFormat::A4,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch renderer: {0}")]
    Launch(String),

    #[error("failed to load document: {0}")]
    Navigation(String),

    #[error("failed to export PDF: {0}")]
    Export(String),

    #[error("render timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("all render slots are busy")]
    Busy,

    #[error("render task aborted: {0}")]
    Join(String),
}

/// Converts an HTML file into PDF bytes. Implementations block.
pub trait Renderer: Send + Sync + 'static {
    fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError>;
}

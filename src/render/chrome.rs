//! Headless Chromium renderer.

use std::time::{Duration, Instant};

use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use url::Url;

use crate::config::RendererConfig;
use crate::observability::metrics;
use crate::render::{RenderError, RenderJob, Renderer};

/// Grace period past the render timeout before an idle engine shuts itself down.
const IDLE_GRACE: Duration = Duration::from_secs(30);

/// Launches a fresh Chromium for every job.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    config: RendererConfig,
}

impl ChromeRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    fn launch_options(&self) -> LaunchOptions<'static> {
        LaunchOptions {
            headless: true,
            sandbox: self.config.sandbox,
            path: self.config.chrome_path.clone(),
            idle_browser_timeout: self.config.render_timeout() + IDLE_GRACE,
            ..Default::default()
        }
    }

    fn pdf_options(&self, job: &RenderJob) -> PrintToPdfOptions {
        let (width, height) = job.format.dimensions_inches();
        PrintToPdfOptions {
            paper_width: Some(width),
            paper_height: Some(height),
            print_background: Some(self.config.print_background),
            ..Default::default()
        }
    }
}

impl Renderer for ChromeRenderer {
    fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        let url = Url::from_file_path(&job.input).map_err(|_| {
            RenderError::Navigation(format!("not an absolute path: {}", job.input.display()))
        })?;

        let engine = EngineGuard::launch(self.launch_options())?;

        let tab = engine
            .browser
            .new_tab()
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        tab.set_default_timeout(self.config.render_timeout());

        tab.navigate_to(url.as_str())
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        if self.config.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.settle_ms));
        }

        let pdf = tab
            .print_to_pdf(Some(self.pdf_options(job)))
            .map_err(|e| RenderError::Export(e.to_string()))?;

        tracing::debug!(
            input = %job.input.display(),
            bytes = pdf.len(),
            "PDF exported"
        );
        Ok(pdf)
    }
}

/// An engine process. Dropping it kills the process.
struct EngineGuard {
    browser: Browser,
    launched: Instant,
}

impl EngineGuard {
    fn launch(options: LaunchOptions<'static>) -> Result<Self, RenderError> {
        let browser = Browser::new(options).map_err(|e| RenderError::Launch(e.to_string()))?;
        metrics::render_started();
        tracing::debug!("Renderer engine launched");
        Ok(Self {
            browser,
            launched: Instant::now(),
        })
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        metrics::render_finished();
        tracing::debug!(
            held_ms = self.launched.elapsed().as_millis() as u64,
            "Renderer engine released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_options_are_a4() {
        let renderer = ChromeRenderer::new(RendererConfig::default());
        let options = renderer.pdf_options(&RenderJob::a4("/tmp/in.html"));
        assert_eq!(options.paper_width, Some(8.27));
        assert_eq!(options.paper_height, Some(11.69));
        assert_eq!(options.print_background, Some(true));
    }

    #[test]
    fn test_launch_options_follow_config() {
        let config = RendererConfig {
            sandbox: false,
            chrome_path: Some("/opt/chromium/chrome".into()),
            render_timeout_secs: 10,
            ..RendererConfig::default()
        };
        let options = ChromeRenderer::new(config).launch_options();
        assert!(options.headless);
        assert!(!options.sandbox);
        assert_eq!(options.path.as_deref(), Some(std::path::Path::new("/opt/chromium/chrome")));
        assert_eq!(options.idle_browser_timeout, Duration::from_secs(40));
    }

    #[test]
    #[ignore = "needs a local Chromium"]
    fn test_renders_real_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        std::fs::write(&input, "<html><body><h1>Invoice 42</h1></body></html>").unwrap();

        let config = RendererConfig {
            sandbox: false,
            ..RendererConfig::default()
        };
        let pdf = ChromeRenderer::new(config).render(&RenderJob::a4(input.clone())).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_relative_input_fails_before_launch() {
        let renderer = ChromeRenderer::new(RendererConfig::default());
        let err = renderer.render(&RenderJob::a4("relative/in.html")).unwrap_err();
        assert!(matches!(err, RenderError::Navigation(_)));
    }
}

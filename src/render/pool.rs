//! Bounded render pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::RendererConfig;
use crate::render::{RenderError, RenderJob, Renderer};

/// Runs render jobs on the blocking pool, at most `capacity` at a time.
pub struct RenderPool {
    renderer: Arc<dyn Renderer>,
    permits: Arc<Semaphore>,
    capacity: usize,
    queue_timeout: Duration,
    render_timeout: Duration,
}

impl RenderPool {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        capacity: usize,
        queue_timeout: Duration,
        render_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            queue_timeout,
            render_timeout,
        }
    }

    pub fn from_config(renderer: Arc<dyn Renderer>, config: &RendererConfig) -> Self {
        Self::new(
            renderer,
            config.max_concurrent,
            config.queue_timeout(),
            config.render_timeout(),
        )
    }

    /// Free render slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Render `job`, waiting at most the queue timeout for a slot.
    ///
    /// The slot stays taken until the renderer returns, even when the caller
    /// has already given up on a timed-out job.
    pub async fn render(&self, job: RenderJob) -> Result<Vec<u8>, RenderError> {
        let permit = match tokio::time::timeout(
            self.queue_timeout,
            self.permits.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(capacity = self.capacity, "Render pool saturated");
                return Err(RenderError::Busy);
            }
        };

        let renderer = self.renderer.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            renderer.render(&job)
        });

        match tokio::time::timeout(self.render_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(RenderError::Join(join.to_string())),
            Err(_) => Err(RenderError::Timeout(self.render_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowRenderer {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Renderer for SlowRenderer {
        fn render(&self, _job: &RenderJob) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(b"%PDF-1.7".to_vec())
        }
    }

    struct PanickingRenderer;

    impl Renderer for PanickingRenderer {
        fn render(&self, _job: &RenderJob) -> Result<Vec<u8>, RenderError> {
            panic!("engine crashed");
        }
    }

    fn slow(delay_ms: u64) -> Arc<SlowRenderer> {
        Arc::new(SlowRenderer {
            delay: Duration::from_millis(delay_ms),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_render_returns_bytes_and_frees_slot() {
        let pool = RenderPool::new(slow(0), 2, Duration::from_secs(1), Duration::from_secs(5));
        let pdf = pool.render(RenderJob::a4("/tmp/a.html")).await.unwrap();
        assert_eq!(pdf, b"%PDF-1.7");
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_saturated_pool_rejects_after_queue_timeout() {
        let renderer = slow(500);
        let pool = Arc::new(RenderPool::new(
            renderer.clone(),
            1,
            Duration::from_millis(50),
            Duration::from_secs(5),
        ));

        let busy = pool.clone();
        let first = tokio::spawn(async move { busy.render(RenderJob::a4("/tmp/a.html")).await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = pool.render(RenderJob::a4("/tmp/b.html")).await.unwrap_err();
        assert!(matches!(err, RenderError::Busy));

        assert!(first.await.unwrap().is_ok());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_waiting_job_gets_slot_when_freed() {
        let pool = Arc::new(RenderPool::new(
            slow(100),
            1,
            Duration::from_secs(2),
            Duration::from_secs(5),
        ));

        let a = pool.clone();
        let b = pool.clone();
        let (ra, rb) = tokio::join!(
            a.render(RenderJob::a4("/tmp/a.html")),
            b.render(RenderJob::a4("/tmp/b.html"))
        );
        assert!(ra.is_ok());
        assert!(rb.is_ok());
    }

    #[tokio::test]
    async fn test_render_timeout() {
        let pool = RenderPool::new(slow(300), 1, Duration::from_secs(1), Duration::from_millis(50));
        let err = pool.render(RenderJob::a4("/tmp/a.html")).await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout(_)));
        assert_eq!(err.to_string(), "render timed out after 0.05s");
    }

    #[tokio::test]
    async fn test_panicking_renderer_is_join_error() {
        let pool = RenderPool::new(
            Arc::new(PanickingRenderer),
            1,
            Duration::from_secs(1),
            Duration::from_secs(5),
        );
        let err = pool.render(RenderJob::a4("/tmp/a.html")).await.unwrap_err();
        assert!(matches!(err, RenderError::Join(_)));
        assert_eq!(pool.available(), 1);
    }
}

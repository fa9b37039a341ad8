use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Counts in-flight requests and lets shutdown wait for them to drain
#[derive(Clone)]
pub struct JobTracker {
    inner: Arc<Inner>,
}

struct Inner {
    running: watch::Sender<usize>,
    shutting_down: AtomicBool,
}

/// Held for the lifetime of one request; releases its slot on drop
pub struct JobGuard {
    inner: Arc<Inner>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTracker {
    pub fn new() -> Self {
        let (running, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                running,
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// A new slot, or `None` once shutdown has begun
    pub fn try_start(&self) -> Option<JobGuard> {
        if self.is_shutting_down() {
            return None;
        }
        self.inner.running.send_modify(|count| *count += 1);
        Some(JobGuard {
            inner: self.inner.clone(),
        })
    }

    pub fn running(&self) -> usize {
        *self.inner.running.borrow()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    pub fn begin_shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Resolves when the counter reaches zero. Returns `false` if `timeout` elapsed first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let mut rx = self.inner.running.subscribe();
        tokio::time::timeout(timeout, async move {
            // The sender lives in `inner`, so the channel cannot close here
            let _ = rx.wait_for(|count| *count == 0).await;
        })
        .await
        .is_ok()
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.inner.running.send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

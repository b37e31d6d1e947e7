use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Running flag shared between the Ctrl+C handler and the coordinator's tasks
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    running: Arc<AtomicBool>,
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self { running: Arc::new(AtomicBool::new(true)) }
    }

    /// Create a flag and register the process-wide Ctrl+C handler that clears it
    ///
    /// `ctrlc` allows one handler per process, so call this once from `main`.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let flag = Self::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Shutdown signal received");
            handler_flag.trigger();
        })?;
        Ok(flag)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn trigger(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Suspend until shutdown is triggered, checking every `poll`
    pub async fn wait(&self, poll: Duration) {
        while self.is_running() {
            tokio::time::sleep(poll).await;
        }
    }
}

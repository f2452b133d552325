//! Server state and configuration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::pdf::{PageSource, Pdftoppm};
use crate::transport::Target;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Where print jobs are sent
    pub target: Target,
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// Renders uploaded documents
    pub source: Arc<dyn PageSource>,
    /// Held while a job is being sent; one printer, one job at a time.
    /// The owned guard travels with the blocking write, so a dropped request
    /// cannot release it early.
    pub printer: Arc<Mutex<()>>,
    jobs: AtomicU64,
}

impl AppState {
    /// State rendering PDFs with `pdftoppm` at 203 DPI.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_source(config, Arc::new(Pdftoppm::default()))
    }

    pub fn with_source(config: ServerConfig, source: Arc<dyn PageSource>) -> Self {
        Self {
            config,
            source,
            printer: Arc::new(Mutex::new(())),
            jobs: AtomicU64::new(0),
        }
    }

    /// Whether a job currently holds the printer.
    pub fn is_busy(&self) -> bool {
        self.printer.try_lock().is_err()
    }

    /// Count a delivered job, returning the new total.
    pub fn record_job(&self) -> u64 {
        self.jobs.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn jobs_sent(&self) -> u64 {
        self.jobs.load(Ordering::Relaxed)
    }
}

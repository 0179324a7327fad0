use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::Result;
use crate::map::MapRegistry;
use crate::pipeline::{CancelToken, ProgressSink, ScanOutcome, ScanPipeline};

/// Registry handed back by a finished worker
#[derive(Debug)]
pub struct ScanResult {
    pub registry: MapRegistry,
    pub outcome: ScanOutcome,
}

/// Runs a [`ScanPipeline`] on a dedicated thread.
///
/// The registry is moved into the worker and only returned by [`join`],
/// so nothing can read it while the scan is in flight.
///
/// [`join`]: ScanWorker::join
pub struct ScanWorker {
    handle: JoinHandle<ScanResult>,
    cancel: Arc<CancelToken>,
}

impl ScanWorker {
    pub fn spawn<P>(
        pipeline: ScanPipeline,
        registry: MapRegistry,
        source: Arc<[u8]>,
        target: Arc<[u8]>,
        progress: P,
    ) -> Result<Self>
    where
        P: ProgressSink + Send + 'static,
    {
        Self::spawn_with_cancel(
            pipeline,
            registry,
            source,
            target,
            progress,
            Arc::new(CancelToken::new()),
        )
    }

    /// Spawn with a caller-owned cancel token
    pub fn spawn_with_cancel<P>(
        pipeline: ScanPipeline,
        mut registry: MapRegistry,
        source: Arc<[u8]>,
        target: Arc<[u8]>,
        progress: P,
        cancel: Arc<CancelToken>,
    ) -> Result<Self>
    where
        P: ProgressSink + Send + 'static,
    {
        let token = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("calshift-scan".to_string())
            .spawn(move || {
                debug!("Scan worker started");
                let outcome = pipeline.run(&mut registry, &source, &target, &token, &progress);
                debug!("Scan worker finished");
                ScanResult { registry, outcome }
            })?;

        Ok(Self { handle, cancel })
    }

    /// Ask the worker to stop after the current map
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> Arc<CancelToken> {
        Arc::clone(&self.cancel)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and take the registry back.
    ///
    /// A panic inside the worker is resumed on the calling thread.
    pub fn join(self) -> ScanResult {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

use std::sync::Arc;

use anyhow::Context;
use fetch_bench_core::prelude::ShutdownHandle;
use fetch_bench_instruments::Reporter;

use crate::executor::Executor;
use crate::shutdown::start_shutdown_listener;
use crate::types::FetchBenchResult;

/// Everything that outlives a single run: the async runtime, the reporter and the shutdown handle.
///
/// Create one per process and share it between the runs of a test with an [Arc].
pub struct RunnerContext {
    executor: Executor,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
}

impl RunnerContext {
    pub fn new(reporter: Reporter) -> FetchBenchResult<Self> {
        let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
        let shutdown_handle = start_shutdown_listener(&runtime)?;

        Ok(Self {
            executor: Executor::new(runtime),
            reporter: Arc::new(reporter),
            shutdown_handle,
        })
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    pub(crate) fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }

    /// Stop the run that is in progress. Requests that have not finished are recorded as cancelled.
    pub fn force_stop_run(&self) {
        self.shutdown_handle.shutdown();
    }
}

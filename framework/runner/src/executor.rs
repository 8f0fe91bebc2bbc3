use std::future::Future;

use fetch_bench_core::prelude::{DelegatedShutdownListener, ShutdownSignalError};

#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime) -> Self {
        Self { runtime }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future is dropped, and a [ShutdownSignalError] returned, if the listener observes the
    /// shutdown signal while it is in progress. The listener must have been created before the run
    /// started, so that a signal sent before this call is still seen. May be called from several
    /// threads at once, each call blocks only its own thread.
    pub fn execute_in_place<T>(
        &self,
        shutdown_listener: &mut DelegatedShutdownListener,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Run async code in place without racing it against the shutdown signal.
    ///
    /// For futures that watch for shutdown themselves and need to return what they have done so
    /// far rather than being dropped.
    pub fn block_on<T>(&self, fut: impl Future<Output = T>) -> T {
        self.runtime.block_on(fut)
    }
}

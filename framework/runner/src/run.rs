use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use fetch_bench_core::prelude::{
    DelegatedShutdownListener, Fetch, FetchError, FetchErrorKind, FetchOutcome, RunConfig,
    RunResult, ShutdownSignalError, Strategy,
};
use fetch_bench_instruments::{report_operation, OperationRecord, RunReport};
use indicatif::ProgressBar;
use tokio::task::JoinSet;

use crate::context::RunnerContext;
use crate::monitor::ResourceMonitor;
use crate::progress::request_progress;
use crate::types::FetchBenchResult;

/// Drives the requests of one run under the configured [Strategy].
///
/// A harness is `Idle` once created, `Running` for the duration of [Harness::run] and `Completed`
/// when that returns. It cannot be run twice, create a new harness for each run.
pub struct Harness<F: Fetch> {
    context: Arc<RunnerContext>,
    fetcher: Arc<F>,
    config: RunConfig,
    label: String,
    test_number: usize,
    show_progress: bool,
}

impl<F: Fetch> Harness<F> {
    /// Fails, before any request is issued, if the configuration is not valid.
    pub fn new(
        context: Arc<RunnerContext>,
        fetcher: F,
        config: RunConfig,
    ) -> FetchBenchResult<Self> {
        config.validate().context("Invalid run configuration")?;

        Ok(Self {
            context,
            fetcher: Arc::new(fetcher),
            label: config.strategy.to_string(),
            config,
            test_number: 1,
            show_progress: false,
        })
    }

    /// The name the run is reported under. Defaults to the strategy name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_test_number(mut self, test_number: usize) -> Self {
        self.test_number = test_number;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn run(self) -> FetchBenchResult<RunResult> {
        self.run_reported().map(|(result, _)| result)
    }

    /// Run, and also return the summary that was sent to the reporter.
    pub fn run_reported(self) -> FetchBenchResult<(RunResult, RunReport)> {
        log::info!(
            "Running test {} ({}): {} requests, {} strategy, {} client",
            self.test_number,
            self.label,
            self.config.request_count,
            self.config.strategy,
            self.config.client_reuse
        );

        // Every listener must exist before the run starts.
        let mut shutdown_listeners = self.subscribe_listeners();

        let monitor = ResourceMonitor::start()?;
        let tracker = OutcomeTracker::new(request_progress(
            self.context.reporter().console(),
            self.config.request_count,
            self.show_progress,
        ));

        let start = Instant::now();
        let outcomes = match self.config.strategy {
            Strategy::Sequential => self.run_sequential(&tracker, shutdown_listeners.remove(0)),
            Strategy::Concurrent => self.run_concurrent(&tracker, shutdown_listeners.remove(0)),
            Strategy::BoundedParallel => {
                self.run_bounded_parallel(&tracker, shutdown_listeners)?
            }
        };
        let elapsed = start.elapsed();

        let usage = monitor.stop();
        tracker.progress.finish_and_clear();

        let total_processed = tracker.processed.load(Ordering::Relaxed);
        debug_assert_eq!(outcomes.len(), self.config.request_count);
        debug_assert_eq!(
            total_processed,
            outcomes.iter().filter(|o| o.is_success()).count()
        );

        let run_report = RunReport {
            test_number: self.test_number,
            label: self.label.clone(),
            request_count: self.config.request_count,
            total_processed,
            elapsed,
            peak_memory_bytes: usage.peak_memory_bytes,
            peak_threads: usage.peak_threads,
        };
        self.context.reporter().add_run(&run_report);

        log::info!(
            "Test {} finished: {}/{} requests processed in {:?}",
            self.test_number,
            total_processed,
            self.config.request_count,
            elapsed
        );

        Ok((RunResult::new(total_processed, elapsed, outcomes), run_report))
    }

    /// One listener per thread that will wait for the shutdown signal. Bounded parallel runs get
    /// one for each worker, every other strategy gets exactly one.
    fn subscribe_listeners(&self) -> Vec<DelegatedShutdownListener> {
        let count = match self.config.strategy {
            Strategy::BoundedParallel => self.worker_count(),
            Strategy::Sequential | Strategy::Concurrent => 1,
        };

        (0..count)
            .map(|_| self.context.shutdown_handle().new_listener())
            .collect()
    }

    fn worker_count(&self) -> usize {
        // At least one, so that the listener list is never empty.
        self.config
            .worker_count()
            .min(self.config.request_count)
            .max(1)
    }

    fn run_sequential(
        &self,
        tracker: &OutcomeTracker,
        mut shutdown_listener: DelegatedShutdownListener,
    ) -> Vec<FetchOutcome> {
        let mut stopped = false;

        (0..self.config.request_count)
            .map(|index| {
                stopped = stopped || shutdown_listener.should_shutdown();
                let outcome = if stopped {
                    self.abandon(index)
                } else {
                    self.fetch_in_place(index, &mut shutdown_listener)
                };
                stopped = stopped || is_cancelled(&outcome);

                tracker.record(outcome)
            })
            .collect()
    }

    fn run_concurrent(
        &self,
        tracker: &OutcomeTracker,
        mut shutdown_listener: DelegatedShutdownListener,
    ) -> Vec<FetchOutcome> {
        let request_count = self.config.request_count;
        let timeout = self.config.per_request_timeout;

        let slots: Vec<Option<FetchOutcome>> = self.context.executor().block_on(async {
            let mut slots = vec![None; request_count];
            if shutdown_listener.should_shutdown() {
                return slots;
            }

            let mut tasks = JoinSet::new();
            let mut task_indices = HashMap::with_capacity(request_count);
            for index in 0..request_count {
                let fetcher = self.fetcher.clone();
                let url = self.config.target_for(index).to_string();
                let task = tasks.spawn(async move {
                    FetchOutcome::from_result(index, fetcher.fetch(index, &url, timeout).await)
                });
                task_indices.insert(task.id(), index);
            }

            loop {
                let joined = tokio::select! {
                    joined = tasks.join_next() => joined,
                    _ = shutdown_listener.wait_for_shutdown() => {
                        log::warn!("Run stopped with {} requests in flight", tasks.len());
                        tasks.abort_all();
                        break;
                    }
                };

                match joined {
                    Some(Ok(outcome)) => {
                        let index = outcome.index;
                        slots[index] = Some(tracker.record(outcome));
                    }
                    Some(Err(e)) => match task_indices.get(&e.id()) {
                        Some(&index) => {
                            log::error!("Fetch task for request {index} failed: {e}");
                            let error =
                                FetchError::new(index, FetchErrorKind::TaskFailed, e.to_string());
                            let outcome = self.record_unfinished(index, error);
                            slots[index] = Some(tracker.record(outcome));
                        }
                        None => log::error!("Fetch task failed: {e}"),
                    },
                    None => break,
                }
            }

            slots
        });

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or_else(|| tracker.record(self.abandon(index))))
            .collect()
    }

    fn run_bounded_parallel(
        &self,
        tracker: &OutcomeTracker,
        shutdown_listeners: Vec<DelegatedShutdownListener>,
    ) -> FetchBenchResult<Vec<FetchOutcome>> {
        let request_count = self.config.request_count;
        let next_index = AtomicUsize::new(0);

        log::debug!("Starting {} workers", shutdown_listeners.len());

        let outcomes = std::thread::scope(|scope| {
            let handles = shutdown_listeners
                .into_iter()
                .enumerate()
                .map(|(worker, mut shutdown_listener)| {
                    let next_index = &next_index;
                    std::thread::Builder::new()
                        .name(format!("worker-{worker}"))
                        .spawn_scoped(scope, move || {
                            let mut stopped = false;
                            let mut outcomes = Vec::new();

                            loop {
                                let index = next_index.fetch_add(1, Ordering::Relaxed);
                                if index >= request_count {
                                    break;
                                }

                                stopped = stopped || shutdown_listener.should_shutdown();
                                let outcome = if stopped {
                                    self.abandon(index)
                                } else {
                                    self.fetch_in_place(index, &mut shutdown_listener)
                                };
                                stopped = stopped || is_cancelled(&outcome);

                                outcomes.push(tracker.record(outcome));
                            }

                            outcomes
                        })
                        .context("Failed to spawn worker thread")
                })
                .collect::<FetchBenchResult<Vec<_>>>()?;

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|e| anyhow::anyhow!("Error joining worker thread: {:?}", e))
                })
                .collect::<FetchBenchResult<Vec<_>>>()
        })?;

        Ok(outcomes.into_iter().flatten().collect())
    }

    /// Fetch one request on the current thread, giving up if the run is stopped.
    fn fetch_in_place(
        &self,
        index: usize,
        shutdown_listener: &mut DelegatedShutdownListener,
    ) -> FetchOutcome {
        let url = self.config.target_for(index);
        let timeout = self.config.per_request_timeout;

        match self.context.executor().execute_in_place(shutdown_listener, async {
            Ok(self.fetcher.fetch(index, url, timeout).await)
        }) {
            Ok(result) => FetchOutcome::from_result(index, result),
            Err(e) if e.is::<ShutdownSignalError>() => self.abandon(index),
            Err(e) => {
                log::error!("Request {index} could not be run: {e:?}");
                self.abandon(index)
            }
        }
    }

    /// Record a request that will never complete because the run was stopped.
    fn abandon(&self, index: usize) -> FetchOutcome {
        self.record_unfinished(index, FetchError::cancelled(index))
    }

    /// Report a request that the fetcher did not finish, and so did not report itself.
    fn record_unfinished(&self, index: usize, error: FetchError) -> FetchOutcome {
        let operation_record =
            OperationRecord::new(self.config.target_for(index).to_string(), index);
        let result = Err(error);
        report_operation(self.context.reporter(), operation_record, &result);

        FetchOutcome::from_result(index, result)
    }
}

/// Counts successful outcomes. The counter is shared by every task and worker of a run.
struct OutcomeTracker {
    processed: AtomicUsize,
    progress: ProgressBar,
}

impl OutcomeTracker {
    fn new(progress: ProgressBar) -> Self {
        Self {
            processed: AtomicUsize::new(0),
            progress,
        }
    }

    fn record(&self, outcome: FetchOutcome) -> FetchOutcome {
        if outcome.is_success() {
            self.processed.fetch_add(1, Ordering::Relaxed);
        }
        self.progress.inc(1);
        outcome
    }
}

fn is_cancelled(outcome: &FetchOutcome) -> bool {
    outcome.error.as_ref().map(|e| e.kind) == Some(FetchErrorKind::Cancelled)
}

mod in_memory_reporter;
mod summary_report;
mod trace_report;

use std::path::PathBuf;
use std::time::Duration;

use indicatif::MultiProgress;
use parking_lot::Mutex;

use crate::OperationRecord;

pub use in_memory_reporter::InMemoryReporter;
pub use summary_report::SummaryReportCollector;
pub use trace_report::{log_file_name, TraceReportCollector};

/// The one-shot summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Position of this run when a test is repeated, starting at 1.
    pub test_number: usize,
    /// Name of the variant that was run.
    pub label: String,
    pub request_count: usize,
    pub total_processed: usize,
    pub elapsed: Duration,
    pub peak_memory_bytes: u64,
    pub peak_threads: usize,
}

impl RunReport {
    pub fn peak_memory_mb(&self) -> u64 {
        self.peak_memory_bytes / (1024 * 1024)
    }
}

/// Receives structured events from a run. Implementations decide how, and whether, to render them.
pub trait ReportCollector {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    fn add_run(&mut self, run_report: &RunReport);

    fn finalize(&self);
}

/// Fans events out to every configured collector. Shared between all tasks and worker threads of a
/// run, each collector is locked while it handles an event.
pub struct Reporter {
    collectors: Vec<Mutex<Box<dyn ReportCollector + Send>>>,
    console: MultiProgress,
}

impl Reporter {
    /// Progress bars must be added here so that they do not garble the console trace.
    pub fn console(&self) -> &MultiProgress {
        &self.console
    }

    pub fn add_operation(&self, operation_record: &OperationRecord) {
        for collector in &self.collectors {
            collector.lock().add_operation(operation_record);
        }
    }

    pub fn add_run(&self, run_report: &RunReport) {
        for collector in &self.collectors {
            collector.lock().add_run(run_report);
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.lock().finalize();
        }
    }
}

/// Choose which collectors a [Reporter] is built with. Nothing is enabled by default.
#[derive(Default)]
pub struct ReportConfig {
    trace_console: bool,
    trace_file: Option<PathBuf>,
    summary: bool,
    custom: Vec<Box<dyn ReportCollector + Send>>,
}

impl ReportConfig {
    /// Write the trace of each request and run summary to stdout.
    pub fn enable_trace_console(mut self) -> Self {
        self.trace_console = true;
        self
    }

    /// Write the same trace as the console to a file. The file is created, or truncated, by
    /// [ReportConfig::init].
    pub fn enable_trace_file(mut self, path: PathBuf) -> Self {
        self.trace_file = Some(path);
        self
    }

    /// Print a table per target at the end of every run.
    pub fn enable_summary(mut self) -> Self {
        self.summary = true;
        self
    }

    pub fn with_collector(mut self, collector: impl ReportCollector + Send + 'static) -> Self {
        self.custom.push(Box::new(collector));
        self
    }

    pub fn init(self) -> anyhow::Result<Reporter> {
        let mut collectors: Vec<Box<dyn ReportCollector + Send>> = Vec::new();
        let console = MultiProgress::new();

        if self.trace_console {
            collectors.push(Box::new(TraceReportCollector::console(console.clone())));
        }

        if let Some(path) = self.trace_file {
            log::info!("Writing trace to {}", path.display());
            collectors.push(Box::new(TraceReportCollector::file(&path)?));
        }

        if self.summary {
            collectors.push(Box::new(SummaryReportCollector::new()));
        }

        collectors.extend(self.custom);

        Ok(Reporter {
            collectors: collectors.into_iter().map(Mutex::new).collect(),
            console,
        })
    }
}

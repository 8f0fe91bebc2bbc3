mod report;

use std::time::{Duration, Instant};

use fetch_bench_core::prelude::FetchError;

pub use report::{
    log_file_name, InMemoryReporter, ReportCollector, ReportConfig, Reporter, RunReport,
    SummaryReportCollector, TraceReportCollector,
};

/// Timing and result of a single fetch, as seen by the reporter.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    /// The target URL the request was routed to.
    pub operation_id: String,
    pub index: usize,
    started: Instant,
    pub elapsed: Option<Duration>,
    pub byte_length: Option<usize>,
    pub error: Option<FetchError>,
}

impl OperationRecord {
    pub fn new(operation_id: String, index: usize) -> Self {
        Self {
            operation_id,
            index,
            started: Instant::now(),
            elapsed: None,
            byte_length: None,
            error: None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Complete the record with the result of the fetch and hand it to the reporter.
pub fn report_operation(
    reporter: &Reporter,
    mut operation_record: OperationRecord,
    response: &Result<usize, FetchError>,
) {
    operation_record.elapsed = Some(operation_record.started.elapsed());
    match response {
        Ok(byte_length) => operation_record.byte_length = Some(*byte_length),
        Err(e) => operation_record.error = Some(e.clone()),
    }

    reporter.add_operation(&operation_record);
}

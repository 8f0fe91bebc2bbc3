use std::sync::Arc;

use parking_lot::Mutex;

use crate::report::{ReportCollector, RunReport};
use crate::OperationRecord;

/// Keeps every event in memory. Clones share the same storage, so a clone can be handed to a
/// [crate::ReportConfig] and the original kept to inspect what was reported.
#[derive(Clone, Default)]
pub struct InMemoryReporter {
    operation_records: Arc<Mutex<Vec<OperationRecord>>>,
    run_reports: Arc<Mutex<Vec<RunReport>>>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<OperationRecord> {
        self.operation_records.lock().clone()
    }

    pub fn runs(&self) -> Vec<RunReport> {
        self.run_reports.lock().clone()
    }
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.lock().push(operation_record.clone());
    }

    fn add_run(&mut self, run_report: &RunReport) {
        self.run_reports.lock().push(run_report.clone());
    }

    fn finalize(&self) {
        log::debug!(
            "In memory reporter holds {} operations from {} runs",
            self.operation_records.lock().len(),
            self.run_reports.lock().len()
        );
    }
}

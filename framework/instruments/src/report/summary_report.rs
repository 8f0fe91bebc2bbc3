mod tables;

use std::collections::BTreeMap;

use tabled::settings::Style;
use tabled::Table;

use crate::report::summary_report::tables::{RunRow, TargetRow};
use crate::report::{ReportCollector, RunReport};
use crate::OperationRecord;

/// Prints a table of the requests made to each target when a run finishes, and a table comparing
/// all runs when the reporter is finalized.
pub struct SummaryReportCollector {
    operation_records: Vec<OperationRecord>,
    run_reports: Vec<RunReport>,
}

impl SummaryReportCollector {
    pub fn new() -> Self {
        Self {
            operation_records: Vec::new(),
            run_reports: Vec::new(),
        }
    }

    fn target_rows(&self) -> Vec<TargetRow> {
        self.operation_records
            .iter()
            .fold(BTreeMap::<_, Vec<_>>::new(), |mut acc, record| {
                acc.entry(record.operation_id.clone())
                    .or_default()
                    .push(record);
                acc
            })
            .into_iter()
            .map(|(target, operations)| {
                let requests = operations.len();
                let total_duration_micro = operations
                    .iter()
                    .filter_map(|record| record.duration())
                    .map(|d| d.as_micros())
                    .sum::<u128>();
                let ok_times = operations
                    .iter()
                    .filter(|op| !op.is_error())
                    .filter_map(|op| op.duration())
                    .map(|d| d.as_micros() as f64 / 1000.0);

                TargetRow {
                    target,
                    requests,
                    ok: operations.iter().filter(|op| !op.is_error()).count(),
                    errors: operations.iter().filter(|op| op.is_error()).count(),
                    total_bytes: operations.iter().filter_map(|op| op.byte_length).sum(),
                    avg_time_ms: (total_duration_micro as f64 / requests as f64) / 1000.0,
                    min_time_ms: ok_times.clone().reduce(f64::min),
                    max_time_ms: ok_times.reduce(f64::max),
                }
            })
            .collect()
    }

    fn print_summary_of_targets(&self) {
        let rows = self.target_rows();
        if rows.is_empty() {
            return;
        }

        println!("\nSummary of targets");
        let mut table = Table::new(&rows);
        table.with(Style::modern());
        println!("{}", table);
    }

    fn print_summary_of_runs(&self) {
        if self.run_reports.len() < 2 {
            return;
        }

        println!("\nSummary of runs");
        let rows = self
            .run_reports
            .iter()
            .map(|run| RunRow {
                test_number: run.test_number,
                variant: run.label.clone(),
                processed: format!("{}/{}", run.total_processed, run.request_count),
                elapsed_s: run.elapsed.as_secs_f64(),
                peak_memory_mb: run.peak_memory_mb(),
                peak_threads: run.peak_threads,
            })
            .collect::<Vec<_>>();

        let mut table = Table::new(&rows);
        table.with(Style::modern());
        println!("{}", table);
    }
}

impl Default for SummaryReportCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCollector for SummaryReportCollector {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn add_run(&mut self, run_report: &RunReport) {
        self.print_summary_of_targets();
        self.operation_records.clear();
        self.run_reports.push(run_report.clone());
    }

    fn finalize(&self) {
        self.print_summary_of_runs();
    }
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDateTime;
use indicatif::MultiProgress;

use crate::report::{ReportCollector, RunReport};
use crate::OperationRecord;

const SEPARATOR_WIDTH: usize = 30;

/// Name of the trace file for a test, for example `sequential(reqs=250)-20240101 120000.log`.
pub fn log_file_name(label: &str, request_count: usize, started_at: NaiveDateTime) -> String {
    format!(
        "{}(reqs={})-{}.log",
        label,
        request_count,
        started_at.format("%Y%m%d %H%M%S")
    )
}

/// Writes a plain text line for every request and a summary block for every run.
pub struct TraceReportCollector {
    writer: Box<dyn Write + Send>,
    /// Progress bars drawn on the same terminal, hidden while lines are written.
    console: Option<MultiProgress>,
}

impl TraceReportCollector {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            console: None,
        }
    }

    /// Trace to stdout, keeping out of the way of any progress bar added to `console`.
    pub fn console(console: MultiProgress) -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
            console: Some(console),
        }
    }

    pub fn file(path: &Path) -> anyhow::Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create trace file {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }

    fn write_lines(&mut self, lines: &[String]) {
        let writer = &mut self.writer;
        let result = match &self.console {
            Some(console) => {
                console.suspend(|| write_all(writer, lines).and_then(|_| writer.flush()))
            }
            None => write_all(writer, lines),
        };
        if let Err(e) = result {
            log::warn!("Failed to write trace: {e}");
        }
    }
}

impl ReportCollector for TraceReportCollector {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        let line = match &operation_record.error {
            None => format!(
                "{} - OK (length={})",
                operation_record.index,
                operation_record.byte_length.unwrap_or_default()
            ),
            Some(e) => format!("{} - ERROR ({}: {})", operation_record.index, e.kind, e.cause),
        };
        self.write_lines(&[line]);
    }

    fn add_run(&mut self, run_report: &RunReport) {
        self.write_lines(&summary_block(run_report));
        if let Err(e) = self.writer.flush() {
            log::warn!("Failed to flush trace: {e}");
        }
    }

    fn finalize(&self) {}
}

fn write_all<W: Write + ?Sized>(writer: &mut W, lines: &[String]) -> std::io::Result<()> {
    lines.iter().try_for_each(|line| writeln!(writer, "{line}"))
}

fn summary_block(run_report: &RunReport) -> Vec<String> {
    let separator = "*".repeat(SEPARATOR_WIDTH);
    vec![
        separator.clone(),
        format!("Test Number : {}", run_report.test_number),
        format!("Total Processed : {}", run_report.total_processed),
        format!("Elapsed Time : {}", format_elapsed(run_report.elapsed)),
        format!("Peak Memory : {}MB", run_report.peak_memory_mb()),
        format!("Threads : {}", run_report.peak_threads),
        separator,
        // Tab separated so that it can be pasted straight into a spreadsheet row.
        format!(
            "{}\t{}\t{:.3}\t{}\t{}",
            run_report.test_number,
            run_report.total_processed,
            run_report.elapsed.as_secs_f64(),
            run_report.peak_memory_mb(),
            run_report.peak_threads
        ),
    ]
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60,
        elapsed.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fetch_bench_core::prelude::{FetchError, FetchErrorKind};
    use indicatif::{ProgressBar, ProgressDrawTarget};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    /// A writer that can be read back after it has been boxed by the collector.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    fn sample_run() -> RunReport {
        RunReport {
            test_number: 1,
            label: "sequential".to_string(),
            request_count: 4,
            total_processed: 3,
            elapsed: Duration::from_millis(3_723_456),
            peak_memory_bytes: 42 * 1024 * 1024,
            peak_threads: 9,
        }
    }

    #[test]
    fn file_name_has_label_count_and_timestamp() {
        let started_at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();

        assert_eq!(
            "bounded-parallel-httpclient(reqs=250)-20240309 070501.log",
            log_file_name("bounded-parallel-httpclient", 250, started_at)
        );
    }

    #[test]
    fn elapsed_is_formatted_as_clock_time() {
        assert_eq!("01:02:03.456", format_elapsed(Duration::from_millis(3_723_456)));
        assert_eq!("00:00:00.000", format_elapsed(Duration::ZERO));
    }

    #[test]
    fn trace_lines_for_requests_and_summary() {
        let buffer = SharedBuffer::default();
        let mut collector = TraceReportCollector::new(buffer.clone());

        let mut ok = OperationRecord::new("http://a.test/".to_string(), 0);
        ok.byte_length = Some(10);
        collector.add_operation(&ok);

        let mut failed = OperationRecord::new("http://b.test/".to_string(), 1);
        failed.error = Some(FetchError::new(1, FetchErrorKind::Timeout, "deadline elapsed"));
        collector.add_operation(&failed);

        collector.add_run(&sample_run());

        let expected = [
            "0 - OK (length=10)",
            "1 - ERROR (timeout: deadline elapsed)",
            "******************************",
            "Test Number : 1",
            "Total Processed : 3",
            "Elapsed Time : 01:02:03.456",
            "Peak Memory : 42MB",
            "Threads : 9",
            "******************************",
            "1\t3\t3723.456\t42\t9",
        ]
        .join("\n")
            + "\n";
        assert_eq!(expected, buffer.contents());
    }

    #[test]
    fn lines_are_written_while_a_progress_bar_is_shown() {
        let buffer = SharedBuffer::default();
        let console = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = console.add(ProgressBar::new(2));
        let mut collector = TraceReportCollector {
            writer: Box::new(buffer.clone()),
            console: Some(console),
        };

        let mut ok = OperationRecord::new("http://a.test/".to_string(), 0);
        ok.byte_length = Some(5);
        collector.add_operation(&ok);
        bar.inc(1);
        collector.add_operation(&ok);

        assert_eq!("0 - OK (length=5)\n0 - OK (length=5)\n", buffer.contents());
        assert_eq!(1, bar.position());
    }

    #[test]
    fn trace_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");

        let mut collector = TraceReportCollector::file(&path).unwrap();
        let mut ok = OperationRecord::new("http://a.test/".to_string(), 2);
        ok.byte_length = Some(20);
        collector.add_operation(&ok);
        collector.add_run(&sample_run());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("2 - OK (length=20)\n"));
        assert!(contents.contains("Test Number : 1"));
    }
}

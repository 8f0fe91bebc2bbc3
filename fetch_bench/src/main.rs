use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use fetch_bench_runner::prelude::*;
use fetch_bench_summary_model::{append_run_summary, load_summary_runs, RunSummary};
use http_client_instrumented::prelude::HttpFetcher;

/// Environment variables recorded with each run summary when they are set.
const RECORDED_ENV: [&str; 2] = ["RUST_LOG", "TOKIO_WORKER_THREADS"];

fn main() -> FetchBenchResult<()> {
    let cli = init();

    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let variant = match cli.variant.or(file_config.variant) {
        Some(variant) => variant,
        None => prompt_variant(&mut std::io::stdin().lock(), &mut std::io::stdout())?,
    };

    let plan = BenchPlan::resolve(variant, &cli, file_config);
    log::info!(
        "Running {} with {} requests, {} time(s)",
        plan.variant,
        plan.run_config.request_count,
        plan.repeat
    );

    let mut report_config = ReportConfig::default()
        .enable_trace_console()
        .enable_summary();
    if !cli.no_log_file {
        std::fs::create_dir_all(&cli.log_dir).with_context(|| {
            format!("Failed to create log directory {}", cli.log_dir.display())
        })?;
        let file_name = log_file_name(
            plan.variant.name(),
            plan.run_config.request_count,
            chrono::Local::now().naive_local(),
        );
        report_config = report_config.enable_trace_file(cli.log_dir.join(file_name));
    }

    let context = Arc::new(RunnerContext::new(report_config.init()?)?);

    for test_number in 1..=plan.repeat {
        let started_at = chrono::Utc::now().timestamp();
        let fetcher = HttpFetcher::new(plan.run_config.client_reuse, context.reporter().clone())?;

        let (result, run_report) = Harness::new(context.clone(), fetcher, plan.run_config.clone())?
            .with_label(plan.variant.name())
            .with_test_number(test_number)
            .with_progress(!cli.no_progress)
            .run_reported()?;

        if let Some(path) = &cli.summary_path {
            let summary = run_summary(&plan, &run_report, started_at);
            log::debug!("Run {} has fingerprint {}", summary.run_id, summary.fingerprint());
            write_summary(&summary, path)?;
            compare_with_earlier_runs(&summary, path);
        }

        if result
            .failures()
            .any(|e| e.kind == FetchErrorKind::Cancelled)
        {
            log::warn!("Test {test_number} was stopped, skipping any remaining repetitions");
            break;
        }
    }

    context.reporter().finalize();

    Ok(())
}

fn run_summary(plan: &BenchPlan, run_report: &RunReport, started_at: i64) -> RunSummary {
    let config = &plan.run_config;

    RunSummary {
        run_id: nanoid::nanoid!(),
        variant: plan.variant.name().to_string(),
        strategy: config.strategy.to_string(),
        client_reuse: config.client_reuse.to_string(),
        started_at,
        request_count: config.request_count,
        targets: config.targets.clone(),
        per_request_timeout_ms: config.per_request_timeout.as_millis() as u64,
        parallelism: (config.strategy == Strategy::BoundedParallel)
            .then(|| config.worker_count()),
        test_number: run_report.test_number,
        total_processed: run_report.total_processed,
        elapsed_ms: run_report.elapsed.as_millis() as u64,
        peak_memory_bytes: run_report.peak_memory_bytes,
        peak_threads: run_report.peak_threads,
        env: RECORDED_ENV
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect::<HashMap<_, _>>(),
        fetch_bench_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn write_summary(summary: &RunSummary, path: &Path) -> FetchBenchResult<()> {
    append_run_summary(summary, path)
        .with_context(|| format!("Failed to write run summary to {}", path.display()))
}

/// Log how this run compares with earlier runs of the same configuration in the summary file.
fn compare_with_earlier_runs(summary: &RunSummary, path: &Path) {
    let runs = match load_summary_runs(path) {
        Ok(runs) => runs,
        Err(e) => {
            log::warn!("Failed to read earlier runs from {}: {e:?}", path.display());
            return;
        }
    };

    let earlier = summary.same_configuration(&runs);
    if earlier.is_empty() {
        log::info!("No earlier runs with this configuration in {}", path.display());
        return;
    }

    let count = earlier.len() as u64;
    log::info!(
        "Test {} took {} ms and processed {} requests. {} earlier run(s) with this configuration averaged {} ms and {} requests",
        summary.test_number,
        summary.elapsed_ms,
        summary.total_processed,
        count,
        earlier.iter().map(|run| run.elapsed_ms).sum::<u64>() / count,
        earlier.iter().map(|run| run.total_processed as u64).sum::<u64>() / count,
    );
}

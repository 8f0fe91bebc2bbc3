use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run, repetitions of a test each get their own id.
    pub run_id: String,
    /// The name of the variant that was run, such as `bounded-parallel-httpclient`
    pub variant: String,
    /// The strategy the variant issues requests with
    pub strategy: String,
    /// Whether one client was shared by every request or a client was built per request
    pub client_reuse: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The number of requests the run was configured with
    pub request_count: usize,
    /// The URLs requests were spread over, in round-robin order
    pub targets: Vec<String>,
    /// The timeout applied to each request, in milliseconds
    pub per_request_timeout_ms: u64,
    /// The worker pool size, only set for the bounded parallel variants
    pub parallelism: Option<usize>,
    /// The position of this run when the test is repeated, counting from 1
    pub test_number: usize,
    /// The number of requests that completed successfully
    pub total_processed: usize,
    /// The wall time of the run, in milliseconds
    pub elapsed_ms: u64,
    /// The peak resident memory of the process during the run, in bytes
    pub peak_memory_bytes: u64,
    /// The peak number of threads of the process during the run
    ///
    /// Zero where the platform does not report threads.
    pub peak_threads: usize,
    /// Environment variables set for the run
    ///
    /// This won't capture all environment variables. Just the ones that the runner is aware of.
    pub env: HashMap<String, String>,
    /// The version of fetch_bench that was used for this run
    pub fetch_bench_version: String,
}

impl RunSummary {
    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to identify the configuration a run was started with, so that
    /// the results of runs with the same configuration can be compared. It uses the
    ///     - Variant name
    ///     - Request count
    ///     - Targets
    ///     - Per request timeout
    ///     - Parallelism
    ///     - Selected environment variables
    ///     - fetch_bench version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.variant.as_bytes());
        Digest::update(&mut hasher, (self.request_count as u64).to_le_bytes());
        self.targets.iter().for_each(|target| {
            Digest::update(&mut hasher, target.as_bytes());
        });
        Digest::update(&mut hasher, self.per_request_timeout_ms.to_le_bytes());
        if let Some(parallelism) = self.parallelism {
            Digest::update(&mut hasher, (parallelism as u64).to_le_bytes());
        }
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.fetch_bench_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }

    /// The runs, other than this one, that were started with the same configuration.
    pub fn same_configuration<'a>(&self, runs: &'a [RunSummary]) -> Vec<&'a RunSummary> {
        let fingerprint = self.fingerprint();
        runs.iter()
            .filter(|run| run.run_id != self.run_id && run.fingerprint() == fingerprint)
            .collect()
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary].
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}

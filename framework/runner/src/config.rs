use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use fetch_bench_core::prelude::RunConfig;
use serde::Deserialize;

use crate::cli::FetchBenchCli;
use crate::types::FetchBenchResult;
use crate::variant::Variant;

/// Settings read from a TOML file. Every field is optional and the command line wins over the
/// file when both are given.
///
/// ```toml
/// variant = "bounded-parallel-httpclient"
/// requests = 500
/// targets = ["http://localhost:5000/api/values"]
/// timeout_ms = 30000
/// parallelism = 8
/// repeat = 3
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub variant: Option<Variant>,
    pub requests: Option<usize>,
    pub targets: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
    pub parallelism: Option<NonZeroUsize>,
    pub repeat: Option<NonZeroUsize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> FetchBenchResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> FetchBenchResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// What the benchmark binary will do once every source of configuration has been merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchPlan {
    pub variant: Variant,
    pub run_config: RunConfig,
    /// How many times the test is run, each run is numbered from 1.
    pub repeat: usize,
}

impl BenchPlan {
    pub fn resolve(variant: Variant, cli: &FetchBenchCli, file: FileConfig) -> Self {
        let defaults = RunConfig::default();

        let targets = if !cli.targets.is_empty() {
            cli.targets.clone()
        } else {
            file.targets.unwrap_or(defaults.targets)
        };

        let run_config = RunConfig {
            request_count: cli
                .requests
                .or(file.requests)
                .unwrap_or(defaults.request_count),
            strategy: variant.strategy(),
            client_reuse: variant.client_reuse(),
            targets,
            per_request_timeout: cli
                .timeout_ms
                .or(file.timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.per_request_timeout),
            parallelism: cli.parallelism.or(file.parallelism),
        };

        Self {
            variant,
            run_config,
            repeat: cli.repeat.or(file.repeat).map(NonZeroUsize::get).unwrap_or(1),
        }
    }
}

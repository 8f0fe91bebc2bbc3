mod cli;
mod config;
mod context;
mod executor;
mod init;
mod monitor;
mod progress;
mod run;
mod shutdown;
mod types;
mod variant;

pub mod prelude {
    pub use crate::cli::FetchBenchCli;
    pub use crate::config::{BenchPlan, FileConfig};
    pub use crate::context::RunnerContext;
    pub use crate::executor::Executor;
    pub use crate::init::init;
    pub use crate::monitor::{ResourceMonitor, ResourceUsage};
    pub use crate::run::Harness;
    pub use crate::types::FetchBenchResult;
    pub use crate::variant::{prompt_variant, Variant};

    /// Re-export of the core model so that a benchmark can depend on the runner alone.
    pub use fetch_bench_core::prelude::*;

    /// Re-export of the reporting types needed to configure a [RunnerContext].
    pub use fetch_bench_instruments::{
        log_file_name, InMemoryReporter, ReportCollector, ReportConfig, Reporter, RunReport,
    };
}

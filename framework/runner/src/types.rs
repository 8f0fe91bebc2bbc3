/// Recommended error type for the benchmark `main` function and any code that drives the harness.
/// Per-request failures are never reported through this type, they are recorded as outcomes.
pub type FetchBenchResult<T> = anyhow::Result<T>;

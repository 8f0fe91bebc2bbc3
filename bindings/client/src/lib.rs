mod error;
mod http_fetcher;

pub mod prelude {
    pub use crate::http_fetcher::HttpFetcherInstrumented as HttpFetcher;

    // Re-exported so that callers do not need to depend on the core crate to choose a client mode.
    pub use fetch_bench_core::prelude::ClientReuse;
}

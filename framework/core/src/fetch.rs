use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Issues one GET request and reports the length of the response body.
///
/// Implementations are shared between every task or worker thread of a run, so they must be
/// cheap to call concurrently. The `index` is only used for error reporting and tracing.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(
        &self,
        index: usize,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<usize, FetchError>> + Send;
}

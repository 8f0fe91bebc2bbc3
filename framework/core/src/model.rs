use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::FetchError;

/// Number of requests issued by a run when nothing else is configured.
pub const DEFAULT_REQUEST_COUNT: usize = 250;

/// Matches the default timeout of the HTTP stacks the benchmark was first written against.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Two unrelated hosts so that the load of a run is shared between them.
pub const DEFAULT_TARGETS: [&str; 2] = ["http://msdn.microsoft.com", "http://www.apple.com/"];

/// How the requests of a run are scheduled.
#[derive(derive_more::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One request at a time, in index order, on the calling thread.
    #[display("sequential")]
    Sequential,
    /// Every request is spawned as a task up front and all of them are awaited.
    #[display("concurrent")]
    Concurrent,
    /// A fixed pool of worker threads pulls request indices until none are left.
    #[display("bounded-parallel")]
    BoundedParallel,
}

/// Whether a run shares one HTTP client between all of its requests.
#[derive(derive_more::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientReuse {
    /// One client, and its connection pool, for the lifetime of the run.
    #[display("shared")]
    Shared,
    /// A fresh client for every request, released when the request completes.
    ///
    /// Kept on purpose: under high request counts this is the variant that grows handles and
    /// memory, and measuring that is the point of selecting it.
    #[display("per-request")]
    PerRequest,
}

#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum RunConfigError {
    #[display("no target URLs configured for a run of {request_count} requests")]
    NoTargets { request_count: usize },
    #[display("invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },
    #[display("the per-request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Everything a run needs to know up front. Not modified once the run has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub request_count: usize,
    pub strategy: Strategy,
    pub client_reuse: ClientReuse,
    pub targets: Vec<String>,
    pub per_request_timeout: Duration,
    /// Worker pool size for [Strategy::BoundedParallel]. Defaults to the available hardware
    /// parallelism. Ignored by the other strategies.
    pub parallelism: Option<NonZeroUsize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            request_count: DEFAULT_REQUEST_COUNT,
            strategy: Strategy::Sequential,
            client_reuse: ClientReuse::PerRequest,
            targets: DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
            per_request_timeout: DEFAULT_TIMEOUT,
            parallelism: None,
        }
    }
}

impl RunConfig {
    pub fn new(request_count: usize, strategy: Strategy, targets: Vec<String>) -> Self {
        Self {
            request_count,
            strategy,
            targets,
            ..Default::default()
        }
    }

    pub fn with_client_reuse(mut self, client_reuse: ClientReuse) -> Self {
        self.client_reuse = client_reuse;
        self
    }

    pub fn with_timeout(mut self, per_request_timeout: Duration) -> Self {
        self.per_request_timeout = per_request_timeout;
        self
    }

    pub fn with_parallelism(mut self, parallelism: NonZeroUsize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Check the configuration before any request is issued. A failure here is fatal to the run.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.per_request_timeout.is_zero() {
            return Err(RunConfigError::ZeroTimeout);
        }

        if self.targets.is_empty() && self.request_count > 0 {
            return Err(RunConfigError::NoTargets {
                request_count: self.request_count,
            });
        }

        for target in &self.targets {
            let parsed = url::Url::parse(target).map_err(|e| RunConfigError::InvalidTarget {
                url: target.clone(),
                reason: e.to_string(),
            })?;

            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(RunConfigError::InvalidTarget {
                    url: target.clone(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }

        Ok(())
    }

    /// Requests are spread over the targets round-robin, keyed by the request index.
    ///
    /// Panics if there are no targets, which [RunConfig::validate] rules out.
    pub fn target_for(&self, index: usize) -> &str {
        &self.targets[index % self.targets.len()]
    }

    /// The number of worker threads a bounded parallel run will use.
    pub fn worker_count(&self) -> usize {
        self.parallelism
            .or_else(|| std::thread::available_parallelism().ok())
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

/// The result of one request. Created once, when the request finishes or is abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub index: usize,
    pub byte_length: usize,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    pub fn from_result(index: usize, result: Result<usize, FetchError>) -> Self {
        match result {
            Ok(byte_length) => Self {
                index,
                byte_length,
                error: None,
            },
            Err(error) => Self {
                index,
                byte_length: 0,
                error: Some(error),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    /// Count of outcomes without an error.
    pub total_processed: usize,
    pub elapsed: Duration,
    /// One outcome per request, ordered by request index.
    pub outcomes: Vec<FetchOutcome>,
}

impl RunResult {
    pub fn new(total_processed: usize, elapsed: Duration, mut outcomes: Vec<FetchOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.index);
        Self {
            total_processed,
            elapsed,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.outcomes.iter().filter_map(|o| o.error.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use pretty_assertions::assert_eq;

    fn two_targets() -> Vec<String> {
        vec!["http://a.test/".to_string(), "http://b.test/".to_string()]
    }

    #[test]
    fn round_robin_over_two_targets() {
        let config = RunConfig::new(10, Strategy::Sequential, two_targets());

        for i in 0..10 {
            let expected = if i % 2 == 0 { "http://a.test/" } else { "http://b.test/" };
            assert_eq!(expected, config.target_for(i));
        }
    }

    #[test]
    fn round_robin_over_single_target() {
        let config = RunConfig::new(3, Strategy::Concurrent, vec!["http://a.test/".to_string()]);
        assert!((0..3).all(|i| config.target_for(i) == "http://a.test/"));
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Ok(()), RunConfig::default().validate());
    }

    #[test]
    fn reject_missing_targets() {
        let config = RunConfig::new(4, Strategy::Sequential, vec![]);
        assert_eq!(
            Err(RunConfigError::NoTargets { request_count: 4 }),
            config.validate()
        );
    }

    #[test]
    fn allow_missing_targets_for_empty_run() {
        let config = RunConfig::new(0, Strategy::Sequential, vec![]);
        assert_eq!(Ok(()), config.validate());
    }

    #[test]
    fn reject_malformed_target() {
        let config = RunConfig::new(1, Strategy::Sequential, vec!["not a url".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(RunConfigError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn reject_non_http_target() {
        let config = RunConfig::new(1, Strategy::Sequential, vec!["ftp://a.test/".to_string()]);
        let err = config.validate().unwrap_err();
        assert_eq!(
            "invalid target URL 'ftp://a.test/': unsupported scheme 'ftp'",
            err.to_string()
        );
    }

    #[test]
    fn reject_zero_timeout() {
        let config =
            RunConfig::new(1, Strategy::Sequential, two_targets()).with_timeout(Duration::ZERO);
        assert_eq!(Err(RunConfigError::ZeroTimeout), config.validate());
    }

    #[test]
    fn explicit_parallelism_is_used() {
        let config = RunConfig::new(1, Strategy::BoundedParallel, two_targets())
            .with_parallelism(NonZeroUsize::new(3).unwrap());
        assert_eq!(3, config.worker_count());
    }

    #[test]
    fn result_orders_outcomes_by_index() {
        let outcomes = vec![
            FetchOutcome::from_result(2, Ok(5)),
            FetchOutcome::from_result(
                0,
                Err(FetchError::new(0, FetchErrorKind::Timeout, "too slow")),
            ),
            FetchOutcome::from_result(1, Ok(7)),
        ];

        let result = RunResult::new(2, Duration::from_millis(1), outcomes);

        assert_eq!(
            vec![0, 1, 2],
            result.outcomes.iter().map(|o| o.index).collect::<Vec<_>>()
        );
        assert_eq!(1, result.failures().count());
        assert_eq!(0, result.outcomes[0].byte_length);
    }
}

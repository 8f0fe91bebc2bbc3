use fetch_bench_core::prelude::{FetchError, FetchErrorKind};
use reqwest::StatusCode;

/// Which part of the request/response cycle an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Connect,
    Send,
    ReadBody,
}

/// Map a reqwest error onto the kind of failure it represents for a fetch.
///
/// A timeout wins over every other classification because the per-request timeout covers the
/// whole cycle, including reading the body.
pub(crate) fn handle_request_err(index: usize, stage: Stage, err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FetchErrorKind::Timeout
    } else if stage == Stage::ReadBody || err.is_body() || err.is_decode() {
        FetchErrorKind::Read
    } else {
        FetchErrorKind::Connection
    };

    FetchError::new(index, kind, format!("{:#}", anyhow::Error::from(err)))
}

pub(crate) fn handle_status(index: usize, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }

    Err(FetchError::new(
        index,
        FetchErrorKind::NonSuccessStatus(status.as_u16()),
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_passes() {
        assert!(handle_status(0, StatusCode::OK).is_ok());
        assert!(handle_status(0, StatusCode::NO_CONTENT).is_ok());
    }

    #[test]
    fn other_status_is_an_error() {
        let err = handle_status(4, StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        assert_eq!(4, err.index);
        assert_eq!(FetchErrorKind::NonSuccessStatus(503), err.kind);
        assert_eq!("Service Unavailable", err.cause);
    }
}

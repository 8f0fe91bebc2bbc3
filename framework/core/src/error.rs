/// What went wrong with a single fetch.
#[derive(derive_more::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// The connection could not be established or the request could not be written.
    #[display("connection error")]
    Connection,
    /// The per-request timeout elapsed before the body was fully read.
    #[display("timeout")]
    Timeout,
    /// The target answered with a status outside of 2xx.
    #[display("non-success status {_0}")]
    NonSuccessStatus(u16),
    /// The response started but the body could not be read.
    #[display("read error")]
    Read,
    /// The run was stopped before this fetch completed.
    #[display("cancelled")]
    Cancelled,
    /// The task running the fetch panicked or was aborted outside of a stop.
    #[display("task failed")]
    TaskFailed,
}

/// A failed fetch. This is never fatal to a run, it is recorded against the request index and
/// excluded from the processed count.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("request {index} failed with {kind}: {cause}")]
pub struct FetchError {
    pub index: usize,
    pub kind: FetchErrorKind,
    #[error(not(source))]
    pub cause: String,
}

impl FetchError {
    pub fn new(index: usize, kind: FetchErrorKind, cause: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            cause: cause.into(),
        }
    }

    pub fn cancelled(index: usize) -> Self {
        Self::new(index, FetchErrorKind::Cancelled, "run was stopped")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_index_kind_and_cause() {
        let err = FetchError::new(3, FetchErrorKind::NonSuccessStatus(503), "Service Unavailable");
        assert_eq!(
            "request 3 failed with non-success status 503: Service Unavailable",
            err.to_string()
        );
    }

    #[test]
    fn cancelled_error() {
        let err = FetchError::cancelled(7);
        assert_eq!(7, err.index);
        assert_eq!(FetchErrorKind::Cancelled, err.kind);
    }
}

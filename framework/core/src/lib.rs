mod error;
mod fetch;
mod model;
mod shutdown;

pub mod prelude {
    pub use crate::error::{FetchError, FetchErrorKind};
    pub use crate::fetch::Fetch;
    pub use crate::model::{
        ClientReuse, FetchOutcome, RunConfig, RunConfigError, RunResult, Strategy, DEFAULT_REQUEST_COUNT,
        DEFAULT_TARGETS, DEFAULT_TIMEOUT,
    };
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}

use std::sync::Arc;
use std::time::Duration;

use fetch_bench_core::prelude::{ClientReuse, Fetch, FetchError};
use fetch_bench_instruments::{report_operation, OperationRecord, Reporter};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::Client;

use crate::error::{handle_request_err, handle_status, Stage};

enum ClientMode {
    Shared(Client),
    PerRequest,
}

/// Fetches a URL and reports every request to the [Reporter].
///
/// With [ClientReuse::Shared] a single client, and its connection pool, is created up front and
/// dropped with the fetcher. With [ClientReuse::PerRequest] a client is built for each fetch and
/// dropped as soon as that fetch completes, whatever the outcome.
pub struct HttpFetcherInstrumented {
    mode: ClientMode,
    reporter: Arc<Reporter>,
}

impl HttpFetcherInstrumented {
    pub fn new(client_reuse: ClientReuse, reporter: Arc<Reporter>) -> anyhow::Result<Self> {
        let mode = match client_reuse {
            ClientReuse::Shared => ClientMode::Shared(build_client()?),
            ClientReuse::PerRequest => ClientMode::PerRequest,
        };

        Ok(Self { mode, reporter })
    }

    pub fn client_reuse(&self) -> ClientReuse {
        match self.mode {
            ClientMode::Shared(_) => ClientReuse::Shared,
            ClientMode::PerRequest => ClientReuse::PerRequest,
        }
    }

    async fn body_length(
        &self,
        index: usize,
        url: &str,
        timeout: Duration,
    ) -> Result<usize, FetchError> {
        match &self.mode {
            ClientMode::Shared(client) => get_body_length(client, index, url, timeout).await,
            ClientMode::PerRequest => {
                let client =
                    build_client().map_err(|e| handle_request_err(index, Stage::Connect, e))?;
                get_body_length(&client, index, url, timeout).await
            }
        }
    }
}

impl Fetch for HttpFetcherInstrumented {
    async fn fetch(&self, index: usize, url: &str, timeout: Duration) -> Result<usize, FetchError> {
        let operation_record = OperationRecord::new(url.to_string(), index);
        let response = self.body_length(index, url, timeout).await;
        if let Err(e) = &response {
            log::debug!("{e}");
        }
        report_operation(&self.reporter, operation_record, &response);
        response
    }
}

/// The client keeps no response cache of its own, the headers ask any cache on the way to do the
/// same so that every fetch measures a live response.
fn build_client() -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    Client::builder().default_headers(headers).build()
}

async fn get_body_length(
    client: &Client,
    index: usize,
    url: &str,
    timeout: Duration,
) -> Result<usize, FetchError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| handle_request_err(index, Stage::Send, e))?;

    handle_status(index, response.status())?;

    let body = response
        .bytes()
        .await
        .map_err(|e| handle_request_err(index, Stage::ReadBody, e))?;

    Ok(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetch_bench_core::prelude::FetchErrorKind;
    use fetch_bench_instruments::{InMemoryReporter, ReportConfig};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reporter() -> (Arc<Reporter>, InMemoryReporter) {
        let in_memory = InMemoryReporter::new();
        let reporter = ReportConfig::default()
            .with_collector(in_memory.clone())
            .init()
            .unwrap();
        (Arc::new(reporter), in_memory)
    }

    async fn serve_body(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/values"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn shared_client_returns_body_length() {
        let server = serve_body("0123456789").await;
        let (reporter, in_memory) = reporter();
        let fetcher = HttpFetcherInstrumented::new(ClientReuse::Shared, reporter).unwrap();
        let url = format!("{}/values", server.uri());

        for index in 0..3 {
            let length = fetcher
                .fetch(index, &url, Duration::from_secs(5))
                .await
                .unwrap();
            assert_eq!(10, length);
        }

        let operations = in_memory.operations();
        assert_eq!(3, operations.len());
        assert!(operations.iter().all(|op| op.operation_id == url));
        assert_eq!(vec![0, 1, 2], operations.iter().map(|op| op.index).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn per_request_client_returns_body_length() {
        let server = serve_body("01234567890123456789").await;
        let (reporter, _) = reporter();
        let fetcher = HttpFetcherInstrumented::new(ClientReuse::PerRequest, reporter).unwrap();
        assert_eq!(ClientReuse::PerRequest, fetcher.client_reuse());

        let length = fetcher
            .fetch(0, &format!("{}/values", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(20, length);
    }

    #[tokio::test]
    async fn requests_bypass_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("cache-control", "no-cache"))
            .and(header("pragma", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
            .expect(2)
            .mount(&server)
            .await;

        let (reporter, _) = reporter();
        for client_reuse in [ClientReuse::Shared, ClientReuse::PerRequest] {
            let fetcher = HttpFetcherInstrumented::new(client_reuse, reporter.clone()).unwrap();
            let length = fetcher
                .fetch(0, &server.uri(), Duration::from_secs(5))
                .await
                .unwrap();
            assert_eq!(5, length);
        }
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let (reporter, in_memory) = reporter();
        let fetcher = HttpFetcherInstrumented::new(ClientReuse::Shared, reporter).unwrap();

        let err = fetcher
            .fetch(6, &server.uri(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(6, err.index);
        assert_eq!(FetchErrorKind::NonSuccessStatus(404), err.kind);
        assert!(in_memory.operations()[0].is_error());
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let (reporter, _) = reporter();
        let fetcher = HttpFetcherInstrumented::new(ClientReuse::Shared, reporter).unwrap();

        let err = fetcher
            .fetch(1, &server.uri(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(FetchErrorKind::Timeout, err.kind);
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (reporter, _) = reporter();
        let fetcher = HttpFetcherInstrumented::new(ClientReuse::PerRequest, reporter).unwrap();

        let err = fetcher
            .fetch(2, &format!("http://{addr}/"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(2, err.index);
        assert_eq!(FetchErrorKind::Connection, err.kind);
    }
}

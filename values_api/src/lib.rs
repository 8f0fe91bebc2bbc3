use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;

/// The body served by `GET /api/values`.
pub const VALUES: [&str; 2] = ["value1", "value2"];

/// How long `GET /api/values` waits before answering when no delay is configured.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

pub fn router(delay: Duration) -> Router {
    Router::new()
        .route("/api/values", get(get_values))
        .with_state(delay)
}

/// Serve the router until the listener fails.
pub async fn serve(listener: TcpListener, delay: Duration) -> std::io::Result<()> {
    axum::serve(listener, router(delay)).await
}

async fn get_values(State(delay): State<Duration>) -> Json<[&'static str; 2]> {
    tokio::time::sleep(delay).await;

    Json(VALUES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Instant;
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn values_are_returned_as_json() {
        let (status, body) = get(router(Duration::ZERO), "/api/values").await;

        assert_eq!(StatusCode::OK, status);
        assert_eq!(br#"["value1","value2"]"#.to_vec(), body);
        let values: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(VALUES.to_vec(), values);
    }

    #[tokio::test]
    async fn response_is_delayed() {
        let started = Instant::now();
        let (status, _) = get(router(Duration::from_millis(50)), "/api/values").await;

        assert_eq!(StatusCode::OK, status);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _) = get(router(Duration::ZERO), "/api/other").await;
        assert_eq!(StatusCode::NOT_FOUND, status);
    }
}

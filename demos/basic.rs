//! Minimal weave example: request ids plus a header audit record around a
//! health endpoint.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:8080/health
//!   curl -i -H 'X-Correlation-ID: test-correlation' http://localhost:8080/health
//!   curl -i -H 'X-Request-ID: my-own-id' http://localhost:8080/health

use http::StatusCode;
use tracing_subscriber::EnvFilter;
use weave::middleware::{AuditConfig, AuditLayer, RequestIdLayer};
use weave::{Request, Response, Router, Server};

#[tokio::main]
async fn main() -> Result<(), weave::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // RequestIdLayer goes first so the audit record sees X-Request-ID too.
    let app = Router::new()
        .layer(RequestIdLayer::new())
        .layer(AuditLayer::new(
            AuditConfig::default()
                .with_headers(["X-Request-ID", "X-Correlation-ID", "User-Agent"])
                .with_message("API Request"),
        ))
        .handler(mux);

    Server::bind("0.0.0.0:8080")?.serve(app).await
}

// The terminal handler is the application's own dispatcher; weave does not
// route.
async fn mux(req: Request) -> Response {
    match req.path() {
        "/health" => Response::json(r#"{"status":"healthy"}"#),
        _ => Response::status(StatusCode::NOT_FOUND),
    }
}

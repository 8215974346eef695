//! Full chain with a custom audit logger.
//!
//! Audit records go through a `Logger` that tags them `[AUDIT]` and writes
//! to a dedicated `audit` tracing target; access and panic logs use the
//! regular subscriber. A stand-in for authentication copies `X-User` into
//! the context under `user_id_key()` so audit records name the caller.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example custom
//!
//! Try:
//!   curl -i -H 'X-Correlation-ID: test-correlation' http://localhost:8080/status
//!   curl -i -H 'X-User: alice' http://localhost:8080/status
//!   curl -i http://localhost:8080/boom        # 500, panic payload only in the log

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use http::StatusCode;
use tracing::info;
use tracing_subscriber::EnvFilter;
use weave::middleware::{AccessLogLayer, AuditConfig, AuditLayer, RecoverLayer, RequestIdLayer};
use weave::handler::boxed;
use weave::{BoxedHandler, Context, ErasedHandler, Logger, Request, Response, Router, Server, request_id_key, user_id_key};

/// Prefixes every audit message and logs under the `audit` target.
struct AuditTrail;

impl Logger for AuditTrail {
    fn log(&self, ctx: &Context, message: &str, attrs: &[(String, String)]) {
        let request_id = ctx.value(request_id_key()).map(|id| id.as_str()).unwrap_or("-");
        let user = ctx.value(user_id_key()).map(String::as_str).unwrap_or("anonymous");
        info!(target: "audit", request_id, user, ?attrs, "[AUDIT] {message}");
    }
}

/// Trusts `X-User` as the caller's identity. A real service would verify a
/// credential here.
fn resolve_user(next: BoxedHandler) -> BoxedHandler {
    boxed(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let user = req.header_lossy("X-User").filter(|u| !u.is_empty()).map(Cow::into_owned);
            let req = match user {
                Some(user) => req.with_value(user_id_key(), user),
                None => req,
            };
            next.call(req).await
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), weave::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app = Router::new()
        .layer(RecoverLayer)
        .layer(RequestIdLayer::new())
        .layer(AccessLogLayer)
        .layer(resolve_user)
        .layer(AuditLayer::new(
            AuditConfig::default()
                .with_headers(["X-Request-ID", "X-Correlation-ID", "Authorization", "User-Agent"])
                .with_logger(AuditTrail)
                .with_message("Service call"),
        ))
        .handler(mux);

    info!("test with: curl -H 'X-Correlation-ID: test-correlation' http://localhost:8080/status");
    Server::bind("0.0.0.0:8080")?.serve(app).await
}

async fn mux(req: Request) -> Response {
    match req.path() {
        "/status" => status(),
        "/boom" => panic!("boom requested"),
        _ => Response::status(StatusCode::NOT_FOUND),
    }
}

fn status() -> Response {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Response::json(format!(
        r#"{{"status":"operational","timestamp":{timestamp},"version":"{}"}}"#,
        env!("CARGO_PKG_VERSION"),
    ))
}

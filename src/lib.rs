//! # weave
//!
//! Minimal HTTP middleware composition for Rust services.
//!
//! weave wraps one terminal handler in an ordered chain of cross-cutting
//! behaviour and nothing else. Path routing belongs to the handler you plug
//! in; TLS, timeouts and connection limits belong to the proxy in front.
//!
//! What ships in the box:
//!
//! - [`Router`]: an append-only middleware list composed around a terminal
//!   handler on every dispatch. First registered runs first.
//! - [`Context`]: an immutable, typed, per-request key/value stack.
//! - [`middleware`]: request ids, header audit records, access logs, and
//!   panic recovery.
//! - [`Server`]: a hyper host with graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use weave::{Request, Response, Router, Server};
//! use weave::middleware::{AccessLogLayer, AuditConfig, AuditLayer, RecoverLayer, RequestIdLayer};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), weave::Error> {
//!     let app = Router::new()
//!         .layer(RecoverLayer)
//!         .layer(RequestIdLayer::new())
//!         .layer(AccessLogLayer)
//!         .layer(AuditLayer::new(AuditConfig::default().with_headers(["X-Correlation-ID"])))
//!         .handler(app);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn app(req: Request) -> Response {
//!     match req.path() {
//!         "/health" => Response::json(r#"{"status":"healthy"}"#),
//!         _ => Response::status(StatusCode::NOT_FOUND),
//!     }
//! }
//! ```

mod context;
mod error;
mod request;
mod response;
mod router;
mod server;

pub mod handler;
pub mod id;
pub mod log;
pub mod middleware;

#[cfg(test)]
mod test_support;

pub use context::{Context, ContextKey, request_id_key, user_id_key};
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, Middleware};
pub use id::RequestId;
pub use log::{Logger, TracingLogger};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;

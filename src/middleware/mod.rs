//! Built-in middleware.
//!
//! Each layer implements [`Middleware`](crate::Middleware) and is registered
//! with [`Router::layer`](crate::Router::layer). The first layer registered
//! runs first on the way in and last on the way out, so a typical chain is:
//!
//! ```rust
//! use weave::Router;
//! use weave::middleware::{AccessLogLayer, AuditConfig, AuditLayer, RecoverLayer, RequestIdLayer};
//!
//! let router = Router::new()
//!     .layer(RecoverLayer)        // outermost: contains panics from everything below
//!     .layer(RequestIdLayer::new())
//!     .layer(AccessLogLayer)      // needs the request id
//!     .layer(AuditLayer::new(AuditConfig::default().with_headers(["X-Request-ID"])));
//! ```
//!
//! - [`RequestIdLayer`]: assign or reuse `X-Request-ID`, publish it in context
//! - [`AuditLayer`]: one structured record of allow-listed headers
//! - [`AccessLogLayer`]: start / completion lines with status and latency
//! - [`RecoverLayer`]: panic → `500 Internal Server Error`

mod access_log;
mod audit;
mod recover;
mod request_id;

pub use access_log::AccessLogLayer;
pub use audit::{AuditConfig, AuditLayer, DEFAULT_AUDIT_MESSAGE};
pub use recover::RecoverLayer;
pub use request_id::{RequestIdConfig, RequestIdLayer, X_REQUEST_ID};

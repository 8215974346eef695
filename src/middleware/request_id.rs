//! Request identifier middleware.
//!
//! Reuses a non-empty inbound `X-Request-ID` verbatim or mints a new one,
//! then stamps it on the inbound request headers, the outbound response
//! headers, and a fresh context layer. It never fails a request.

use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use tracing::debug;

use crate::context::{ContextKey, request_id_key};
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Middleware};
use crate::id::{self, RequestId};
use crate::request::Request;
use super::recover::PanicResponse;

/// Default correlation header. Header names compare case-insensitively.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Settings for [`RequestIdLayer`].
#[derive(Clone, Debug)]
pub struct RequestIdConfig {
    /// Header read from the request and written to both request and response.
    pub header_name: HeaderName,
    /// Context key the id is published under.
    pub key: ContextKey<RequestId>,
}

impl RequestIdConfig {
    pub fn with_header_name(mut self, name: HeaderName) -> Self {
        self.header_name = name;
        self
    }

    pub fn with_key(mut self, key: ContextKey<RequestId>) -> Self {
        self.key = key;
        self
    }
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self { header_name: X_REQUEST_ID, key: request_id_key() }
    }
}

/// Assigns every request an identifier.
///
/// ```rust
/// use weave::Router;
/// use weave::middleware::{RequestIdConfig, RequestIdLayer};
/// use http::HeaderName;
///
/// let router = Router::new()
///     .layer(RequestIdLayer::new())
///     .layer(RequestIdLayer::with_config(
///         RequestIdConfig::default().with_header_name(HeaderName::from_static("x-trace-id")),
///     ));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestIdLayer {
    config: Arc<RequestIdConfig>,
}

impl RequestIdLayer {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: RequestIdConfig) -> Self {
        Self { config: Arc::new(config) }
    }
}

impl Middleware for RequestIdLayer {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RequestIdHandler { config: Arc::clone(&self.config), next })
    }
}

struct RequestIdHandler {
    config: Arc<RequestIdConfig>,
    next: BoxedHandler,
}

impl ErasedHandler for RequestIdHandler {
    fn call(&self, mut req: Request) -> BoxFuture {
        let header_name = self.config.header_name.clone();

        // Any non-empty value is reused byte for byte, including obs-text.
        let inbound = req.headers().get(&header_name).filter(|v| !v.is_empty()).cloned();

        let (id, value) = match inbound {
            Some(value) => (String::from_utf8_lossy(value.as_bytes()).into_owned(), Some(value)),
            None => {
                let id = id::generate_or_fallback();
                debug!(request_id = %id, "assigned request id");
                let value = HeaderValue::from_str(&id).ok();
                (id, value)
            }
        };

        if let Some(value) = &value {
            if let Some(slot) = PanicResponse::current(req.context()) {
                slot.insert_header(header_name.clone(), value.clone());
            }
            req.headers_mut().insert(header_name.clone(), value.clone());
        }
        let req = req.with_value(self.config.key, RequestId::new(id));

        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let mut res = next.call(req).await;
            if let Some(value) = value {
                res.headers_mut().insert(header_name, value);
            }
            res
        })
    }
}

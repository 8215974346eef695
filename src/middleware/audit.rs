//! Header audit middleware.
//!
//! Emits exactly one structured record per request carrying the values of an
//! allow-list of headers, then calls the next handler unconditionally.
//!
//! ```rust
//! use weave::Router;
//! use weave::middleware::{AuditConfig, AuditLayer, RequestIdLayer};
//!
//! let router = Router::new()
//!     .layer(RequestIdLayer::new())
//!     .layer(AuditLayer::new(
//!         AuditConfig::default()
//!             .with_headers(["X-Request-ID", "Consumer"])
//!             .with_message("Incoming API request"),
//!     ));
//! ```
//!
//! Registration order matters: the layer only sees headers that outer layers
//! have already set, so put [`RequestIdLayer`](super::RequestIdLayer) first
//! when the request id should be audited.

use std::fmt;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Middleware};
use crate::log::{Logger, TracingLogger};
use crate::request::Request;

pub const DEFAULT_AUDIT_MESSAGE: &str = "Request headers";

/// Settings for [`AuditLayer`].
#[derive(Clone)]
pub struct AuditConfig {
    /// Headers to capture, in output order. Matched case-insensitively; the
    /// name is logged as written here.
    pub headers: Vec<String>,
    pub logger: Arc<dyn Logger>,
    pub message: String,
}

impl AuditConfig {
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_logger(mut self, logger: impl Logger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            logger: Arc::new(TracingLogger),
            message: DEFAULT_AUDIT_MESSAGE.to_owned(),
        }
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("headers", &self.headers)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Logs an allow-list of request headers.
#[derive(Clone, Debug, Default)]
pub struct AuditLayer {
    config: Arc<AuditConfig>,
}

impl AuditLayer {
    pub fn new(config: AuditConfig) -> Self {
        Self { config: Arc::new(config) }
    }
}

impl Middleware for AuditLayer {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(AuditHandler { config: Arc::clone(&self.config), next })
    }
}

struct AuditHandler {
    config: Arc<AuditConfig>,
    next: BoxedHandler,
}

impl ErasedHandler for AuditHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let attrs = collect_headers(&req, &self.config.headers);
        self.config.logger.log(req.context(), &self.config.message, &attrs);
        self.next.call(req)
    }
}

/// Present, non-empty allow-listed headers as `(name, value)` pairs.
fn collect_headers(req: &Request, names: &[String]) -> Vec<(String, String)> {
    names
        .iter()
        .filter_map(|name| {
            req.header_lossy(name)
                .filter(|value| !value.is_empty())
                .map(|value| (name.clone(), value.into_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::StatusCode;
    use proptest::prelude::*;

    use super::*;
    use crate::context::Context;
    use crate::handler::boxed;
    use crate::test_support::{capture_logs, get, get_with_header};

    type Record = (String, Vec<(String, String)>);

    /// Logger that keeps every record for inspection.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Record>>>);

    impl Recorder {
        fn records(&self) -> Vec<Record> { self.0.lock().unwrap().clone() }
    }

    impl Logger for Recorder {
        fn log(&self, _ctx: &Context, message: &str, attrs: &[(String, String)]) {
            self.0.lock().unwrap().push((message.to_owned(), attrs.to_vec()));
        }
    }

    fn ok() -> BoxedHandler {
        boxed(|_req: Request| async { StatusCode::OK })
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[tokio::test]
    async fn logs_configured_header_with_default_message() {
        let recorder = Recorder::default();
        let handler = AuditLayer::new(
            AuditConfig::default()
                .with_headers(["X-Correlation-ID"])
                .with_logger(recorder.clone()),
        )
        .wrap(ok());

        let res = handler.call(get_with_header("/", "X-Correlation-ID", "test-correlation")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(
            recorder.records(),
            vec![("Request headers".to_owned(), pairs(&[("X-Correlation-ID", "test-correlation")]))]
        );
    }

    #[tokio::test]
    async fn custom_message() {
        let recorder = Recorder::default();
        let handler = AuditLayer::new(
            AuditConfig::default()
                .with_message("Custom log message")
                .with_logger(recorder.clone()),
        )
        .wrap(ok());

        handler.call(get("/")).await;

        assert_eq!(recorder.records(), vec![("Custom log message".to_owned(), Vec::new())]);
    }

    #[tokio::test]
    async fn multiple_headers_keep_configured_order() {
        let recorder = Recorder::default();
        let handler = AuditLayer::new(
            AuditConfig::default()
                .with_headers(["X-Test-Header-2", "X-Test-Header-1", "X-Missing"])
                .with_logger(recorder.clone()),
        )
        .wrap(ok());

        let req = Request::from(
            http::Request::get("/")
                .header("x-test-header-1", "value1")
                .header("x-test-header-2", "value2")
                .body("")
                .unwrap(),
        );
        handler.call(req).await;

        let (_, attrs) = recorder.records().remove(0);
        assert_eq!(attrs, pairs(&[("X-Test-Header-2", "value2"), ("X-Test-Header-1", "value1")]));
    }

    #[tokio::test]
    async fn empty_values_are_skipped() {
        let recorder = Recorder::default();
        let handler = AuditLayer::new(
            AuditConfig::default()
                .with_headers(["Consumer"])
                .with_logger(recorder.clone()),
        )
        .wrap(ok());

        handler.call(get_with_header("/", "Consumer", "")).await;

        assert_eq!(recorder.records(), vec![("Request headers".to_owned(), Vec::new())]);
    }

    #[tokio::test]
    async fn default_logger_goes_through_tracing() {
        let (logs, _guard) = capture_logs();
        let handler = AuditLayer::new(AuditConfig::default().with_headers(["User-Agent"])).wrap(ok());

        handler.call(get_with_header("/", "user-agent", "curl/8.4")).await;

        let lines = logs.lines();
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("Request headers"));
        assert!(lines[0].contains(r#"User-Agent="curl/8.4""#));
    }

    #[tokio::test]
    async fn non_ascii_values_are_recorded() {
        let recorder = Recorder::default();
        let handler = AuditLayer::new(
            AuditConfig::default()
                .with_headers(["X-Request-ID", "X-User"])
                .with_logger(recorder.clone()),
        )
        .wrap(ok());
        let mut req = get_with_header("/", "X-Request-ID", "rid-5");
        req.headers_mut()
            .insert("x-user", http::HeaderValue::from_bytes("José".as_bytes()).unwrap());

        handler.call(req).await;

        let (_, attrs) = recorder.records().remove(0);
        assert_eq!(attrs, pairs(&[("X-Request-ID", "rid-5"), ("X-User", "José")]));
    }

    proptest! {
        #[test]
        fn record_holds_exactly_the_present_allow_listed_headers(
            present in proptest::collection::vec(any::<bool>(), 1..6),
            extra in "[a-z]{1,8}",
        ) {
            let names: Vec<String> = (0..present.len()).map(|i| format!("X-Audit-{i}")).collect();
            let mut builder = http::Request::get("/").header("x-not-listed", extra.as_str());
            let mut expected = Vec::new();
            for (name, on) in names.iter().zip(&present) {
                if *on {
                    let value = format!("v-{name}");
                    builder = builder.header(name.as_str(), value.as_str());
                    expected.push((name.clone(), value));
                }
            }
            let req = Request::from(builder.body("").unwrap());

            let recorder = Recorder::default();
            let handler = AuditLayer::new(
                AuditConfig::default()
                    .with_headers(names.clone())
                    .with_logger(recorder.clone()),
            )
            .wrap(ok());

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(handler.call(req));

            let records = recorder.records();
            prop_assert_eq!(records.len(), 1);
            prop_assert_eq!(&records[0].1, &expected);
        }
    }
}

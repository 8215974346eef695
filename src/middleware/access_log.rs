//! Access log middleware: one line when a request starts, one when it
//! completes with status and latency.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::context::request_id_key;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Middleware};
use crate::request::Request;

/// Logs request start and completion through `tracing`.
///
/// Requires [`RequestIdLayer`](super::RequestIdLayer) to run earlier in the
/// chain. A request that reaches this layer without an id in its context
/// panics: that is a wiring bug, and [`RecoverLayer`](super::RecoverLayer)
/// turns it into a 500 if installed outermost.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessLogLayer;

impl AccessLogLayer {
    pub fn new() -> Self { Self }
}

impl Middleware for AccessLogLayer {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(AccessLogHandler { next })
    }
}

struct AccessLogHandler {
    next: BoxedHandler,
}

impl ErasedHandler for AccessLogHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let start = Instant::now();
        let request_id = req
            .context()
            .value(request_id_key())
            .cloned()
            .unwrap_or_else(|| panic!("access log: no request id in context, install RequestIdLayer before AccessLogLayer"));
        let method = req.method().clone();
        let path = req.path().to_owned();

        info!(request_id = %request_id, method = %method, path = %path, "starting request");

        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let res = next.call(req).await;
            info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = res.status_code().as_u16(),
                duration = ?start.elapsed(),
                "completed request"
            );
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;

    use futures_util::FutureExt;
    use http::StatusCode;

    use super::*;
    use crate::handler::boxed;
    use crate::id::RequestId;
    use crate::test_support::{capture_logs, get};

    fn with_id(req: Request, id: &str) -> Request {
        req.with_value(request_id_key(), RequestId::new(id))
    }

    #[tokio::test]
    async fn logs_start_and_completion() {
        let (logs, _guard) = capture_logs();
        let handler = AccessLogLayer.wrap(boxed(|_req: Request| async { StatusCode::OK }));

        let res = handler.call(with_id(get("/health"), "test-request-id")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        let lines = logs.lines();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[0].contains("starting request"));
        assert!(lines[0].contains("test-request-id"));
        assert!(lines[0].contains("GET"));
        assert!(lines[0].contains("/health"));
        assert!(lines[1].contains("completed request"));
        assert!(lines[1].contains("status=200"));
        assert!(lines[1].contains("duration="));
    }

    #[tokio::test]
    async fn completion_line_reports_handler_status() {
        let (logs, _guard) = capture_logs();
        let handler = AccessLogLayer.wrap(boxed(|_req: Request| async { StatusCode::NOT_FOUND }));

        let res = handler.call(with_id(get("/missing"), "rid")).await;

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        let lines = logs.lines();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[1].contains("status=404"));
    }

    #[tokio::test]
    async fn default_status_is_ok() {
        let (logs, _guard) = capture_logs();
        let handler = AccessLogLayer.wrap(boxed(|_req: Request| async { "body only" }));

        handler.call(with_id(get("/"), "rid")).await;

        assert!(logs.lines()[1].contains("status=200"));
    }

    #[tokio::test]
    async fn missing_request_id_panics() {
        let handler = AccessLogLayer.wrap(boxed(|_req: Request| async { StatusCode::OK }));

        let outcome = AssertUnwindSafe(async move { handler.call(get("/")).await })
            .catch_unwind()
            .await;

        assert!(outcome.is_err());
    }
}

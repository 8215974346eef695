//! Panic recovery middleware.
//!
//! The single containment boundary for panics. Everything the next handler
//! does, both while building its future and while that future is polled,
//! runs under `catch_unwind`. A panic becomes a plain-text
//! `500 Internal Server Error`; the payload goes to the log, never to the
//! client.
//!
//! Install it first (outermost) to protect the whole chain. Before calling
//! the next handler it pushes a `PanicResponse` slot into the context.
//! Layers further in record the response headers they promised there (the
//! request id layer does), and a panic's 500 carries them even though the
//! unwind skipped the code that would have set them. The log line uses the
//! request id from the context this layer receives, or `unknown`, so an
//! outermost recover logs `unknown` while its 500 still echoes the id header.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tracing::error;

use crate::context::{Context, ContextKey, request_id_key};
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Middleware};
use crate::request::Request;
use crate::response::Response;

const UNKNOWN_REQUEST_ID: &str = "unknown";

/// Response headers gathered on the way in, applied to the 500 when the
/// inner chain unwinds instead of returning.
#[derive(Debug, Default)]
pub(crate) struct PanicResponse {
    headers: Mutex<HeaderMap>,
}

impl PanicResponse {
    /// Finds the slot of the nearest enclosing [`RecoverLayer`], if any.
    pub(crate) fn current(ctx: &Context) -> Option<&Arc<PanicResponse>> {
        ctx.value(panic_response_key())
    }

    /// Records a header the response would have carried.
    pub(crate) fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().insert(name, value);
    }

    fn take(&self) -> HeaderMap { std::mem::take(&mut *self.lock()) }

    // Nothing panics while holding the lock, so a poisoned guard is still sound.
    fn lock(&self) -> MutexGuard<'_, HeaderMap> {
        self.headers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_response_key() -> ContextKey<Arc<PanicResponse>> {
    static KEY: LazyLock<ContextKey<Arc<PanicResponse>>> = LazyLock::new(|| ContextKey::new("panic_response"));
    *KEY
}

/// Converts panics in downstream handlers into `500` responses.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecoverLayer;

impl RecoverLayer {
    pub fn new() -> Self { Self }
}

impl Middleware for RecoverLayer {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RecoverHandler { next })
    }
}

struct RecoverHandler {
    next: BoxedHandler,
}

impl ErasedHandler for RecoverHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let request_id = req
            .context()
            .value(request_id_key())
            .map(|id| id.as_str().to_owned())
            .unwrap_or_else(|| UNKNOWN_REQUEST_ID.to_owned());
        let slot = Arc::new(PanicResponse::default());
        let req = req.with_value(panic_response_key(), Arc::clone(&slot));

        let next = Arc::clone(&self.next);
        Box::pin(async move {
            // `next.call` sits inside the async block so a panic while the
            // handler builds its future is caught as well.
            let outcome = AssertUnwindSafe(async move { next.call(req).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(res) => res,
                Err(payload) => {
                    error!(request_id = %request_id, panic = %panic_message(payload.as_ref()), "recovered from panic");

                    let mut res = internal_server_error();
                    res.headers_mut().extend(slot.take());
                    res
                }
            }
        })
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .text("Internal Server Error")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

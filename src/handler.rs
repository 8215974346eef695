//! Handler and middleware traits, and type erasure.
//!
//! # How handlers are stored
//!
//! A middleware chain mixes handlers of many concrete types: the user's
//! terminal `async fn`, and one wrapper per registered middleware. They are
//! all hidden behind one trait object, [`BoxedHandler`], so any layer can
//! hold "the next thing to call" without knowing what it is.
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.handler(hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← BoxedHandler
//!        ↓ middleware.wrap(next)                   ← once per layer, per dispatch
//! Arc::new(SomeLayerHandler { next, … })           ← BoxedHandler again
//!        ↓
//! handler.call(req)                                ← one vtable dispatch per layer
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Erased types ──────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` lets tokio move the future across worker threads. The
/// future owns everything it needs, so the handler that produced it may be
/// dropped before it is polled.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// The object-safe calling interface every handler ends up behind.
///
/// Middleware authors implement this for the wrapper they return from
/// [`Middleware::wrap`]; terminal handlers get it for free via [`Handler`].
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Handler ───────────────────────────────────────────────────────────────────

/// Implemented for every valid terminal handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed so only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Erases a handler. Handy inside closure middleware:
///
/// ```rust
/// use weave::{BoxedHandler, Request, Router, handler};
///
/// let router = Router::new().layer(|next: BoxedHandler| {
///     handler::boxed(move |req: Request| {
///         let next = next.clone();
///         async move { next.call(req).await }
///     })
/// });
/// ```
pub fn boxed(handler: impl Handler) -> BoxedHandler {
    handler.into_boxed_handler()
}

/// Newtype bridging a concrete `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// A handler transformer: takes the next handler, returns a wrapped one.
///
/// Implemented for plain closures of shape `Fn(BoxedHandler) -> BoxedHandler`
/// and for the built-in layers in [`crate::middleware`].
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// A registered middleware, as stored by the [`Router`](crate::Router).
pub type BoxedMiddleware = Arc<dyn Middleware>;

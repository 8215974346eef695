//! Middleware chain composer.
//!
//! A [`Router`] holds an append-only list of middleware and one terminal
//! handler. It does not match paths: the terminal handler is whatever
//! dispatcher the application supplies. On every dispatch the chain is
//! rebuilt from the current list, wrapping the terminal handler from the
//! last-registered middleware outward to the first.

use std::sync::Arc;

use http::StatusCode;

use crate::handler::{BoxFuture, BoxedHandler, BoxedMiddleware, Handler, Middleware};
use crate::request::Request;
use crate::response::Response;

/// The application entry point: middleware chain plus terminal handler.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// `layer` and `handler` return `self` so setup chains naturally; the
/// `push` / `set_handler` variants work through `&mut` for code that builds
/// the router incrementally. Mutating a router that is concurrently
/// dispatching needs external synchronisation.
#[derive(Clone, Default)]
pub struct Router {
    middlewares: Vec<BoxedMiddleware>,
    handler: Option<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self { Self::default() }

    /// Appends a middleware. The first one registered runs outermost.
    ///
    /// ```rust
    /// use weave::{Request, Router};
    /// use weave::middleware::{RecoverLayer, RequestIdLayer};
    ///
    /// async fn app(_req: Request) -> &'static str { "ok" }
    ///
    /// Router::new()
    ///     .layer(RecoverLayer)
    ///     .layer(RequestIdLayer::new())
    ///     .handler(app);
    /// ```
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.push(middleware);
        self
    }

    /// Sets or replaces the terminal handler.
    pub fn handler(mut self, handler: impl Handler) -> Self {
        self.set_handler(handler);
        self
    }

    pub fn push(&mut self, middleware: impl Middleware) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn set_handler(&mut self, handler: impl Handler) {
        self.handler = Some(handler.into_boxed_handler());
    }

    pub fn len(&self) -> usize { self.middlewares.len() }

    pub fn is_empty(&self) -> bool { self.middlewares.is_empty() }

    /// Builds the full chain around the terminal handler.
    ///
    /// Without a terminal handler every request gets `404 Not Found`.
    pub fn compose(&self) -> BoxedHandler {
        let terminal = self
            .handler
            .clone()
            .unwrap_or_else(|| not_found.into_boxed_handler());

        self.middlewares
            .iter()
            .rev()
            .fold(terminal, |next, middleware| middleware.wrap(next))
    }

    /// Runs one request through a freshly composed chain.
    pub fn dispatch(&self, req: Request) -> BoxFuture {
        self.compose().call(req)
    }
}

async fn not_found(_req: Request) -> Response {
    Response::status(StatusCode::NOT_FOUND)
}

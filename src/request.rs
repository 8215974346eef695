//! Incoming HTTP request type.

use std::borrow::Cow;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::context::{Context, ContextKey};

/// An incoming HTTP request with its body fully buffered and a
/// request-scoped [`Context`].
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    context: Context,
}

impl Request {
    /// Builds a request from `http` parts and an already-collected body.
    /// The context starts empty.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            context: Context::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn context(&self) -> &Context { &self.context }

    /// Case-insensitive header lookup.
    ///
    /// Returns `None` for absent headers, invalid header names, and values
    /// that are not visible ASCII. See [`header_lossy`](Self::header_lossy)
    /// for values carrying obs-text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Case-insensitive header lookup that accepts any value bytes.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    pub fn header_lossy(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers.get(name).map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    /// Replaces the context. Pair with [`Context::with_value`] to push a layer.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Pushes one context layer holding `value` under `key`.
    pub fn with_value<T>(self, key: ContextKey<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let context = self.context.with_value(key, value);
        self.with_context(context)
    }
}

impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body.into())
    }
}

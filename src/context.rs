//! Request-scoped context.
//!
//! A [`Context`] is an immutable stack of key/value layers that rides along
//! with a [`Request`](crate::Request) through the middleware chain. Adding a
//! value never mutates an existing context: [`Context::with_value`] returns a
//! new context whose newest layer holds the value and whose tail is shared
//! with the original. Upstream code that kept the old context keeps seeing
//! exactly what it saw before.
//!
//! Keys are typed tokens, not strings:
//!
//! ```rust
//! use weave::{Context, ContextKey};
//!
//! let tenant: ContextKey<String> = ContextKey::new("tenant");
//! let ctx = Context::new().with_value(tenant, "acme".to_owned());
//!
//! assert_eq!(ctx.value(tenant).map(String::as_str), Some("acme"));
//! ```
//!
//! Every call to [`ContextKey::new`] mints a fresh token, so two libraries that
//! both pick the name `"tenant"` still cannot read each other's values.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use crate::id::RequestId;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

// ── ContextKey ────────────────────────────────────────────────────────────────

/// A process-unique key for values of type `T`.
///
/// The name is only used for debug output; identity comes from a counter.
pub struct ContextKey<T> {
    id: u64,
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            name,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str { self.name }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for ContextKey<T> {}

impl<T> PartialEq for ContextKey<T> {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl<T> Eq for ContextKey<T> {}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey({}#{})", self.name, self.id)
    }
}

/// The well-known key the request id middleware publishes under.
pub fn request_id_key() -> ContextKey<RequestId> {
    static KEY: LazyLock<ContextKey<RequestId>> = LazyLock::new(|| ContextKey::new("request_id"));
    *KEY
}

/// The well-known key for the caller's user id.
///
/// No built-in layer writes it; authentication middleware owned by the
/// application publishes the resolved id here so loggers can read it.
pub fn user_id_key() -> ContextKey<String> {
    static KEY: LazyLock<ContextKey<String>> = LazyLock::new(|| ContextKey::new("user_id"));
    *KEY
}

// ── Context ───────────────────────────────────────────────────────────────────

struct Layer {
    key: u64,
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Layer>>,
}

/// Immutable per-request key/value association.
///
/// Cloning is one `Arc` increment.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Layer>>,
}

impl Context {
    pub fn new() -> Self { Self::default() }

    /// Returns a new context with `value` stored under `key` on top.
    ///
    /// A later layer shadows an earlier one with the same key.
    pub fn with_value<T>(&self, key: ContextKey<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let layer = Layer {
            key: key.id,
            name: key.name,
            value: Box::new(value),
            parent: self.head.clone(),
        };
        Self { head: Some(Arc::new(layer)) }
    }

    /// Looks up the newest value stored under `key`.
    pub fn value<T: 'static>(&self, key: ContextKey<T>) -> Option<&T> {
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            if current.key == key.id {
                return current.value.downcast_ref::<T>();
            }
            layer = current.parent.as_deref();
        }
        None
    }

    pub fn is_empty(&self) -> bool { self.head.is_none() }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        let mut layer = self.head.as_deref();
        while let Some(current) = layer {
            list.entry(&format_args!("{}#{}", current.name, current.key));
            layer = current.parent.as_deref();
        }
        list.finish()
    }
}

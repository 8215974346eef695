//! Structured logger capability.
//!
//! Middleware that emits application-facing records (currently only
//! [`AuditLayer`](crate::middleware::AuditLayer)) takes a [`Logger`] at
//! construction instead of reaching for a global. The default,
//! [`TracingLogger`], forwards to whatever `tracing` subscriber the host
//! installed.

use std::fmt;

use tracing::info;

use crate::context::{Context, request_id_key};

/// Sink for one structured record: a message plus ordered key/value pairs.
///
/// `ctx` is the request context at the point of logging, so implementations
/// can pull correlation data (e.g. the request id) from it.
pub trait Logger: Send + Sync + 'static {
    fn log(&self, ctx: &Context, message: &str, attrs: &[(String, String)]);
}

/// Emits records as `tracing` INFO events.
///
/// Attribute pairs are rendered into a single `attrs` field as
/// `name="value"` separated by spaces. Values are quoted and escaped like
/// Rust string literals, so spaces and `=` inside a value stay unambiguous.
/// The request id, when present in the context, becomes its own
/// `request_id` field.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, ctx: &Context, message: &str, attrs: &[(String, String)]) {
        let attrs = Attrs(attrs);
        match ctx.value(request_id_key()) {
            Some(id) => info!(request_id = %id, attrs = %attrs, "{message}"),
            None => info!(attrs = %attrs, "{message}"),
        }
    }
}

struct Attrs<'a>(&'a [(String, String)]);

impl fmt::Display for Attrs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value:?}")?;
        }
        Ok(())
    }
}

//! Error handler trait and the built-in unknown-error handler.

use std::sync::Arc;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderValue, StatusCode};

use crate::sentinel::DynError;
use crate::sink::ResponseSink;

/// Body written by [`default_unknown_handler`].
pub const UNKNOWN_ERROR_BODY: &str = "<h1>Internal Server Error</h1>";

/// Handles one dispatched error by writing a complete response into the sink.
///
/// `err` is `None` when dispatch was called without an error. Implemented for
/// every `Fn(&mut ResponseSink, &Parts, Option<&DynError>)` closure.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, sink: &mut ResponseSink, req: &Parts, err: Option<&DynError>);
}

impl<F> ErrorHandler for F
where
    F: Fn(&mut ResponseSink, &Parts, Option<&DynError>) + Send + Sync + 'static,
{
    fn handle(&self, sink: &mut ResponseSink, req: &Parts, err: Option<&DynError>) {
        self(sink, req, err);
    }
}

/// Shared, type-erased handler as stored in the registry.
pub type SharedHandler = Arc<dyn ErrorHandler>;

/// Wraps a closure into a [`SharedHandler`].
pub fn shared<F>(handler: F) -> SharedHandler
where
    F: Fn(&mut ResponseSink, &Parts, Option<&DynError>) + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Writes `500 Internal Server Error` with a fixed HTML body.
pub fn default_unknown_handler(sink: &mut ResponseSink, _req: &Parts, _err: Option<&DynError>) {
    sink.set_header(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    sink.set_header(CONTENT_LENGTH, HeaderValue::from(UNKNOWN_ERROR_BODY.len()));
    sink.write_header(StatusCode::INTERNAL_SERVER_ERROR);
    sink.write(UNKNOWN_ERROR_BODY.as_bytes());
}

//! Axum extractor giving handlers direct access to the bound mux.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use centra_core::{DynError, ErrorMux, ResponseSink};
use http::request::Parts;
use http::{Request, StatusCode};

use crate::dispatch::{bound_mux, into_response, DispatchError};

/// The bound [`ErrorMux`] together with a snapshot of the request head.
///
/// ```ignore
/// async fn show(dispatch: ErrorDispatch, Path(id): Path<u64>) -> Response {
///     match load(id).await {
///         Ok(record) => Json(record).into_response(),
///         Err(e) => dispatch.respond(Some(&e)),
///     }
/// }
/// ```
#[derive(Debug)]
pub struct ErrorDispatch {
    mux: Arc<ErrorMux>,
    head: Parts,
}

impl ErrorDispatch {
    /// Dispatches `err` and returns the response its handler wrote.
    #[must_use]
    pub fn respond(&self, err: Option<&DynError>) -> Response {
        let mut sink = ResponseSink::new();
        self.mux.dispatch(&mut sink, &self.head, err);
        into_response(sink)
    }

    #[must_use]
    pub fn mux(&self) -> &Arc<ErrorMux> {
        &self.mux
    }

    /// Request head the handlers will see.
    #[must_use]
    pub fn head(&self) -> &Parts {
        &self.head
    }
}

impl<S> FromRequestParts<S> for ErrorDispatch
where
    S: Send + Sync,
{
    type Rejection = UnboundRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let mux = bound_mux(&parts.extensions).map_err(UnboundRejection)?;
        Ok(Self {
            mux,
            head: snapshot(parts),
        })
    }
}

/// Copies method, URI, version, headers and extensions of a request head.
fn snapshot(parts: &Parts) -> Parts {
    let (mut head, ()) = Request::new(()).into_parts();
    head.method = parts.method.clone();
    head.uri = parts.uri.clone();
    head.version = parts.version;
    head.headers = parts.headers.clone();
    head.extensions = parts.extensions.clone();
    head
}

/// Rejection produced when [`ErrorDispatch`] is extracted without a binder.
///
/// Rendered as a plain-text 500 naming the misconfiguration; the unknown
/// handler is never consulted.
#[derive(Debug)]
pub struct UnboundRejection(pub DispatchError);

impl IntoResponse for UnboundRejection {
    fn into_response(self) -> Response {
        tracing::error!(target: "centra", "{}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

//! Dispatch entry point for code running downstream of an [`ErrorMuxLayer`].
//!
//! [`ErrorMuxLayer`]: crate::binder::ErrorMuxLayer

use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use centra_core::{DynError, ErrorMux, ResponseSink};
use http::request::Parts;
use http::Extensions;

use crate::binder::BoundMux;

/// Failure to find the mux a request should have been bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("centra: no error mux bound to this request, wrap the service with ErrorMuxLayer")]
    Unbound,
}

/// Returns the mux bound to a request.
///
/// # Errors
///
/// Returns [`DispatchError::Unbound`] if no binder ran upstream.
pub fn bound_mux(extensions: &Extensions) -> Result<Arc<ErrorMux>, DispatchError> {
    extensions
        .get::<BoundMux>()
        .map(|bound| Arc::clone(&bound.0))
        .ok_or(DispatchError::Unbound)
}

/// Routes `err` to the handler registered on the request's bound mux.
///
/// # Panics
///
/// Panics if the request was never bound. A missing binder is a pipeline
/// misconfiguration and is not papered over with the unknown handler.
pub fn error(sink: &mut ResponseSink, req: &Parts, err: Option<&DynError>) {
    match bound_mux(&req.extensions) {
        Ok(mux) => mux.dispatch(sink, req, err),
        Err(e) => {
            tracing::error!(target: "centra", method = %req.method, uri = %req.uri, "{e}");
            panic!("{e}");
        }
    }
}

/// Runs [`error`] into a fresh sink and converts the result to a response.
///
/// # Panics
///
/// Panics if the request was never bound.
#[must_use]
pub fn error_response(req: &Parts, err: Option<&DynError>) -> Response {
    let mut sink = ResponseSink::new();
    error(&mut sink, req, err);
    into_response(sink)
}

/// Converts a written sink into an axum response.
#[must_use]
pub fn into_response(sink: ResponseSink) -> Response {
    sink.into_response().map(Body::from)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicBool, Ordering};

    use centra_core::Sentinel;
    use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
    use http::{Request, StatusCode};
    use tower::{service_fn, ServiceExt};

    use super::*;
    use crate::binder::handler;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error("record missing")]
    struct Missing;

    #[derive(Debug, thiserror::Error)]
    #[error("loading profile")]
    struct LoadProfile(#[source] Missing);

    fn unbound_parts() -> Parts {
        Request::new(()).into_parts().0
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn bound_mux_reports_absence() {
        let parts = unbound_parts();
        assert_eq!(bound_mux(&parts.extensions).unwrap_err(), DispatchError::Unbound);
    }

    #[test]
    #[should_panic(expected = "no error mux bound")]
    fn error_without_binder_panics() {
        let mut sink = ResponseSink::new();
        error(&mut sink, &unbound_parts(), Some(&Missing));
    }

    #[tokio::test]
    async fn binder_and_entry_point_reach_the_same_mux() {
        let fired = Arc::new(AtomicBool::new(false));
        let mux = Arc::new(ErrorMux::new());
        let marker = Arc::clone(&fired);
        mux.handle(Sentinel::new(Missing), move |sink, _req, _err| {
            marker.store(true, Ordering::SeqCst);
            sink.write_header(StatusCode::NOT_FOUND);
        });

        let svc = handler(
            Arc::clone(&mux),
            service_fn(|req: Request<()>| async move {
                let (parts, ()) = req.into_parts();
                let err = LoadProfile(Missing);
                Ok::<_, Infallible>(error_response(&parts, Some(&err)))
            }),
        );

        let response = svc.oneshot(Request::new(())).await.unwrap();
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unmatched_error_yields_exact_default_response() {
        let svc = handler(
            Arc::new(ErrorMux::new()),
            service_fn(|req: Request<()>| async move {
                let (parts, ()) = req.into_parts();
                let err = std::io::Error::other("Unknown");
                Ok::<_, Infallible>(error_response(&parts, Some(&err)))
            }),
        );

        let response = svc.oneshot(Request::new(())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().len(), 2);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(response.headers()[CONTENT_LENGTH], "30");
        assert_eq!(body_bytes(response).await, b"<h1>Internal Server Error</h1>");
    }

    #[tokio::test]
    async fn none_error_uses_unknown_handler() {
        let mux = Arc::new(ErrorMux::new());
        mux.set_unknown_handler(|sink, _req, err| {
            assert!(err.is_none());
            sink.write(b"2");
        });

        let svc = handler(
            mux,
            service_fn(|req: Request<()>| async move {
                let (parts, ()) = req.into_parts();
                Ok::<_, Infallible>(error_response(&parts, None))
            }),
        );

        let response = svc.oneshot(Request::new(())).await.unwrap();
        assert_eq!(body_bytes(response).await, b"2");
    }

    #[tokio::test]
    async fn handler_sees_request_head() {
        let mux = Arc::new(ErrorMux::new());
        mux.handle(Sentinel::new(Missing), |sink, req, _err| {
            sink.write(req.uri.path().as_bytes());
        });

        let svc = handler(
            mux,
            service_fn(|req: Request<()>| async move {
                let (parts, ()) = req.into_parts();
                Ok::<_, Infallible>(error_response(&parts, Some(&Missing)))
            }),
        );

        let req = Request::builder().uri("/profiles/7").body(()).unwrap();
        let response = svc.oneshot(req).await.unwrap();
        assert_eq!(body_bytes(response).await, b"/profiles/7");
    }
}

//! Demo routes and the error mux wired to them.
//!
//! `GET /records/{key}` dispatches through the [`ErrorDispatch`] extractor,
//! `GET /legacy/records/{key}` through the free [`error_response`] function.
//! Keys `missing`, `secret` and `broken` fail with a not-found, an
//! authorization and an unregistered error respectively.

use std::error::Error;

use axum::extract::{Path, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use centra_core::{ErrorMux, MuxOptions, Sentinel};
use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderValue, StatusCode};
use serde_json::json;

use crate::dispatch::error_response;
use crate::extract::ErrorDispatch;

/// Sentinel errors of the demo record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("caller is not authorized")]
    Unauthorized,
}

/// Context added on top of a [`StoreError`] by the loading code.
#[derive(Debug, thiserror::Error)]
#[error("loading record {key}")]
pub struct LoadError {
    pub key: String,
    #[source]
    pub cause: StoreError,
}

/// Pretend storage lookup.
///
/// # Errors
///
/// Fails for the keys `missing`, `secret` and `broken`.
pub fn load_record(key: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    match key {
        "missing" => Err(Box::new(LoadError {
            key: key.to_string(),
            cause: StoreError::NotFound,
        })),
        "secret" => Err(Box::new(StoreError::Unauthorized)),
        "broken" => Err(Box::new(std::io::Error::other("disk unavailable"))),
        other => Ok(format!("record {other}")),
    }
}

/// Builds the mux used by the demo routes.
#[must_use]
pub fn build_demo_mux(options: MuxOptions) -> ErrorMux {
    let mux = ErrorMux::with_options(options);

    mux.handle(Sentinel::new(StoreError::NotFound), |sink, req, err| {
        let body = json!({
            "error": "not_found",
            "path": req.uri.path(),
            "detail": err.map(ToString::to_string),
        });
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        sink.write_header(StatusCode::NOT_FOUND);
        sink.write(body.to_string().as_bytes());
    });

    mux.handle(Sentinel::new(StoreError::Unauthorized), |sink, _req, _err| {
        sink.set_header(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        sink.write_header(StatusCode::UNAUTHORIZED);
        sink.write(b"unauthorized");
    });

    mux
}

/// Demo routes:
/// - `GET /records/{key}` -- record lookup, errors via the extractor
/// - `GET /legacy/records/{key}` -- record lookup, errors via `error_response`
pub fn routes() -> Router {
    Router::new()
        .route("/records/{key}", get(record_handler))
        .route("/legacy/records/{key}", get(legacy_record_handler))
}

/// `GET /records/{key}`
pub async fn record_handler(dispatch: ErrorDispatch, Path(key): Path<String>) -> Response {
    match load_record(&key) {
        Ok(record) => record.into_response(),
        Err(e) => dispatch.respond(Some(&*e)),
    }
}

/// `GET /legacy/records/{key}`
pub async fn legacy_record_handler(Path(key): Path<String>, req: Request) -> Response {
    let (parts, _body) = req.into_parts();
    match load_record(&key) {
        Ok(record) => record.into_response(),
        Err(e) => error_response(&parts, Some(&*e)),
    }
}

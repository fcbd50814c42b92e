//! Response sink written by error handlers.

use bytes::{Bytes, BytesMut};
use http::header::IntoHeaderName;
use http::{HeaderMap, HeaderValue, Response, StatusCode};

/// Accumulates the status, headers and body an error handler produces.
///
/// Mirrors the usual HTTP writer contract: the first status written wins,
/// and writing body bytes before any status implies `200 OK`.
#[derive(Debug, Default)]
pub struct ResponseSink {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any existing values under the same name.
    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Mutable access to the header map.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Writes the status code. Only the first call has an effect.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(current) => {
                tracing::debug!(
                    target: "centra",
                    current = current.as_u16(),
                    ignored = status.as_u16(),
                    "superfluous write_header call"
                );
            }
        }
    }

    /// Appends body bytes.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    /// Returns true once a status has been written, explicitly or implicitly.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    /// Status that will be sent; `200 OK` if nothing was written.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the accumulated output into an `http::Response`.
    #[must_use]
    pub fn into_response(self) -> Response<Bytes> {
        let status = self.status();
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

//! Tower layer binding an [`ErrorMux`] to every request passing through it.
//!
//! The mux is stored in the request's extensions under a crate-private key,
//! so unrelated extension data can never collide with it. Nested binders
//! overwrite each other: the innermost layer's mux is the one downstream code
//! sees.

use std::sync::Arc;
use std::task::{Context, Poll};

use centra_core::ErrorMux;
use http::Request;
use tower::{Layer, Service};

/// Extension key holding the bound mux.
#[derive(Clone)]
pub(crate) struct BoundMux(pub(crate) Arc<ErrorMux>);

// ---------------------------------------------------------------------------
// ErrorMuxLayer
// ---------------------------------------------------------------------------

/// Tower layer that attaches one shared [`ErrorMux`] to each request.
#[derive(Debug, Clone)]
pub struct ErrorMuxLayer {
    mux: Arc<ErrorMux>,
}

impl ErrorMuxLayer {
    #[must_use]
    pub fn new(mux: Arc<ErrorMux>) -> Self {
        Self { mux }
    }

    /// The mux this layer binds.
    #[must_use]
    pub fn mux(&self) -> &Arc<ErrorMux> {
        &self.mux
    }
}

impl<S> Layer<S> for ErrorMuxLayer {
    type Service = ErrorMuxService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorMuxService {
            inner,
            mux: Arc::clone(&self.mux),
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorMuxService
// ---------------------------------------------------------------------------

/// Service wrapper that inserts the mux into request extensions before
/// calling the inner service.
#[derive(Debug, Clone)]
pub struct ErrorMuxService<S> {
    inner: S,
    mux: Arc<ErrorMux>,
}

impl<S, B> Service<Request<B>> for ErrorMuxService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        req.extensions_mut().insert(BoundMux(Arc::clone(&self.mux)));
        self.inner.call(req)
    }
}

/// Wraps `next` so every request it receives carries `mux`.
pub fn handler<S>(mux: Arc<ErrorMux>, next: S) -> ErrorMuxService<S> {
    ErrorMuxLayer::new(mux).layer(next)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

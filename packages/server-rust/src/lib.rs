//! `Centra` Server — binds an `ErrorMux` to requests and dispatches errors from handlers.

pub mod binder;
pub mod demo;
pub mod dispatch;
pub mod extract;
pub mod network;

pub use binder::{handler, ErrorMuxLayer, ErrorMuxService};
pub use dispatch::{bound_mux, error, error_response, into_response, DispatchError};
pub use extract::{ErrorDispatch, UnboundRejection};

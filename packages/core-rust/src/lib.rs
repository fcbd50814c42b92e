//! `Centra` Core — sentinel-keyed error handler registry and dispatch.
//!
//! Framework-independent: handlers write into a [`ResponseSink`] and receive
//! the request head as `http::request::Parts`. Binding a registry to requests
//! lives in `centra-server`.

pub mod error;
pub mod handler;
pub mod mux;
pub mod sentinel;
pub mod sink;

pub use error::ConfigError;
pub use handler::{
    default_unknown_handler, shared, ErrorHandler, SharedHandler, UNKNOWN_ERROR_BODY,
};
pub use mux::{ErrorMux, MuxOptions};
pub use sentinel::{chain, DynError, Sentinel};
pub use sink::ResponseSink;

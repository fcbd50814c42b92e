//! The error multiplexer: an ordered registry of sentinel handlers.

use std::fmt;
use std::sync::Arc;

use http::request::Parts;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::handler::{default_unknown_handler, SharedHandler};
use crate::sentinel::{DynError, Sentinel};
use crate::sink::ResponseSink;

// ---------------------------------------------------------------------------
// MuxOptions
// ---------------------------------------------------------------------------

/// Runtime options of an [`ErrorMux`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxOptions {
    /// Emit a `debug` event on target `centra` for every dispatch.
    pub debug: bool,
}

// ---------------------------------------------------------------------------
// ErrorMux
// ---------------------------------------------------------------------------

struct HandlerEntry {
    sentinel: Sentinel,
    handler: SharedHandler,
}

/// Slot 0 is the unknown handler; `entries` are slots 1.. in registration order.
struct Table {
    unknown: SharedHandler,
    entries: Vec<HandlerEntry>,
}

/// Routes errors to the handler registered for the most recent matching sentinel.
///
/// Built once at startup and shared (usually as `Arc<ErrorMux>`) by every
/// request. Registration and dispatch may run concurrently: registration takes
/// the write lock, dispatch only holds the read lock while selecting a handler
/// and invokes it after the lock is released. Handlers may therefore register
/// further handlers on the same mux.
pub struct ErrorMux {
    table: RwLock<Table>,
    options: RwLock<MuxOptions>,
}

impl ErrorMux {
    /// Creates a mux whose unknown handler is [`default_unknown_handler`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(MuxOptions::default())
    }

    #[must_use]
    pub fn with_options(options: MuxOptions) -> Self {
        Self {
            table: RwLock::new(Table {
                unknown: Arc::new(default_unknown_handler),
                entries: Vec::new(),
            }),
            options: RwLock::new(options),
        }
    }

    pub fn set_options(&self, options: MuxOptions) {
        *self.options.write() = options;
    }

    #[must_use]
    pub fn options(&self) -> MuxOptions {
        *self.options.read()
    }

    /// Registers `handler` for errors whose wrap-chain contains `sentinel`.
    ///
    /// Duplicate sentinels are accepted; the latest registration wins.
    pub fn handle<F>(&self, sentinel: Sentinel, handler: F)
    where
        F: Fn(&mut ResponseSink, &Parts, Option<&DynError>) + Send + Sync + 'static,
    {
        self.handle_shared(sentinel, Arc::new(handler));
    }

    /// Same as [`handle`](Self::handle) for an already shared handler.
    pub fn handle_shared(&self, sentinel: Sentinel, handler: SharedHandler) {
        let mut table = self.table.write();
        trace!(
            target: "centra",
            sentinel = sentinel.label(),
            slot = table.entries.len() + 1,
            "registering error handler"
        );
        table.entries.push(HandlerEntry { sentinel, handler });
    }

    /// Registers a handler from optional parts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] without touching the registry if either part
    /// is missing.
    pub fn try_handle(
        &self,
        sentinel: Option<Sentinel>,
        handler: Option<SharedHandler>,
    ) -> Result<(), ConfigError> {
        let sentinel = sentinel.ok_or(ConfigError::MissingSentinel)?;
        let handler = handler.ok_or(ConfigError::MissingHandler)?;
        self.handle_shared(sentinel, handler);
        Ok(())
    }

    /// Registers a handler from optional parts, halting on a missing part.
    ///
    /// # Panics
    ///
    /// Panics if `sentinel` or `handler` is `None`.
    pub fn handle_checked(&self, sentinel: Option<Sentinel>, handler: Option<SharedHandler>) {
        if let Err(e) = self.try_handle(sentinel, handler) {
            panic!("{e}");
        }
    }

    /// Replaces the handler used for `None` errors and unmatched errors.
    pub fn set_unknown_handler<F>(&self, handler: F)
    where
        F: Fn(&mut ResponseSink, &Parts, Option<&DynError>) + Send + Sync + 'static,
    {
        self.set_unknown_handler_shared(Arc::new(handler));
    }

    pub fn set_unknown_handler_shared(&self, handler: SharedHandler) {
        self.table.write().unknown = handler;
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingHandler`] if `handler` is `None`.
    pub fn try_set_unknown_handler(&self, handler: Option<SharedHandler>) -> Result<(), ConfigError> {
        let handler = handler.ok_or(ConfigError::MissingHandler)?;
        self.set_unknown_handler_shared(handler);
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if `handler` is `None`.
    pub fn set_unknown_handler_checked(&self, handler: Option<SharedHandler>) {
        if let Err(e) = self.try_set_unknown_handler(handler) {
            panic!("{e}");
        }
    }

    /// Returns the current unknown handler.
    #[must_use]
    pub fn unknown_handler(&self) -> SharedHandler {
        Arc::clone(&self.table.read().unknown)
    }

    /// Number of registered sentinel handlers, not counting the unknown handler.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes exactly one handler for `err`.
    ///
    /// `None` goes straight to the unknown handler. Otherwise entries are
    /// scanned newest first and the first one whose sentinel appears in the
    /// wrap-chain of `err` is called with the original `err`. With no match
    /// the unknown handler is called.
    pub fn dispatch(&self, sink: &mut ResponseSink, req: &Parts, err: Option<&DynError>) {
        let (handler, slot) = self.select(err);
        if self.options().debug {
            log_dispatch(err, slot);
        }
        handler.handle(sink, req, err);
    }

    /// Picks the handler under the read lock. Slot 0 is the unknown handler.
    fn select(&self, err: Option<&DynError>) -> (SharedHandler, usize) {
        let table = self.table.read();
        let Some(err) = err else {
            return (Arc::clone(&table.unknown), 0);
        };
        table
            .entries
            .iter()
            .enumerate()
            .rev()
            .find(|(_, entry)| entry.sentinel.matches(err))
            .map_or_else(
                || (Arc::clone(&table.unknown), 0),
                |(index, entry)| (Arc::clone(&entry.handler), index + 1),
            )
    }
}

fn log_dispatch(err: Option<&DynError>, slot: usize) {
    match (err, slot) {
        (None, _) => debug!(target: "centra", "unknown handler has been called, err is none"),
        (Some(err), 0) => debug!(
            target: "centra",
            error = %err,
            "unknown handler has been called"
        ),
        (Some(err), slot) => debug!(
            target: "centra",
            error = %err,
            slot,
            "handler for error has been called"
        ),
    }
}

impl Default for ErrorMux {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorMux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.read();
        let sentinels: Vec<&str> = table.entries.iter().map(|e| e.sentinel.label()).collect();
        f.debug_struct("ErrorMux")
            .field("sentinels", &sentinels)
            .field("options", &*self.options.read())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

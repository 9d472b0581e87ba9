//! Connection hooks
//!
//! Callbacks the application registers to hear about connection-level
//! events. Every hook is optional.

use crate::transport::CloseEvent;
use std::fmt;
use std::sync::Arc;

/// Called with `(message, code)` for every `fungi:error` from the server
pub type ErrorHook = Arc<dyn Fn(&str, u16) + Send + Sync>;

/// Called when the connection closes
pub type CloseHook = Arc<dyn Fn(&CloseEvent) + Send + Sync>;

/// Called without arguments
pub type NotifyHook = Arc<dyn Fn() + Send + Sync>;

/// Called with the transport's error description
pub type TransportErrorHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Connection-level callbacks
#[derive(Clone, Default)]
pub struct ClientHooks {
    on_error: Option<ErrorHook>,
    on_close: Option<CloseHook>,
    on_connection_established: Option<NotifyHook>,
    on_open: Option<NotifyHook>,
    on_transport_error: Option<TransportErrorHook>,
}

impl ClientHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, u16) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(hook));
        self
    }

    pub fn on_connection_established<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_connection_established = Some(Arc::new(hook));
        self
    }

    /// Socket opened, before the server accepted the connection
    pub fn on_open<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_open = Some(Arc::new(hook));
        self
    }

    pub fn on_transport_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_transport_error = Some(Arc::new(hook));
        self
    }

    pub(crate) fn error(&self, message: &str, code: u16) {
        if let Some(hook) = &self.on_error {
            hook(message, code);
        }
    }

    pub(crate) fn close(&self, event: &CloseEvent) {
        if let Some(hook) = &self.on_close {
            hook(event);
        }
    }

    pub(crate) fn connection_established(&self) {
        if let Some(hook) = &self.on_connection_established {
            hook();
        }
    }

    pub(crate) fn open(&self) {
        if let Some(hook) = &self.on_open {
            hook();
        }
    }

    pub(crate) fn transport_error(&self, message: &str) {
        if let Some(hook) = &self.on_transport_error {
            hook(message);
        }
    }
}

impl fmt::Debug for ClientHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHooks")
            .field("on_error", &self.on_error.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_connection_established", &self.on_connection_established.is_some())
            .field("on_open", &self.on_open.is_some())
            .field("on_transport_error", &self.on_transport_error.is_some())
            .finish()
    }
}

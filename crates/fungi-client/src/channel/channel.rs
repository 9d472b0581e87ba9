//! A single channel
//!
//! Subscription state, the pending auth handshake and the handler sets of
//! one channel name. Cloning a [`Channel`] yields another handle to the same
//! channel.

use super::{CatchAllHandler, EventHandler, HandlerSet, CLIENT_EVENT_PREFIX, PRIVATE_CHANNEL_PREFIX};
use crate::auth::{AuthError, AuthRequest, AuthResponse};
use crate::connection::{ClientInner, Session};
use crate::error::{ClientError, TriggerError};
use crate::protocol::WireMessage;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::task::AbortHandle;

/// Channel kind, derived from the name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Anyone can subscribe
    Public,
    /// Subscribing requires an auth token; client events are allowed
    Private,
}

impl ChannelKind {
    /// Classify a channel name
    #[must_use]
    pub fn of(name: &str) -> Self {
        if name.starts_with(PRIVATE_CHANNEL_PREFIX) {
            Self::Private
        } else {
            Self::Public
        }
    }
}

/// Options for [`Channel::on_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindOptions {
    /// Drop the handlers already bound to the event first
    pub replace: bool,
}

impl BindOptions {
    #[must_use]
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

/// Handle to a channel
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    name: String,
    kind: ChannelKind,
    client: Weak<ClientInner>,
    state: Mutex<ChannelState>,
}

struct ChannelState {
    /// Confirmed by the server
    subscribed: bool,

    /// Bumped by every subscribe attempt, unsubscribe and detach
    generation: u64,

    /// False once the connection dropped this channel from its registry
    attached: bool,

    /// Connection epoch of the running auth handshake
    pending: Option<u64>,

    handshake: Option<AbortHandle>,

    handlers: HandlerSet,
}

impl ChannelState {
    /// Start a new attempt, invalidating whatever is in flight
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.pending = None;
        if let Some(handshake) = self.handshake.take() {
            handshake.abort();
        }
        self.generation
    }
}

impl Channel {
    pub(crate) fn new(name: impl Into<String>, client: Weak<ClientInner>) -> Self {
        let name = name.into();
        Self {
            inner: Arc::new(ChannelInner {
                kind: ChannelKind::of(&name),
                name,
                client,
                state: Mutex::new(ChannelState {
                    subscribed: false,
                    generation: 0,
                    attached: true,
                    pending: None,
                    handshake: None,
                    handlers: HandlerSet::default(),
                }),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn kind(&self) -> ChannelKind {
        self.inner.kind
    }

    /// Whether the server confirmed the subscription
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.inner.state.lock().subscribed
    }

    /// Whether an auth handshake is in flight
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    /// Number of handlers bound, all kinds included
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.state.lock().handlers.len()
    }

    /// Whether both handles point to the same channel
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    // === Handlers ===

    /// Bind a handler to `event`
    pub fn on<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_with(event, handler, BindOptions::default());
    }

    /// Bind a handler to `event` with options
    pub fn on_with<F>(&self, event: impl Into<String>, handler: F, options: BindOptions)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        self.inner
            .state
            .lock()
            .handlers
            .add(event.into(), handler, options.replace);
    }

    /// Bind a handler that runs for the next `event` only
    pub fn once<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        self.inner.state.lock().handlers.add_once(event.into(), handler);
    }

    /// Remove the persistent handlers of the given events
    ///
    /// An empty slice removes every persistent handler. One-time and
    /// catch-all handlers are kept.
    pub fn off(&self, events: &[&str]) {
        self.inner.state.lock().handlers.remove(events);
    }

    /// Bind a handler receiving every event as `(channel, event, data)`
    pub fn on_any<F>(&self, handler: F)
    where
        F: Fn(&str, &str, &Value) + Send + Sync + 'static,
    {
        let handler: CatchAllHandler = Arc::new(handler);
        self.inner.state.lock().handlers.add_catch_all(handler);
    }

    /// Remove every catch-all handler
    pub fn off_any(&self) {
        self.inner.state.lock().handlers.clear_catch_all();
    }

    // === Subscription ===

    /// Ask the server for a subscription
    ///
    /// Does nothing when already subscribed, when the connection is not
    /// established yet (the connection resubscribes every channel once it
    /// is) or when the channel was dropped by its connection. Private
    /// channels first run the auth handshake in the background.
    pub fn subscribe(&self) {
        let Some(client) = self.inner.client.upgrade() else {
            return;
        };
        let Some(session) = client.session() else {
            tracing::debug!(channel = %self.name(), "Connection not established, subscribe deferred");
            return;
        };

        let generation = {
            let mut state = self.inner.state.lock();
            if state.subscribed || !state.attached {
                return;
            }
            if state.pending == Some(session.epoch) {
                tracing::trace!(channel = %self.name(), "Auth handshake already running");
                return;
            }
            state.next_generation()
        };

        match self.kind() {
            ChannelKind::Public => {
                tracing::debug!(channel = %self.name(), "Subscribing");
                if let Err(e) = client.send_message(&WireMessage::subscribe(self.name(), None)) {
                    tracing::warn!(channel = %self.name(), error = %e, "Failed to send subscribe");
                }
            }
            ChannelKind::Private => self.start_handshake(&client, session, generation),
        }
    }

    fn start_handshake(&self, client: &ClientInner, session: Session, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                channel = %self.name(),
                "No tokio runtime to run the auth handshake, subscribe abandoned"
            );
            return;
        };

        tracing::debug!(channel = %self.name(), socket_id = %session.socket_id, "Starting auth handshake");

        let authorizer = client.authorizer();
        let request = AuthRequest::new(session.socket_id, self.name());
        let channel = self.clone();
        let epoch = session.epoch;

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            return;
        }
        state.pending = Some(epoch);
        let task = runtime.spawn(async move {
            let result = authorizer.authorize(&request).await;
            channel.finish_handshake(generation, epoch, result);
        });
        state.handshake = Some(task.abort_handle());
    }

    fn finish_handshake(
        &self,
        generation: u64,
        epoch: u64,
        result: Result<AuthResponse, AuthError>,
    ) {
        let Some(client) = self.inner.client.upgrade() else {
            return;
        };

        // Checked and sent under one lock: an unsubscribe or detach lands
        // either before the check or after the send, never in between.
        let mut state = self.inner.state.lock();
        if state.generation != generation || !state.attached {
            tracing::debug!(channel = %self.name(), "Discarding stale auth response");
            return;
        }
        state.pending = None;
        state.handshake = None;

        match result {
            Ok(response) => self.send_authorized(&client, epoch, response),
            Err(e) => {
                tracing::error!(
                    channel = %self.name(),
                    error = %e,
                    "Channel authorization failed, subscribe abandoned"
                );
            }
        }
    }

    fn send_authorized(&self, client: &ClientInner, epoch: u64, response: AuthResponse) {
        let message = WireMessage::subscribe(self.name(), Some(response.auth));
        match client.send_in_epoch(epoch, &message) {
            Ok(true) => tracing::debug!(channel = %self.name(), "Subscribing with auth token"),
            Ok(false) => {
                tracing::debug!(channel = %self.name(), "Connection changed during auth handshake, discarding");
            }
            Err(e) => {
                tracing::warn!(channel = %self.name(), error = %e, "Failed to send subscribe");
            }
        }
    }

    /// Ask the server to end the subscription
    ///
    /// The channel stays subscribed until the server confirms. A running
    /// auth handshake is cancelled even though nothing is sent.
    pub fn unsubscribe(&self) {
        let subscribed = {
            let mut state = self.inner.state.lock();
            if !state.subscribed && state.pending.is_none() {
                return;
            }
            state.next_generation();
            state.subscribed
        };

        if !subscribed {
            tracing::debug!(channel = %self.name(), "Cancelled pending auth handshake");
            return;
        }

        let Some(client) = self.inner.client.upgrade() else {
            return;
        };
        tracing::debug!(channel = %self.name(), "Unsubscribing");
        if let Err(e) = client.send_message(&WireMessage::unsubscribe(self.name())) {
            tracing::warn!(channel = %self.name(), error = %e, "Failed to send unsubscribe");
        }
    }

    // === Client events ===

    /// Trigger a client event on this channel
    ///
    /// Only subscribed private channels accept client events, and the event
    /// name must start with `client-`.
    pub fn trigger(&self, event: &str, data: Value) -> Result<(), TriggerError> {
        if let Err(e) = self.check_trigger(event) {
            tracing::warn!(channel = %self.name(), event = %event, "{e}");
            return Err(e);
        }

        let client = self.inner.client.upgrade().ok_or(ClientError::NotConnected)?;
        client.send_message(&WireMessage::trigger(self.name(), event, data))?;

        tracing::trace!(channel = %self.name(), event = %event, "Client event triggered");
        Ok(())
    }

    fn check_trigger(&self, event: &str) -> Result<(), TriggerError> {
        let rejected = |build: fn(String, String) -> TriggerError| {
            Err(build(self.name().to_string(), event.to_string()))
        };

        if !self.is_subscribed() {
            return rejected(|channel, event| TriggerError::NotSubscribed { channel, event });
        }
        if self.kind() != ChannelKind::Private {
            return rejected(|channel, event| TriggerError::NotPrivate { channel, event });
        }
        if !event.starts_with(CLIENT_EVENT_PREFIX) {
            return rejected(|channel, event| TriggerError::InvalidEventName { channel, event });
        }
        Ok(())
    }

    // === Connection side ===

    pub(crate) fn set_subscribed(&self, subscribed: bool) {
        self.inner.state.lock().subscribed = subscribed;
    }

    /// Fire the handlers bound to `event`. Returns whether any ran.
    pub(crate) fn fire(&self, event: &str, data: &Value) -> bool {
        let plan = self.inner.state.lock().handlers.plan(event);
        plan.fire(self.name(), event, data)
    }

    /// Cut the channel loose from its connection
    pub(crate) fn detach(&self) {
        let mut state = self.inner.state.lock();
        state.next_generation();
        state.attached = false;
        state.subscribed = false;
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Channel")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("subscribed", &state.subscribed)
            .field("attached", &state.attached)
            .field("handlers", &state.handlers.len())
            .finish()
    }
}

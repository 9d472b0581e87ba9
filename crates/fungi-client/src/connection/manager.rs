//! Connection manager
//!
//! [`FungiClient`] owns the transport handle, the connection state and the
//! channel registry. Every transport notification goes through
//! [`FungiClient::handle_event`], one at a time.

use super::keepalive::Keepalive;
use super::{ClientHooks, ConnectionState};
use crate::auth::{Authorizer, HttpAuthorizer};
use crate::channel::{Channel, ChannelRegistry};
use crate::dispatcher::{self, Dispatch};
use crate::error::ClientError;
use crate::protocol::{ClientEvent, ConnectionEstablishedPayload, ServerEvent, WireMessage};
use crate::transport::{CloseEvent, Transport, TransportEvent, WebSocketTransport};
use fungi_common::ClientConfig;
use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Established connection as seen by a channel
pub(crate) struct Session {
    pub socket_id: String,
    pub epoch: u64,
}

pub(crate) struct ClientInner {
    config: ClientConfig,
    hooks: ClientHooks,
    authorizer: Arc<dyn Authorizer>,
    /// Taken after a channel's lock, never before
    core: Mutex<ConnectionCore>,
    channels: ChannelRegistry,
    /// Held for the whole processing of one notification
    dispatch: ReentrantMutex<()>,
}

#[derive(Default)]
struct ConnectionCore {
    transport: Option<Arc<dyn Transport>>,
    socket_id: Option<String>,
    state: ConnectionState,

    /// Bumped on every established, close and disconnect transition
    epoch: u64,

    keepalive: Option<Keepalive>,
    pump: Option<JoinHandle<()>>,
}

impl ClientInner {
    /// Socket id and epoch, only while established
    pub fn session(&self) -> Option<Session> {
        let core = self.core.lock();
        if !core.state.is_established() {
            return None;
        }
        core.socket_id.clone().map(|socket_id| Session {
            socket_id,
            epoch: core.epoch,
        })
    }

    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        Arc::clone(&self.authorizer)
    }

    fn transport(&self) -> Result<Arc<dyn Transport>, ClientError> {
        self.core.lock().transport.clone().ok_or(ClientError::NotConnected)
    }

    pub fn send_message(&self, message: &WireMessage) -> Result<(), ClientError> {
        let frame = message.to_json()?;
        self.transport()?.send(frame)?;
        Ok(())
    }

    /// Send only if the connection is still the one of `epoch`
    ///
    /// Returns whether the message was handed to the transport.
    pub fn send_in_epoch(&self, epoch: u64, message: &WireMessage) -> Result<bool, ClientError> {
        let transport = {
            let core = self.core.lock();
            if core.epoch != epoch || !core.state.is_established() {
                return Ok(false);
            }
            core.transport.clone().ok_or(ClientError::NotConnected)?
        };

        transport.send(message.to_json()?)?;
        Ok(true)
    }

    // === Transport notifications ===

    fn handle_event(&self, event: TransportEvent) {
        let _serial = self.dispatch.lock();
        match event {
            TransportEvent::Open => {
                self.core.lock().state = ConnectionState::Connecting;
                tracing::debug!("Transport open, waiting for connection_established");
                self.hooks.open();
            }
            TransportEvent::Message(raw) => self.handle_message(&raw),
            TransportEvent::Close(close) => {
                tracing::info!(code = close.code, reason = %close.reason, "Connection closed");
                self.reset();
                self.release_closed_transport();
                self.hooks.close(&close);
            }
            TransportEvent::Error(message) => {
                tracing::warn!(error = %message, "Transport error");
                self.hooks.transport_error(&message);
            }
        }
    }

    fn handle_message(&self, raw: &str) {
        let dispatch = match dispatcher::route(raw) {
            Ok(dispatch) => dispatch,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return;
            }
        };

        match dispatch {
            Dispatch::Pong => tracing::trace!("Keepalive pong"),
            Dispatch::ConnectionEstablished(payload) => self.establish(payload),
            Dispatch::SubscriptionSucceeded { channel, data } => {
                self.confirm(ServerEvent::SubscriptionSucceeded, &channel, &data, Some(true));
            }
            Dispatch::UnsubscriptionSucceeded { channel, data } => {
                self.confirm(ServerEvent::UnsubscriptionSucceeded, &channel, &data, Some(false));
            }
            Dispatch::SubscriptionError { channel, data } => {
                tracing::warn!(channel = %channel, data = %data, "Subscription rejected");
                self.confirm(ServerEvent::SubscriptionError, &channel, &data, None);
            }
            Dispatch::Error(error) => {
                tracing::warn!(code = error.code, message = %error.message, "Server error");
                self.hooks.error(&error.message, error.code);
            }
            Dispatch::Triggered {
                channel,
                event,
                data,
            } => self.deliver(&channel, &event, &data),
        }
    }

    fn establish(&self, payload: ConnectionEstablishedPayload) {
        let interval = self.config.keep_alive_latency.and_then(|latency| {
            let interval = payload.keep_alive_interval(latency);
            if interval.is_none() {
                tracing::warn!(
                    activity_timeout = payload.activity_timeout,
                    latency,
                    "Activity timeout leaves no room for keepalive pings"
                );
            }
            interval
        });

        let previous = {
            let mut core = self.core.lock();
            core.epoch += 1;
            core.state = ConnectionState::Established;
            core.socket_id = Some(payload.socket_id.clone());

            let keepalive = interval
                .zip(core.transport.clone())
                .and_then(|(interval, transport)| Keepalive::start(transport, interval));
            if let Some(keepalive) = &keepalive {
                tracing::debug!(interval = ?keepalive.interval(), "Keepalive started");
            }
            std::mem::replace(&mut core.keepalive, keepalive)
        };
        drop(previous);

        tracing::info!(
            socket_id = %payload.socket_id,
            activity_timeout = payload.activity_timeout,
            "Connection established"
        );

        for channel in self.channels.snapshot() {
            channel.subscribe();
        }

        self.hooks.connection_established();
    }

    fn confirm(&self, event: ServerEvent, name: &str, data: &Value, subscribed: Option<bool>) {
        let Some(channel) = self.channels.get(name) else {
            tracing::debug!(channel = %name, event = %event, "Confirmation for unknown channel");
            return;
        };

        if let Some(subscribed) = subscribed {
            channel.set_subscribed(subscribed);
        }
        channel.fire(event.as_str(), data);
    }

    fn deliver(&self, name: &str, event: &str, data: &Value) {
        let Some(channel) = self.channels.get(name).filter(Channel::is_subscribed) else {
            tracing::trace!(channel = %name, event = %event, "Dropping event for unsubscribed channel");
            return;
        };

        if !channel.fire(event, data) {
            tracing::warn!(channel = %name, event = %event, "No handler bound for event");
        }
    }

    /// Let go of a transport that will not connect again
    fn release_closed_transport(&self) {
        let mut core = self.core.lock();
        if core.transport.as_ref().is_some_and(|transport| transport.is_closed()) {
            tracing::debug!("Transport closed for good, releasing it");
            core.transport = None;
        }
    }

    /// Back to disconnected: keepalive stopped, every channel dropped
    fn reset(&self) {
        let keepalive = {
            let mut core = self.core.lock();
            core.state = ConnectionState::Disconnected;
            core.socket_id = None;
            core.epoch += 1;
            core.keepalive.take()
        };
        drop(keepalive);

        for channel in self.channels.drain() {
            channel.detach();
        }
    }
}

/// Client for the Fungi realtime service
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct FungiClient {
    inner: Arc<ClientInner>,
}

impl FungiClient {
    /// Start building a client
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Create a client on the WebSocket transport
    ///
    /// Connecting starts right away unless the config defers it with
    /// `client_only`.
    pub fn new(config: ClientConfig, hooks: ClientHooks) -> Result<Self, ClientError> {
        Self::builder(config).hooks(hooks).build()
    }

    /// Create a client on a caller-supplied transport
    ///
    /// Notifications arriving on `events` are processed by a background
    /// task. Without a receiver the caller feeds [`handle_event`] itself.
    ///
    /// [`handle_event`]: Self::handle_event
    pub fn with_transport(
        config: ClientConfig,
        hooks: ClientHooks,
        transport: Arc<dyn Transport>,
        events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    ) -> Result<Self, ClientError> {
        Self::builder(config)
            .hooks(hooks)
            .transport(transport, events)
            .build()
    }

    /// Open the WebSocket transport on a client that has no live one
    ///
    /// Does nothing while a transport is attached and still usable. After
    /// the server closed the default transport this opens a new one.
    pub fn connect(&self) -> Result<(), ClientError> {
        let live = self
            .inner
            .core
            .lock()
            .transport
            .as_ref()
            .is_some_and(|transport| !transport.is_closed());
        if live {
            return Ok(());
        }

        let config = &self.inner.config;
        tracing::info!(endpoint = %config.ws_endpoint, "Connecting");
        let (transport, events) =
            WebSocketTransport::connect(config.ws_endpoint.clone(), config.connection_timeout())?;
        self.attach(Arc::new(transport), Some(events));
        Ok(())
    }

    fn attach(
        &self,
        transport: Arc<dyn Transport>,
        events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    ) {
        let pump = events.and_then(|events| self.spawn_pump(events));

        let previous = {
            let mut core = self.inner.core.lock();
            core.transport = Some(transport);
            std::mem::replace(&mut core.pump, pump)
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn spawn_pump(
        &self,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime, transport events must be fed through handle_event");
            return None;
        };

        let client: Weak<ClientInner> = Arc::downgrade(&self.inner);
        Some(runtime.spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(client) = client.upgrade() else {
                    break;
                };
                client.handle_event(event);
            }
            tracing::debug!("Transport event stream ended");
        }))
    }

    /// Process one transport notification
    ///
    /// Notifications are processed one at a time: a call made while the
    /// event pump (or another thread) is firing handlers waits for it.
    /// Handlers may call this again on their own thread.
    pub fn handle_event(&self, event: TransportEvent) {
        self.inner.handle_event(event);
    }

    // === Channels ===

    /// Get or create the channel `name` and subscribe to it
    ///
    /// The same name always yields the same [`Channel`] until the
    /// connection closes. Channels registered while disconnected are
    /// subscribed once the connection is established.
    pub fn subscribe(&self, name: &str) -> Channel {
        let (channel, created) = self.inner.channels.get_or_insert_with(name, || {
            Channel::new(name, Arc::downgrade(&self.inner))
        });

        if created {
            tracing::debug!(channel = %name, kind = ?channel.kind(), "Channel registered");
        }

        channel.subscribe();
        channel
    }

    /// Unsubscribe from `name` if it is registered
    pub fn unsubscribe(&self, name: &str) {
        if let Some(channel) = self.inner.channels.get(name) {
            channel.unsubscribe();
        }
    }

    #[must_use]
    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.inner.channels.get(name)
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }

    // === Connection ===

    /// Send `{event, data}` on the connection
    pub fn send<T: Serialize>(&self, event: ClientEvent, data: &T) -> Result<(), ClientError> {
        let message = WireMessage::new(event.as_str(), serde_json::to_value(data)?);
        self.inner.send_message(&message)
    }

    /// Close the connection and reset all state right away
    ///
    /// The close hook runs before this returns. Notifications the transport
    /// still produces afterwards are ignored.
    pub fn disconnect(&self) {
        let (transport, pump) = {
            let mut core = self.inner.core.lock();
            (core.transport.take(), core.pump.take())
        };

        if let Some(pump) = pump {
            pump.abort();
        }
        let Some(transport) = transport else {
            tracing::debug!("Disconnect without a transport");
            self.inner.reset();
            return;
        };

        tracing::info!("Disconnecting");
        transport.close();
        self.inner.reset();
        self.inner.hooks.close(&CloseEvent::normal("client disconnect"));
    }

    #[must_use]
    pub fn socket_id(&self) -> Option<String> {
        self.inner.core.lock().socket_id.clone()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.core.lock().state
    }

    #[must_use]
    pub fn is_connection_established(&self) -> bool {
        self.state().is_established()
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl fmt::Debug for FungiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("FungiClient")
            .field("endpoint", &self.inner.config.ws_endpoint)
            .field("state", &core.state)
            .field("socket_id", &core.socket_id)
            .field("channels", &self.inner.channels.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`FungiClient`]
pub struct ClientBuilder {
    config: ClientConfig,
    hooks: ClientHooks,
    authorizer: Option<Arc<dyn Authorizer>>,
    transport: Option<(
        Arc<dyn Transport>,
        Option<mpsc::UnboundedReceiver<TransportEvent>>,
    )>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            hooks: ClientHooks::default(),
            authorizer: None,
            transport: None,
        }
    }

    /// Replace every hook at once
    pub fn hooks(mut self, hooks: ClientHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, u16) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_error(hook);
        self
    }

    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_close(hook);
        self
    }

    pub fn on_connection_established<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_connection_established(hook);
        self
    }

    pub fn on_open<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_open(hook);
        self
    }

    pub fn on_transport_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_transport_error(hook);
        self
    }

    /// Use a custom authorizer instead of the HTTP one
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Use a custom transport instead of the WebSocket one
    pub fn transport(
        mut self,
        transport: Arc<dyn Transport>,
        events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    ) -> Self {
        self.transport = Some((transport, events));
        self
    }

    /// Validate the config and create the client
    pub fn build(self) -> Result<FungiClient, ClientError> {
        self.config.validate()?;

        let authorizer: Arc<dyn Authorizer> = match self.authorizer {
            Some(authorizer) => authorizer,
            None => Arc::new(HttpAuthorizer::new(self.config.auth.as_ref())?),
        };

        let defer = self.config.client_only && !browser_like();
        let client = FungiClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                hooks: self.hooks,
                authorizer,
                core: Mutex::new(ConnectionCore::default()),
                channels: ChannelRegistry::new(),
                dispatch: ReentrantMutex::new(()),
            }),
        };

        match self.transport {
            Some((transport, events)) => client.attach(transport, events),
            None if defer => tracing::debug!("client_only set, connect deferred"),
            None => client.connect()?,
        }

        Ok(client)
    }
}

/// Whether the build targets a browser
fn browser_like() -> bool {
    cfg!(target_arch = "wasm32")
}

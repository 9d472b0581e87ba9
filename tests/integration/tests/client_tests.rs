//! Client Integration Tests
//!
//! Drive the client through an in-memory transport, a local auth endpoint
//! and a minimal realtime server. No external services needed.
//!
//! Run with: cargo test -p integration-tests --test client_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fungi_client::{
    AuthConfig, Channel, ClientConfig, ClientError, ConfigError, ConnectionState, FungiClient,
    Transport, TransportEvent, TriggerError,
};
use integration_tests::*;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::Level;

const WAIT: Duration = Duration::from_secs(5);

fn counter() -> (Arc<AtomicUsize>, impl Fn(&Value) + Send + Sync + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&hits);
    (hits, move |_: &Value| {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

fn subscribed(client: &FungiClient, name: &str) -> Channel {
    let channel = client.subscribe(name);
    client.handle_event(message(subscription_succeeded(name)));
    assert!(channel.is_subscribed());
    channel
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_keep_alive_latency_bounds() {
    for latency in [4, 31] {
        let config = test_config().with_keep_alive_latency(latency);
        let err = FungiClient::builder(config)
            .transport(MockTransport::new(), None)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Config(ConfigError::KeepAliveLatencyOutOfRange(l)) if l == latency
        ));
    }

    for latency in [5, 30] {
        let config = test_config().with_keep_alive_latency(latency);
        assert!(FungiClient::builder(config)
            .transport(MockTransport::new(), None)
            .build()
            .is_ok());
    }
}

// ============================================================================
// Subscription lifecycle
// ============================================================================

#[test]
fn test_subscribe_before_connection_established() {
    let (client, transport) = mock_client(|b| b);
    let name = unique_channel();

    let channel = client.subscribe(&name);
    assert!(!channel.is_subscribed());
    assert!(transport.frames().is_empty());

    establish(&client, 120);
    let subscribes = transport.messages_for("fungi:subscribe");
    assert_eq!(subscribes.len(), 1);
    assert_eq!(subscribes[0].data, json!({"channel": name}));

    client.handle_event(message(subscription_succeeded(&name)));
    assert!(channel.is_subscribed());
}

#[test]
fn test_subscribe_twice_returns_same_channel() {
    let (client, _transport) = mock_client(|b| b);

    let first = client.subscribe("room-1");
    let second = client.subscribe("room-1");

    assert!(Channel::ptr_eq(&first, &second));
    assert_eq!(client.channel_count(), 1);
}

#[test]
fn test_every_registered_channel_resubscribes_on_established() {
    let (client, transport) = mock_client(|b| b);
    let names: Vec<String> = (0..3).map(|_| unique_channel()).collect();
    for name in &names {
        client.subscribe(name);
    }

    establish(&client, 120);
    assert_eq!(transport.messages_for("fungi:subscribe").len(), 3);

    // The transport reconnected on its own and the server greets again
    transport.clear();
    establish(&client, 120);
    let channels: Vec<String> = transport
        .messages_for("fungi:subscribe")
        .into_iter()
        .filter_map(|m| m.data["channel"].as_str().map(str::to_string))
        .collect();
    assert_eq!(channels.len(), 3);
    for name in &names {
        assert!(channels.contains(name));
    }
}

#[test]
fn test_unsubscribe_waits_for_confirmation() {
    let (client, transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = subscribed(&client, "room-1");

    client.unsubscribe("room-1");
    assert_eq!(transport.messages_for("fungi:unsubscribe").len(), 1);
    assert!(channel.is_subscribed());

    client.handle_event(message(unsubscription_succeeded("room-1")));
    assert!(!channel.is_subscribed());

    // Unknown and unsubscribed channels are no-ops
    client.unsubscribe("room-1");
    client.unsubscribe("never-registered");
    assert_eq!(transport.messages_for("fungi:unsubscribe").len(), 1);
}

#[test]
fn test_subscription_error_fires_handlers_and_keeps_channel() {
    let (client, _transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = client.subscribe("room-1");

    let reasons = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reasons);
    channel.on("fungi:subscription_error", move |data| {
        sink.lock().push(data["reason"].as_str().unwrap_or_default().to_string());
    });

    client.handle_event(message(subscription_error("room-1", "over capacity")));

    assert_eq!(*reasons.lock(), vec!["over capacity".to_string()]);
    assert!(!channel.is_subscribed());
    assert!(client.channel("room-1").is_some());
}

#[test]
fn test_confirmation_for_unknown_channel_is_dropped() {
    let (client, _transport) = mock_client(|b| b);
    establish(&client, 120);

    client.handle_event(message(subscription_succeeded("ghost")));
    assert!(client.channel("ghost").is_none());
    assert_eq!(client.channel_count(), 0);
}

// ============================================================================
// Event routing
// ============================================================================

#[test]
fn test_handler_kinds_fire_as_registered() {
    let (client, _transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = subscribed(&client, "room-1");

    let (persistent, on_score) = counter();
    let (one_time, once_score) = counter();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    channel.on("score", on_score);
    channel.once("score", once_score);
    channel.on_any(move |channel, event, _| sink.lock().push(format!("{channel}/{event}")));

    for n in 0..3 {
        client.handle_event(message(triggered("room-1", "score", json!({"n": n}))));
    }
    client.handle_event(message(triggered("room-1", "chat", json!({}))));

    assert_eq!(persistent.load(Ordering::SeqCst), 3);
    assert_eq!(one_time.load(Ordering::SeqCst), 1);
    assert_eq!(
        *seen.lock(),
        vec!["room-1/score", "room-1/score", "room-1/score", "room-1/chat"]
    );
}

#[test]
fn test_firing_order_within_one_message() {
    let (client, _transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = subscribed(&client, "room-1");

    let order = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&order);
    channel.on_any(move |_, _, _| log.lock().push("any"));
    let log = Arc::clone(&order);
    channel.once("score", move |_| log.lock().push("once"));
    let log = Arc::clone(&order);
    channel.on("score", move |_| log.lock().push("on"));

    client.handle_event(message(triggered("room-1", "score", json!({}))));
    assert_eq!(*order.lock(), vec!["on", "once", "any"]);
}

#[test]
fn test_off_without_events_keeps_once_and_catch_all() {
    let (client, _transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = subscribed(&client, "room-1");

    let (persistent, on_score) = counter();
    let (one_time, once_score) = counter();
    let (any_hits, _) = counter();
    let any_handle = Arc::clone(&any_hits);

    channel.on("score", on_score);
    channel.on("chat", |_| {});
    channel.once("score", once_score);
    channel.on_any(move |_, _, _| {
        any_handle.fetch_add(1, Ordering::SeqCst);
    });

    channel.off(&[]);
    client.handle_event(message(triggered("room-1", "score", json!({}))));

    assert_eq!(persistent.load(Ordering::SeqCst), 0);
    assert_eq!(one_time.load(Ordering::SeqCst), 1);
    assert_eq!(any_hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_triggered_event_dropped_while_unsubscribed() {
    let (logs, _guard) = LogCapture::install();
    let (client, _transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = client.subscribe("room-1");

    let (hits, on_score) = counter();
    channel.on("score", on_score);
    let (any_hits, _) = counter();
    let any_handle = Arc::clone(&any_hits);
    channel.on_any(move |_, _, _| {
        any_handle.fetch_add(1, Ordering::SeqCst);
    });

    client.handle_event(message(triggered("room-1", "score", json!({"n": 3}))));
    client.handle_event(message(triggered("elsewhere", "score", json!({"n": 3}))));

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(any_hits.load(Ordering::SeqCst), 0);
    assert_eq!(logs.count(Level::WARN, "No handler bound"), 0);
}

#[test]
fn test_unhandled_event_on_subscribed_channel_warns() {
    let (logs, _guard) = LogCapture::install();
    let (client, _transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = subscribed(&client, "room-1");

    let (hits, on_chat) = counter();
    channel.on("chat", on_chat);

    client.handle_event(message(triggered("room-1", "score", json!({}))));
    assert_eq!(logs.count(Level::WARN, "No handler bound"), 1);

    // Catch-all handlers count as bound
    logs.clear();
    client.handle_event(message(triggered("room-1", "chat", json!({}))));
    channel.on_any(|_, _, _| {});
    client.handle_event(message(triggered("room-1", "score", json!({}))));

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(logs.count(Level::WARN, "No handler bound"), 0);
}

#[test]
fn test_handlers_can_call_back_into_client() {
    let (client, transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = subscribed(&client, "room-1");

    let inner = client.clone();
    channel.once("bye", move |_| inner.unsubscribe("room-1"));
    client.handle_event(message(triggered("room-1", "bye", Value::Null)));

    assert_eq!(transport.messages_for("fungi:unsubscribe").len(), 1);
}

#[test]
fn test_malformed_frames_are_dropped() {
    let (client, _transport) = mock_client(|b| b);
    establish(&client, 120);
    let channel = subscribed(&client, "room-1");
    let (hits, on_score) = counter();
    channel.on("score", on_score);

    client.handle_event(TransportEvent::Message("{\"event\":".to_string()));
    client.handle_event(TransportEvent::Message("fungi:pong".to_string()));
    client.handle_event(message(triggered("room-1", "score", json!({}))));

    assert!(client.is_connection_established());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_server_error_reaches_hook() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let (client, _transport) =
        mock_client(|b| b.on_error(move |message, code| sink.lock().push((message.to_string(), code))));

    client.handle_event(message(server_error("Over quota", 4004)));
    assert_eq!(*errors.lock(), vec![("Over quota".to_string(), 4004)]);
}

// ============================================================================
// Client events
// ============================================================================

#[test]
fn test_trigger_on_public_channel_always_fails() {
    let (client, transport) = mock_client(|b| b);
    establish(&client, 120);

    let channel = client.subscribe("room-1");
    assert!(matches!(
        channel.trigger("client-score", json!({})),
        Err(TriggerError::NotSubscribed { .. })
    ));

    client.handle_event(message(subscription_succeeded("room-1")));
    for event in ["client-score", "score"] {
        let err = channel.trigger(event, json!({})).unwrap_err();
        assert!(matches!(err, TriggerError::NotPrivate { .. }));
        assert!(err.is_rejected());
    }

    assert!(transport.messages_for("fungi:trigger").is_empty());
}

#[tokio::test]
async fn test_trigger_on_private_channel() {
    let authorizer = GatedAuthorizer::new();
    let (client, transport) = mock_client(|b| b.authorizer(authorizer.clone()));
    establish(&client, 120);

    let name = unique_private_channel();
    let channel = client.subscribe(&name);

    // Pending handshake: not subscribed yet
    assert!(channel.is_pending());
    assert!(matches!(
        channel.trigger("client-typing", json!({})),
        Err(TriggerError::NotSubscribed { .. })
    ));

    authorizer.release();
    assert!(wait_until(WAIT, || !channel.is_pending()).await);
    client.handle_event(message(subscription_succeeded(&name)));

    assert!(matches!(
        channel.trigger("typing", json!({})),
        Err(TriggerError::InvalidEventName { .. })
    ));
    channel.trigger("client-typing", json!({"user": 7})).unwrap();

    let triggers = transport.messages_for("fungi:trigger");
    assert_eq!(triggers.len(), 1);
    assert_eq!(
        triggers[0].data,
        json!({"event": "client-typing", "channel": name, "data": {"user": 7}})
    );
}

// ============================================================================
// Auth handshake
// ============================================================================

#[tokio::test]
async fn test_private_subscribe_through_http_auth() {
    let server = TestAuthServer::start(AuthBehavior::Token).await.unwrap();
    let config = test_config().with_auth(server.auth_config());
    let (client, transport) = mock_client_with_config(config, |b| b);
    let socket_id = establish(&client, 120);

    let name = unique_private_channel();
    let channel = client.subscribe(&name);
    assert!(wait_until(WAIT, || !transport.messages_for("fungi:subscribe").is_empty()).await);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        json!({"socket_id": socket_id, "channel_name": name})
    );
    assert_eq!(requests[0].api_key.as_deref(), Some("test-key"));

    let subscribe = &transport.messages_for("fungi:subscribe")[0];
    assert_eq!(
        subscribe.data,
        json!({"channel": name, "auth": format!("test-key:{socket_id}:{name}")})
    );
    assert!(!channel.is_subscribed());
}

#[tokio::test]
async fn test_private_subscribe_without_auth_endpoint() {
    let (client, transport) = mock_client(|b| b);
    establish(&client, 120);

    let channel = client.subscribe("private-room-1");
    assert!(wait_until(WAIT, || !channel.is_pending()).await);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(transport.messages_for("fungi:subscribe").is_empty());
    assert!(!channel.is_subscribed());
}

#[tokio::test]
async fn test_failed_auth_sends_nothing() {
    for behavior in [AuthBehavior::Status(403), AuthBehavior::NoToken] {
        let server = TestAuthServer::start(behavior).await.unwrap();
        let config = test_config().with_auth(server.auth_config());
        let (client, transport) = mock_client_with_config(config, |b| b);
        establish(&client, 120);

        let channel = client.subscribe(&unique_private_channel());
        assert!(wait_until(WAIT, || !channel.is_pending()).await);

        assert_eq!(server.requests().len(), 1);
        assert!(transport.messages_for("fungi:subscribe").is_empty());
        assert!(!channel.is_subscribed());
    }
}

#[tokio::test]
async fn test_auth_timeout_abandons_subscribe() {
    let server = TestAuthServer::start(AuthBehavior::Delayed(Duration::from_secs(2)))
        .await
        .unwrap();
    let auth = AuthConfig::new(server.endpoint()).with_timeout(Duration::from_millis(100));
    let (client, transport) = mock_client_with_config(test_config().with_auth(auth), |b| b);
    establish(&client, 120);

    let channel = client.subscribe(&unique_private_channel());
    assert!(wait_until(WAIT, || !channel.is_pending()).await);
    assert!(transport.messages_for("fungi:subscribe").is_empty());
}

#[tokio::test]
async fn test_stale_auth_after_unsubscribe_is_ignored() {
    let authorizer = GatedAuthorizer::new();
    let (client, transport) = mock_client(|b| b.authorizer(authorizer.clone()));
    establish(&client, 120);

    let name = unique_private_channel();
    let channel = client.subscribe(&name);
    assert!(wait_until(WAIT, || authorizer.calls() == 1).await);

    client.unsubscribe(&name);
    assert!(!channel.is_pending());

    authorizer.release();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(transport.messages_for("fungi:subscribe").is_empty());
    assert!(transport.messages_for("fungi:unsubscribe").is_empty());
}

#[tokio::test]
async fn test_stale_auth_after_disconnect_is_ignored() {
    let authorizer = GatedAuthorizer::new();
    let (client, transport) = mock_client(|b| b.authorizer(authorizer.clone()));
    establish(&client, 120);

    let channel = client.subscribe(&unique_private_channel());
    assert!(wait_until(WAIT, || authorizer.calls() == 1).await);

    client.disconnect();
    authorizer.release();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(transport.frames().is_empty());
    assert!(!channel.is_subscribed());
    assert!(!channel.is_pending());
}

#[tokio::test]
async fn test_reestablish_restarts_pending_handshake() {
    let authorizer = GatedAuthorizer::new();
    let (client, transport) = mock_client(|b| b.authorizer(authorizer.clone()));
    establish(&client, 120);

    let name = unique_private_channel();
    client.subscribe(&name);
    assert!(wait_until(WAIT, || authorizer.calls() == 1).await);

    establish(&client, 120);
    assert!(wait_until(WAIT, || authorizer.calls() == 2).await);

    authorizer.release();
    assert!(wait_until(WAIT, || !transport.messages_for("fungi:subscribe").is_empty()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let subscribes = transport.messages_for("fungi:subscribe");
    assert_eq!(subscribes.len(), 1);
    assert_eq!(subscribes[0].data["auth"], format!("gated:{name}"));
}

// ============================================================================
// Connection state
// ============================================================================

#[test]
fn test_close_resets_connection() {
    let closes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&closes);
    let (client, _transport) = mock_client(|b| b.on_close(move |event| sink.lock().push(event.code)));

    establish(&client, 120);
    let before = subscribed(&client, "room-1");

    client.handle_event(TransportEvent::Close(fungi_client::CloseEvent::abnormal("reset")));

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.socket_id(), None);
    assert_eq!(client.channel_count(), 0);
    assert!(!before.is_subscribed());
    assert_eq!(*closes.lock(), vec![1006]);
}

#[test]
fn test_disconnect_clears_registry() {
    let (client, transport) = mock_client(|b| b);
    establish(&client, 120);
    let before = subscribed(&client, "room-1");

    client.disconnect();

    assert!(transport.is_closed());
    assert_eq!(client.socket_id(), None);
    assert_eq!(client.channel_count(), 0);

    let after = client.subscribe("room-1");
    assert!(!Channel::ptr_eq(&before, &after));
    assert!(!after.is_subscribed());
    assert!(matches!(
        client.send(fungi_client::ClientEvent::Subscribe, &json!({"channel": "room-1"})),
        Err(ClientError::NotConnected)
    ));
}

#[test]
fn test_transport_error_is_forwarded() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let (client, _transport) =
        mock_client(|b| b.on_transport_error(move |message| sink.lock().push(message.to_string())));
    establish(&client, 120);

    client.handle_event(TransportEvent::Error("connection reset".to_string()));

    assert_eq!(*errors.lock(), vec!["connection reset".to_string()]);
    assert!(client.is_connection_established());
}

#[tokio::test]
async fn test_event_pump_processes_notifications() {
    let (opened, _) = counter();
    let open_handle = Arc::clone(&opened);
    let (client, transport, events) = pumped_client(|b| {
        b.on_open(move || {
            open_handle.fetch_add(1, Ordering::SeqCst);
        })
    });
    let channel = client.subscribe("room-1");

    events.send(TransportEvent::Open).unwrap();
    events.send(message(connection_established("7.7", 120))).unwrap();
    events.send(message(subscription_succeeded("room-1"))).unwrap();

    assert!(wait_until(WAIT, || channel.is_subscribed()).await);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(client.socket_id().as_deref(), Some("7.7"));
    assert_eq!(transport.events(), vec!["fungi:subscribe"]);
}

// ============================================================================
// Keepalive
// ============================================================================

#[test]
fn test_keepalive_without_runtime_warns() {
    let (logs, _guard) = LogCapture::install();
    let config = test_config().with_keep_alive_latency(10);
    let (client, transport) = mock_client_with_config(config, |b| b);

    establish(&client, 120);

    assert!(client.is_connection_established());
    assert_eq!(transport.ping_count(), 0);
    assert_eq!(logs.count(Level::WARN, "keepalive pings"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_interval_and_stop() {
    let config = ClientConfig::new("ws://127.0.0.1:1/app").with_keep_alive_latency(30);
    let (client, transport) = mock_client_with_config(config, |b| b);
    establish(&client, 120);

    tokio::time::sleep(Duration::from_secs(89)).await;
    assert_eq!(transport.ping_count(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(transport.ping_count(), 1);

    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(transport.ping_count(), 2);

    client.handle_event(TransportEvent::Close(fungi_client::CloseEvent::normal("bye")));
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(transport.ping_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_no_keepalive_without_latency() {
    let (client, transport) = mock_client(|b| b);
    establish(&client, 120);

    tokio::time::sleep(Duration::from_secs(1000)).await;
    assert_eq!(transport.ping_count(), 0);
    assert!(client.is_connection_established());
}

// ============================================================================
// WebSocket end to end
// ============================================================================

#[tokio::test]
async fn test_websocket_round_trip() {
    let server = TestSocketServer::start(120).await.unwrap();
    let established = Arc::new(AtomicUsize::new(0));
    let hook = Arc::clone(&established);

    let client = FungiClient::builder(ClientConfig::new(server.url()))
        .on_connection_established(move || {
            hook.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let name = unique_channel();
    let channel = client.subscribe(&name);
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    channel.on("score", move |data| sink.lock().push(data.clone()));

    assert!(wait_until(WAIT, || channel.is_subscribed()).await);
    assert_eq!(established.load(Ordering::SeqCst), 1);
    assert!(client.socket_id().is_some());
    assert_eq!(server.received_events(), vec!["fungi:subscribe"]);

    assert!(server.push(triggered(&name, "score", json!({"n": 3}))));
    assert!(wait_until(WAIT, || !received.lock().is_empty()).await);
    assert_eq!(received.lock()[0], json!({"n": 3}));

    client.unsubscribe(&name);
    assert!(wait_until(WAIT, || !channel.is_subscribed()).await);

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_websocket_keepalive_gets_pong() {
    let server = TestSocketServer::start(6).await.unwrap();
    let config = ClientConfig::new(server.url()).with_keep_alive_latency(5);
    let client = FungiClient::builder(config).build().unwrap();

    assert!(wait_until(WAIT, || client.is_connection_established()).await);
    assert!(wait_until(WAIT, || server.received().iter().any(|f| f == "fungi:ping")).await);
    assert!(client.is_connection_established());

    client.disconnect();
}

#[tokio::test]
async fn test_websocket_unreachable_endpoint_closes() {
    let closes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&closes);
    let client = FungiClient::builder(
        ClientConfig::new("ws://127.0.0.1:1/app").with_connection_timeout(Duration::from_secs(2)),
    )
    .on_close(move |event| sink.lock().push(event.was_clean))
    .build()
    .unwrap();

    assert!(wait_until(WAIT, || !closes.lock().is_empty()).await);
    assert_eq!(*closes.lock(), vec![false]);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_after_server_close_opens_new_socket() {
    let closes = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&closes);
    let client = FungiClient::builder(
        ClientConfig::new("ws://127.0.0.1:1/app").with_connection_timeout(Duration::from_secs(2)),
    )
    .on_close(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    })
    .build()
    .unwrap();

    assert!(wait_until(WAIT, || closes.load(Ordering::SeqCst) == 1).await);
    assert!(matches!(
        client.send(fungi_client::ClientEvent::Subscribe, &json!({})),
        Err(ClientError::NotConnected)
    ));

    // A second attempt really goes out and fails the same way
    client.connect().unwrap();
    assert!(wait_until(WAIT, || closes.load(Ordering::SeqCst) == 2).await);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

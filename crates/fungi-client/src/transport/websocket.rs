//! WebSocket transport
//!
//! Opens one WebSocket connection on a background task and bridges it to
//! the client through two unbounded channels: commands in, events out.

use super::{CloseEvent, Transport, TransportError, TransportEvent};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands for the socket task
#[derive(Debug)]
enum TransportCommand {
    Send(String),
    Close,
}

/// Single-connection WebSocket transport
///
/// Frames sent before the socket opens are queued and flushed once it does.
#[derive(Debug)]
pub struct WebSocketTransport {
    control_tx: mpsc::UnboundedSender<TransportCommand>,
}

impl WebSocketTransport {
    /// Start connecting to `url` in the background
    ///
    /// Returns the transport handle and the stream of notifications it
    /// produces. Must be called from within a tokio runtime.
    pub fn connect(
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        runtime.spawn(Self::socket_loop(url.into(), timeout, events_tx, control_rx));

        Ok((Self { control_tx }, events_rx))
    }

    /// Background task owning the socket
    async fn socket_loop(
        url: String,
        timeout: Duration,
        events_tx: mpsc::UnboundedSender<TransportEvent>,
        mut control_rx: mpsc::UnboundedReceiver<TransportCommand>,
    ) {
        // Receivers going away just means nobody listens anymore
        let emit = |event: TransportEvent| {
            let _ = events_tx.send(event);
        };

        let socket = match Self::open(&url, timeout).await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "WebSocket connection failed");
                control_rx.close();
                emit(TransportEvent::Error(e.to_string()));
                emit(TransportEvent::Close(CloseEvent::abnormal(e.to_string())));
                return;
            }
        };

        tracing::debug!(url = %url, "WebSocket connection opened");
        emit(TransportEvent::Open);

        let (mut sink, mut stream) = socket.split();

        let close_event = loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            tracing::trace!(frame = %text, "Frame received");
                            emit(TransportEvent::Message(text));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break frame.map_or_else(
                                || CloseEvent::normal(""),
                                |frame| CloseEvent {
                                    code: u16::from(frame.code),
                                    reason: frame.reason.to_string(),
                                    was_clean: true,
                                },
                            );
                        }
                        Some(Ok(Message::Binary(_))) => {
                            tracing::debug!("Binary frames are not part of the protocol, ignoring");
                        }
                        Some(Ok(_)) => {
                            // Socket-level ping/pong is answered by tungstenite
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "WebSocket error");
                            emit(TransportEvent::Error(e.to_string()));
                            break CloseEvent::abnormal(e.to_string());
                        }
                        None => {
                            break CloseEvent::abnormal("stream ended");
                        }
                    }
                }

                cmd = control_rx.recv() => {
                    match cmd {
                        Some(TransportCommand::Send(frame)) => {
                            tracing::trace!(frame = %frame, "Frame sent");
                            if let Err(e) = sink.send(Message::Text(frame)).await {
                                tracing::warn!(error = %e, "Failed to send frame");
                                emit(TransportEvent::Error(e.to_string()));
                                break CloseEvent::abnormal(e.to_string());
                            }
                        }
                        Some(TransportCommand::Close) | None => {
                            let _ = sink.close().await;
                            break CloseEvent::normal("client closed");
                        }
                    }
                }
            }
        };

        tracing::debug!(url = %url, close = %close_event, "WebSocket connection closed");
        control_rx.close();
        emit(TransportEvent::Close(close_event));
    }

    async fn open(url: &str, timeout: Duration) -> Result<Socket, TransportError> {
        let (socket, _response) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;
        Ok(socket)
    }
}

impl Transport for WebSocketTransport {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        self.control_tx
            .send(TransportCommand::Send(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        let _ = self.control_tx.send(TransportCommand::Close);
    }

    fn is_closed(&self) -> bool {
        self.control_tx.is_closed()
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Socket abstraction and the WebSocket implementation.
//!
//! A [`Socket`] is a non-blocking view of one connection attempt. Its
//! lifecycle is reported asynchronously as [`SocketEvent`]s tagged with the
//! connection id, so events from a replaced connection can be told apart.

use futures::{SinkExt, StreamExt};
use mixlink_ipc::WireFrame;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

/// Identifies one connection attempt.
pub type ConnectionId = u64;

/// Connection lifecycle as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ReadyState::Connecting => 0,
            ReadyState::Open => 1,
            ReadyState::Closing => 2,
            ReadyState::Closed => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEventKind {
    Opened,
    /// One inbound text frame.
    Message(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEvent {
    pub connection: ConnectionId,
    pub kind: SocketEventKind,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection is not open ({0:?})")]
    NotOpen(ReadyState),
    #[error("Connection task has stopped")]
    ChannelClosed,
}

/// One connection to the processor.
pub trait Socket: Send {
    fn id(&self) -> ConnectionId;
    fn ready_state(&self) -> ReadyState;
    /// Hands one frame to the connection. Frames are written in call order.
    fn send(&mut self, frame: &WireFrame) -> Result<(), TransportError>;
    fn close(&mut self);
}

/// Opens connections. Each call starts a new, independent attempt.
pub trait Connector: Send {
    fn connect(&mut self, address: &str) -> Box<dyn Socket>;
}

#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Opens WebSocket connections on a tokio runtime.
pub struct WsConnector {
    events: UnboundedSender<SocketEvent>,
    runtime: Handle,
    next_id: Arc<AtomicU64>,
}

impl WsConnector {
    /// Returns the connector and the stream of events for all its sockets.
    pub fn new(runtime: Handle) -> (Self, UnboundedReceiver<SocketEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let connector = Self {
            events,
            runtime,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (connector, rx)
    }
}

impl Connector for WsConnector {
    fn connect(&mut self, address: &str) -> Box<dyn Socket> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(AtomicU8::new(ReadyState::Connecting.as_u8()));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        debug!("Opening connection {} to {}", id, address);
        self.runtime.spawn(run_connection(
            id,
            address.to_string(),
            state.clone(),
            outbound_rx,
            self.events.clone(),
        ));

        Box::new(WsSocket {
            id,
            state,
            outbound: outbound_tx,
        })
    }
}

/// Handle to one WebSocket connection task.
pub struct WsSocket {
    id: ConnectionId,
    state: Arc<AtomicU8>,
    outbound: UnboundedSender<Outbound>,
}

impl Socket for WsSocket {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn send(&mut self, frame: &WireFrame) -> Result<(), TransportError> {
        let state = self.ready_state();
        if state != ReadyState::Open {
            return Err(TransportError::NotOpen(state));
        }
        self.outbound
            .send(Outbound::Frame(frame.as_str().to_string()))
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn close(&mut self) {
        if self.ready_state() != ReadyState::Closed {
            self.state
                .store(ReadyState::Closing.as_u8(), Ordering::Release);
        }
        let _ = self.outbound.send(Outbound::Close);
    }
}

async fn run_connection(
    id: ConnectionId,
    address: String,
    state: Arc<AtomicU8>,
    mut outbound: UnboundedReceiver<Outbound>,
    events: UnboundedSender<SocketEvent>,
) {
    let emit = |kind| {
        let _ = events.send(SocketEvent {
            connection: id,
            kind,
        });
    };

    match tokio_tungstenite::connect_async(address.as_str()).await {
        Ok((stream, _response)) => {
            info!("Connection {} open to {}", id, address);
            state.store(ReadyState::Open.as_u8(), Ordering::Release);
            emit(SocketEventKind::Opened);

            let (mut sink, mut source) = stream.split();
            loop {
                tokio::select! {
                    outgoing = outbound.recv() => match outgoing {
                        Some(Outbound::Frame(text)) => {
                            trace!("Connection {} -> {}", id, text);
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                warn!("Connection {} write failed: {}", id, e);
                                break;
                            }
                        }
                        Some(Outbound::Close) | None => {
                            let _ = sink.close().await;
                            break;
                        }
                    },
                    incoming = source.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            trace!("Connection {} <- {}", id, text);
                            emit(SocketEventKind::Message(text));
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Connection {} read failed: {}", id, e);
                            break;
                        }
                    },
                }
            }
        }
        Err(e) => {
            warn!("Failed to connect to {}: {}", address, e);
        }
    }

    state.store(ReadyState::Closed.as_u8(), Ordering::Release);
    let discarded = discard_pending(&mut outbound);
    if discarded > 0 {
        warn!(
            "Connection {} closed with {} unsent frames discarded",
            id, discarded
        );
    }
    debug!("Connection {} closed", id);
    emit(SocketEventKind::Closed);
}

/// Closes the outbound queue and drops what is left, returning the number of
/// frames that never reached the wire.
fn discard_pending(outbound: &mut UnboundedReceiver<Outbound>) -> usize {
    outbound.close();
    let mut discarded = 0;
    while let Ok(item) = outbound.try_recv() {
        if let Outbound::Frame(_) = item {
            discarded += 1;
        }
    }
    discarded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_encoding() {
        for state in [
            ReadyState::Connecting,
            ReadyState::Open,
            ReadyState::Closing,
            ReadyState::Closed,
        ] {
            assert_eq!(ReadyState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn test_discard_pending_counts_unsent_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Outbound::Frame("{\"a\":1}".to_string())).unwrap();
        tx.send(Outbound::Close).unwrap();
        tx.send(Outbound::Frame("{\"b\":2}".to_string())).unwrap();

        assert_eq!(discard_pending(&mut rx), 2);
        // Later sends fail instead of piling up.
        assert!(tx.send(Outbound::Frame("{}".to_string())).is_err());
        assert_eq!(discard_pending(&mut rx), 0);
    }

    #[tokio::test]
    async fn test_refused_connection_reports_closed() {
        // Bind and drop to get a port with nothing listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let (mut connector, mut events) = WsConnector::new(Handle::current());
        let mut socket = connector.connect(&format!("ws://127.0.0.1:{}", port));
        assert_eq!(socket.ready_state(), ReadyState::Connecting);

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.connection, socket.id());
        assert_eq!(event.kind, SocketEventKind::Closed);
        assert_eq!(socket.ready_state(), ReadyState::Closed);

        let frame = WireFrame::new("{}".to_string());
        assert!(matches!(
            socket.send(&frame),
            Err(TransportError::NotOpen(ReadyState::Closed))
        ));
    }
}

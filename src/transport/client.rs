// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Connection state machine and outbound queue.
//!
//! `TransportClient` does no I/O of its own: it reacts to ticks and socket
//! events, drives a [`Socket`] and collects the bus events it wants published.
//! Callers drain those with [`TransportClient::take_events`] once they no
//! longer hold the client, which keeps re-entrant publishes deadlock-free.

use super::scheduler::{Scheduler, TICK_INTERVAL};
use super::socket::{Connector, ReadyState, Socket, SocketEvent, SocketEventKind};
use crate::message::Event;
use mixlink_ipc::{decode, encode, CodecError, Command, ConnectionState, Decoded, WireFrame};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, info, trace, warn};

pub struct TransportClient {
    address: String,
    state: ConnectionState,
    /// Encoded frames awaiting transmission, oldest first.
    queue: VecDeque<WireFrame>,
    socket: Box<dyn Socket>,
    connector: Box<dyn Connector>,
    scheduler: Box<dyn Scheduler>,
    pending_events: Vec<Event>,
}

impl TransportClient {
    /// Starts connecting to `address` and arms the tick.
    pub fn new(
        address: impl Into<String>,
        mut connector: Box<dyn Connector>,
        mut scheduler: Box<dyn Scheduler>,
    ) -> Self {
        let address = address.into();
        info!("Connecting to audio processor at {}", address);
        let socket = connector.connect(&address);
        scheduler.arm(TICK_INTERVAL);

        Self {
            address,
            state: ConnectionState::Disconnected,
            queue: VecDeque::new(),
            socket,
            connector,
            scheduler,
            pending_events: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Number of frames waiting to be sent.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Encodes a command given by name and positional arguments and queues it.
    ///
    /// Unknown names and wrong argument counts are returned to the caller and
    /// nothing is queued.
    pub fn send_command(&mut self, name: &str, args: &[Value]) -> Result<(), CodecError> {
        let frame = encode(name, args)?;
        self.enqueue(frame);
        Ok(())
    }

    /// Queues a typed command.
    pub fn send(&mut self, command: &Command) -> Result<(), CodecError> {
        let frame = command.encode()?;
        self.enqueue(frame);
        Ok(())
    }

    fn enqueue(&mut self, frame: WireFrame) {
        trace!("Queueing frame: {}", frame);
        self.queue.push_back(frame);
        self.tick();
    }

    /// Periodic work: flush when connected, reconnect when closed.
    ///
    /// The tick is disarmed for the duration of the call and re-armed at the
    /// end; `&mut self` already rules out a nested tick.
    pub fn tick(&mut self) {
        self.scheduler.disarm();

        match self.socket.ready_state() {
            ReadyState::Open => {
                if self.state != ConnectionState::Connected {
                    info!("Connected to {}", self.address);
                }
                self.state = ConnectionState::Connected;
                self.flush();
            }
            ReadyState::Connecting => {
                self.state = ConnectionState::Connecting;
            }
            ReadyState::Closing => {
                self.state = ConnectionState::Disconnected;
            }
            ReadyState::Closed => {
                self.state = ConnectionState::Disconnected;
                self.reconnect();
            }
        }

        self.publish_state();
        self.scheduler.arm(TICK_INTERVAL);
    }

    /// Queues `ws_state_changed` with the operator-facing state.
    fn publish_state(&mut self) {
        self.pending_events
            .push(Event::WsStateChanged(self.state.indicator()));
    }

    /// Sends queued frames front to back. A frame leaves the queue only once
    /// the socket accepted it.
    fn flush(&mut self) {
        while let Some(frame) = self.queue.front() {
            match self.socket.send(frame) {
                Ok(()) => {
                    self.queue.pop_front();
                }
                Err(e) => {
                    warn!("Send failed, {} frames kept queued: {}", self.queue.len(), e);
                    self.state = ConnectionState::Disconnected;
                    break;
                }
            }
        }
    }

    fn reconnect(&mut self) {
        debug!("Reconnecting to {}", self.address);
        self.socket = self.connector.connect(&self.address);
    }

    /// Replaces the server address and reconnects. Queued frames are kept
    /// and go out on the new connection.
    pub fn change_address(&mut self, address: impl Into<String>) {
        self.scheduler.disarm();

        let address = address.into();
        info!(
            "Changing server address from {} to {} ({} frames queued)",
            self.address,
            address,
            self.queue.len()
        );
        // Events still in flight from the old socket no longer match its id.
        self.socket.close();
        self.address = address;
        self.socket = self.connector.connect(&self.address);
        self.state = ConnectionState::Connecting;

        self.scheduler.arm(TICK_INTERVAL);
    }

    /// Reacts to a lifecycle event or inbound frame from a socket.
    pub fn handle_socket_event(&mut self, event: SocketEvent) {
        if event.connection != self.socket.id() {
            trace!("Ignoring event from detached connection {}", event.connection);
            return;
        }

        match event.kind {
            SocketEventKind::Opened => {
                info!("Connected to {}", self.address);
                self.state = ConnectionState::Connected;
                self.flush();
                self.publish_state();
            }
            SocketEventKind::Closed => {
                if self.state != ConnectionState::Disconnected {
                    warn!("Connection to {} lost", self.address);
                }
                self.state = ConnectionState::Disconnected;
                self.publish_state();
            }
            SocketEventKind::Message(raw) => self.handle_message(&raw),
        }
    }

    fn handle_message(&mut self, raw: &str) {
        match decode(raw) {
            Ok(Decoded::Command(command)) => {
                let name = command.name();
                match Event::from_notification(command) {
                    Some(event) => self.pending_events.push(event),
                    None => debug!("Ignoring non-notification frame: {}", name),
                }
            }
            Ok(Decoded::Unrecognized { command_type }) => {
                warn!("Unknown message type: {}", command_type);
            }
            Err(e) => {
                warn!("Dropping inbound frame: {}", e);
            }
        }
    }

    /// Closes the current connection without reconnecting.
    pub fn shutdown(&mut self) {
        self.scheduler.disarm();
        self.socket.close();
        self.state = ConnectionState::Disconnected;
    }

    /// Events produced since the last call, in order.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }
}

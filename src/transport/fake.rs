// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! In-memory sockets and a manual scheduler for transport tests.

use super::scheduler::Scheduler;
use super::socket::{ConnectionId, Connector, ReadyState, Socket, TransportError};
use mixlink_ipc::WireFrame;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct FakeConnection {
    id: ConnectionId,
    address: String,
    state: ReadyState,
    sent: Vec<String>,
    /// Number of further sends that succeed, unlimited when `None`.
    send_budget: Option<usize>,
    closed_by_client: bool,
}

/// Every connection opened through its connectors, in order.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    connections: Arc<Mutex<Vec<FakeConnection>>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            network: self.clone(),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.connections
            .lock()
            .iter()
            .map(|c| c.address.clone())
            .collect()
    }

    pub fn id(&self, index: usize) -> ConnectionId {
        self.connections.lock()[index].id
    }

    pub fn sent(&self, index: usize) -> Vec<String> {
        self.connections.lock()[index].sent.clone()
    }

    pub fn was_closed(&self, index: usize) -> bool {
        self.connections.lock()[index].closed_by_client
    }

    pub fn open(&self, index: usize) {
        self.connections.lock()[index].state = ReadyState::Open;
    }

    pub fn close(&self, index: usize) {
        self.connections.lock()[index].state = ReadyState::Closed;
    }

    pub fn fail_sends_after(&self, index: usize, successes: usize) {
        self.connections.lock()[index].send_budget = Some(successes);
    }
}

pub struct FakeConnector {
    network: FakeNetwork,
}

impl Connector for FakeConnector {
    fn connect(&mut self, address: &str) -> Box<dyn Socket> {
        let mut connections = self.network.connections.lock();
        let index = connections.len();
        let id = 100 + index as ConnectionId;
        connections.push(FakeConnection {
            id,
            address: address.to_string(),
            state: ReadyState::Connecting,
            sent: Vec::new(),
            send_budget: None,
            closed_by_client: false,
        });
        Box::new(FakeSocket {
            id,
            index,
            network: self.network.clone(),
        })
    }
}

struct FakeSocket {
    id: ConnectionId,
    index: usize,
    network: FakeNetwork,
}

impl Socket for FakeSocket {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn ready_state(&self) -> ReadyState {
        self.network.connections.lock()[self.index].state
    }

    fn send(&mut self, frame: &WireFrame) -> Result<(), TransportError> {
        let mut connections = self.network.connections.lock();
        let connection = &mut connections[self.index];
        if connection.state != ReadyState::Open {
            return Err(TransportError::NotOpen(connection.state));
        }
        match &mut connection.send_budget {
            Some(0) => return Err(TransportError::ChannelClosed),
            Some(n) => *n -= 1,
            None => {}
        }
        connection.sent.push(frame.as_str().to_string());
        Ok(())
    }

    fn close(&mut self) {
        let mut connections = self.network.connections.lock();
        let connection = &mut connections[self.index];
        connection.state = ReadyState::Closed;
        connection.closed_by_client = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCall {
    Arm(Duration),
    Disarm,
}

/// Records arm/disarm calls; ticks are fired by calling `tick()` directly.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    calls: Arc<Mutex<Vec<SchedulerCall>>>,
    armed: Arc<Mutex<bool>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, period: Duration) {
        self.calls.lock().push(SchedulerCall::Arm(period));
        *self.armed.lock() = true;
    }

    fn disarm(&mut self) {
        self.calls.lock().push(SchedulerCall::Disarm);
        *self.armed.lock() = false;
    }

    fn is_armed(&self) -> bool {
        *self.armed.lock()
    }
}

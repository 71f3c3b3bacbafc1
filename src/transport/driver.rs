// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runs a transport on the tokio runtime.
//!
//! One task owns the socket event stream and the tick timer and feeds both
//! into the shared [`TransportHandle`], so ticks and socket callbacks never
//! overlap.

use super::client::TransportClient;
use super::handle::{BusBridge, TransportHandle};
use super::scheduler::TimerHandle;
use super::socket::{SocketEvent, WsConnector};
use crate::event_bus::EventBus;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A running transport attached to a bus.
pub struct TransportService {
    handle: TransportHandle,
    bridge: BusBridge,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TransportService {
    /// Connects to `address` and starts serving bus requests.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(address: impl Into<String>, bus: EventBus) -> Self {
        let (connector, socket_events) = WsConnector::new(Handle::current());
        let timer = TimerHandle::new();
        let client = TransportClient::new(address, Box::new(connector), Box::new(timer.clone()));
        let handle = TransportHandle::new(client, bus);
        let bridge = handle.attach();

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(drive(handle.clone(), timer, socket_events, stop_rx));

        Self {
            handle,
            bridge,
            stop,
            task,
        }
    }

    pub fn handle(&self) -> &TransportHandle {
        &self.handle
    }

    /// Detaches from the bus, closes the connection and waits for the driver.
    pub async fn shutdown(self) {
        info!("Shutting down transport");
        self.bridge.detach();
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!("Transport driver ended abnormally: {}", e);
        }
        self.handle.shutdown();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn drive(
    handle: TransportHandle,
    timer: TimerHandle,
    mut socket_events: UnboundedReceiver<SocketEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    debug!("Transport driver started");
    loop {
        let deadline = timer.deadline();
        tokio::select! {
            biased;
            _ = &mut stop => break,
            event = socket_events.recv() => match event {
                Some(event) => handle.handle_socket_event(event),
                None => break,
            },
            _ = sleep_until(deadline) => handle.tick(),
            // Re-read the deadline after an arm or disarm.
            _ = timer.changed() => {}
        }
    }
    debug!("Transport driver stopped");
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Connection to the audio processor: queueing, reconnects and framing.

mod client;
mod driver;
mod handle;
mod scheduler;
mod socket;

#[cfg(test)]
mod fake;

pub use client::TransportClient;
pub use driver::TransportService;
pub use handle::{BusBridge, TransportHandle};
pub use scheduler::{Scheduler, TimerHandle, TICK_INTERVAL};
pub use socket::{
    ConnectionId, Connector, ReadyState, Socket, SocketEvent, SocketEventKind, TransportError,
    WsConnector,
};

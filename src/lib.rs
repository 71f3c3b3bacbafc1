// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mixlink - control client for a networked eight-channel audio processor.
//!
//! Requests travel over an [`EventBus`] to the [`transport`], which queues
//! and sends them over a WebSocket and republishes the processor's
//! notifications. The [`eq`] module draws and edits equalizer curves.

pub mod config;
pub mod eq;
pub mod event_bus;
pub mod message;
pub mod state;
pub mod transport;

pub use event_bus::{EventBus, SubscriptionId};
pub use message::{Event, Topic};

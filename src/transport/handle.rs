// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared access to the transport and its wiring to the event bus.

use super::client::TransportClient;
use super::socket::SocketEvent;
use crate::event_bus::{EventBus, SubscriptionId};
use crate::message::{Event, Topic};
use mixlink_ipc::{CodecError, Command, ConnectionState};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Cloneable handle to one [`TransportClient`].
///
/// Every call locks the client, runs, unlocks, and only then publishes the
/// events the client produced.
#[derive(Clone)]
pub struct TransportHandle {
    client: Arc<Mutex<TransportClient>>,
    bus: EventBus,
}

impl TransportHandle {
    pub fn new(client: TransportClient, bus: EventBus) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            bus,
        }
    }

    fn with_client<R>(&self, f: impl FnOnce(&mut TransportClient) -> R) -> R {
        let (result, events) = {
            let mut client = self.client.lock();
            let result = f(&mut client);
            (result, client.take_events())
        };
        for event in events {
            self.bus.publish(event);
        }
        result
    }

    pub fn send_command(&self, name: &str, args: &[Value]) -> Result<(), CodecError> {
        self.with_client(|client| client.send_command(name, args))
    }

    pub fn send(&self, command: &Command) -> Result<(), CodecError> {
        self.with_client(|client| client.send(command))
    }

    pub fn tick(&self) {
        self.with_client(TransportClient::tick)
    }

    pub fn change_address(&self, address: impl Into<String>) {
        let address = address.into();
        self.with_client(|client| client.change_address(address))
    }

    pub fn handle_socket_event(&self, event: SocketEvent) {
        self.with_client(|client| client.handle_socket_event(event))
    }

    pub fn shutdown(&self) {
        self.with_client(TransportClient::shutdown)
    }

    pub fn state(&self) -> ConnectionState {
        self.client.lock().state()
    }

    pub fn address(&self) -> String {
        self.client.lock().address().to_string()
    }

    pub fn queued(&self) -> usize {
        self.client.lock().queued()
    }

    /// Subscribes the transport to every request topic it serves.
    pub fn attach(&self) -> BusBridge {
        let mut subscriptions = Vec::new();

        for topic in Topic::DEVICE_REQUESTS {
            let transport = self.clone();
            let id = self.bus.subscribe(topic, move |event| {
                let Some(command) = event.to_command() else {
                    return;
                };
                // Typed commands always match their schema.
                if let Err(e) = transport.send(&command) {
                    error!("Failed to queue {}: {}", command.name(), e);
                }
            });
            subscriptions.push((topic, id));
        }

        let transport = self.clone();
        let id = self.bus.subscribe(Topic::SetWsAddress, move |event| {
            if let Event::SetWsAddress(address) = event {
                transport.change_address(address.clone());
            }
        });
        subscriptions.push((Topic::SetWsAddress, id));

        let transport = self.clone();
        let id = self.bus.subscribe(Topic::GetWsAddress, move |_| {
            let address = transport.address();
            transport.bus.publish(Event::NotifyWsAddress(address));
        });
        subscriptions.push((Topic::GetWsAddress, id));

        let transport = self.clone();
        let id = self.bus.subscribe(Topic::GetWsState, move |_| {
            let state = transport.state().indicator();
            transport.bus.publish(Event::NotifyWsState(state));
        });
        subscriptions.push((Topic::GetWsState, id));

        debug!("Transport attached to {} bus topics", subscriptions.len());
        BusBridge {
            bus: self.bus.clone(),
            subscriptions,
        }
    }
}

/// Bus subscriptions held on behalf of a transport. Dropping it detaches.
pub struct BusBridge {
    bus: EventBus,
    subscriptions: Vec<(Topic, SubscriptionId)>,
}

impl BusBridge {
    pub fn detach(self) {}
}

impl Drop for BusBridge {
    fn drop(&mut self) {
        for (topic, id) in self.subscriptions.drain(..) {
            self.bus.unsubscribe(topic, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake::{FakeNetwork, ManualScheduler};
    use super::*;
    use mixlink_ipc::{ChannelRef, FilterDescriptor, FilterKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (FakeNetwork, EventBus, TransportHandle) {
        let network = FakeNetwork::new();
        let bus = EventBus::new();
        let client = TransportClient::new(
            "ws://device:3001",
            Box::new(network.connector()),
            Box::new(ManualScheduler::new()),
        );
        let handle = TransportHandle::new(client, bus.clone());
        (network, bus, handle)
    }

    #[test]
    fn test_bus_requests_are_sent() {
        let (network, bus, handle) = setup();
        let _bridge = handle.attach();
        network.open(0);

        bus.publish(Event::SetGain {
            channel: ChannelRef::input(1),
            gain_db: -6.0,
        });
        bus.publish(Event::SetFilter {
            key: FilterKey::new(ChannelRef::output(2), 5),
            filter: FilterDescriptor::default(),
        });

        let sent = network.sent(0);
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("\"set_gain\""));
        assert!(sent[1].contains("\"set_filter\""));
    }

    #[test]
    fn test_address_and_state_queries() {
        let (_network, bus, handle) = setup();
        let _bridge = handle.attach();

        let seen = Arc::new(Mutex::new(Vec::new()));
        for topic in [Topic::NotifyWsAddress, Topic::NotifyWsState] {
            let seen = seen.clone();
            bus.subscribe(topic, move |event| seen.lock().push(event.clone()));
        }

        bus.publish(Event::SetWsAddress("ws://10.0.0.5:3001".to_string()));
        bus.publish(Event::GetWsAddress);
        bus.publish(Event::GetWsState);

        assert_eq!(
            *seen.lock(),
            vec![
                Event::NotifyWsAddress("ws://10.0.0.5:3001".to_string()),
                Event::NotifyWsState(ConnectionState::Disconnected),
            ]
        );
    }

    #[test]
    fn test_reentrant_publish_from_state_subscriber() {
        let (network, bus, handle) = setup();
        let _bridge = handle.attach();
        network.open(0);

        // Asks for the meter on every state change; must not deadlock.
        let count = Arc::new(AtomicUsize::new(0));
        let inner_bus = bus.clone();
        let inner_count = count.clone();
        bus.subscribe(Topic::WsStateChanged, move |event| {
            if let Event::WsStateChanged(ConnectionState::Connected) = event {
                if inner_count.fetch_add(1, Ordering::SeqCst) == 0 {
                    inner_bus.publish(Event::GetMeter(mixlink_ipc::ChannelType::Input));
                }
            }
        });

        handle.tick();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(network.sent(0).len(), 1);
        assert!(network.sent(0)[0].contains("get_meter"));
    }

    #[test]
    fn test_detach_stops_forwarding() {
        let (network, bus, handle) = setup();
        let bridge = handle.attach();
        network.open(0);
        bridge.detach();

        bus.publish(Event::GetGain(ChannelRef::input(1)));
        assert!(network.sent(0).is_empty());
        assert_eq!(bus.subscriber_count(Topic::GetGain), 0);
    }
}

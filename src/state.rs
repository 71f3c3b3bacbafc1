// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Local mirror of the processor's reported state.

use crate::event_bus::{EventBus, SubscriptionId};
use crate::message::{Event, Topic};
use mixlink_ipc::{ChannelRef, ChannelType, ConnectionState, MixerEdge};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Topics the mirror listens to.
const MIRRORED_TOPICS: [Topic; 7] = [
    Topic::NotifyGain,
    Topic::NotifyMute,
    Topic::NotifyMixer,
    Topic::NotifyMeter,
    Topic::NotifyWsAddress,
    Topic::NotifyWsState,
    Topic::WsStateChanged,
];

/// Latest known values. Entries appear once the processor reports them.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub gains: HashMap<ChannelRef, f64>,
    pub mutes: HashMap<ChannelRef, bool>,
    pub routes: HashMap<MixerEdge, bool>,
    /// Meter readings in dB per strip, strip 1 first.
    pub meters: HashMap<ChannelType, Vec<f64>>,
    pub connection: ConnectionState,
    pub address: Option<String>,
}

impl DeviceState {
    /// Folds one notification into the mirror. Returns whether it applied.
    pub fn apply(&mut self, event: &Event) -> bool {
        match event {
            Event::NotifyGain { channel, gain_db } => {
                self.gains.insert(*channel, *gain_db);
            }
            Event::NotifyMute { channel, mute } => {
                self.mutes.insert(*channel, *mute);
            }
            Event::NotifyMixer { edge, mix } => {
                self.routes.insert(*edge, *mix);
            }
            Event::NotifyMeter {
                channel_type,
                amplitudes_db,
            } => {
                self.meters.insert(*channel_type, amplitudes_db.clone());
            }
            Event::NotifyWsAddress(address) => {
                self.address = Some(address.clone());
            }
            Event::NotifyWsState(state) | Event::WsStateChanged(state) => {
                if *state != self.connection {
                    debug!("Connection state: {} -> {}", self.connection, state);
                }
                self.connection = *state;
            }
            _ => return false,
        }
        true
    }

    pub fn gain(&self, channel: ChannelRef) -> Option<f64> {
        self.gains.get(&channel).copied()
    }

    pub fn is_muted(&self, channel: ChannelRef) -> Option<bool> {
        self.mutes.get(&channel).copied()
    }

    pub fn is_routed(&self, edge: MixerEdge) -> Option<bool> {
        self.routes.get(&edge).copied()
    }

    /// Outputs `input_channel` currently feeds, ascending.
    pub fn routes_from(&self, input_channel: u8) -> Vec<u8> {
        let mut outputs: Vec<u8> = self
            .routes
            .iter()
            .filter(|(edge, mix)| edge.input_channel == input_channel && **mix)
            .map(|(edge, _)| edge.output_channel)
            .collect();
        outputs.sort_unstable();
        outputs
    }
}

/// Keeps a shared [`DeviceState`] updated from the bus until dropped.
pub struct StateMirror {
    state: Arc<RwLock<DeviceState>>,
    bus: EventBus,
    subscriptions: Vec<(Topic, SubscriptionId)>,
}

impl StateMirror {
    pub fn attach(bus: &EventBus) -> Self {
        let state = Arc::new(RwLock::new(DeviceState::default()));
        let subscriptions = MIRRORED_TOPICS
            .iter()
            .map(|&topic| {
                let state = state.clone();
                let id = bus.subscribe(topic, move |event| {
                    trace!("Mirroring {}", event.topic().name());
                    state.write().apply(event);
                });
                (topic, id)
            })
            .collect();

        Self {
            state,
            bus: bus.clone(),
            subscriptions,
        }
    }

    pub fn snapshot(&self) -> DeviceState {
        self.state.read().clone()
    }
}

impl Drop for StateMirror {
    fn drop(&mut self) {
        for (topic, id) in self.subscriptions.drain(..) {
            self.bus.unsubscribe(topic, id);
        }
    }
}

/// Asks the processor for every gain, mute and routing value, plus the
/// transport's own address and state.
pub fn request_snapshot(bus: &EventBus) {
    let mut requests = 0;
    for channel in ChannelRef::all() {
        bus.publish(Event::GetGain(channel));
        bus.publish(Event::GetMute(channel));
        requests += 2;
    }
    for edge in MixerEdge::all() {
        bus.publish(Event::GetMixer(edge));
        requests += 1;
    }
    bus.publish(Event::GetWsAddress);
    bus.publish(Event::GetWsState);
    debug!("Requested device snapshot ({} queries)", requests);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_apply_notifications() {
        let mut state = DeviceState::default();
        assert!(state.apply(&Event::NotifyGain {
            channel: ChannelRef::input(1),
            gain_db: -6.0
        }));
        assert!(state.apply(&Event::NotifyMute {
            channel: ChannelRef::output(8),
            mute: true
        }));
        state.apply(&Event::NotifyMixer {
            edge: MixerEdge::new(1, 3),
            mix: true,
        });
        state.apply(&Event::NotifyMixer {
            edge: MixerEdge::new(1, 2),
            mix: true,
        });
        state.apply(&Event::NotifyMixer {
            edge: MixerEdge::new(1, 4),
            mix: false,
        });

        assert_eq!(state.gain(ChannelRef::input(1)), Some(-6.0));
        assert_eq!(state.gain(ChannelRef::input(2)), None);
        assert_eq!(state.is_muted(ChannelRef::output(8)), Some(true));
        assert_eq!(state.routes_from(1), vec![2, 3]);
        assert_eq!(state.is_routed(MixerEdge::new(1, 4)), Some(false));

        assert!(!state.apply(&Event::GetWsState));
    }

    #[test]
    fn test_connection_tracks_both_state_topics() {
        let mut state = DeviceState::default();
        state.apply(&Event::WsStateChanged(ConnectionState::Connected));
        assert_eq!(state.connection, ConnectionState::Connected);
        state.apply(&Event::NotifyWsState(ConnectionState::Disconnected));
        assert_eq!(state.connection, ConnectionState::Disconnected);
    }

    #[test]
    fn test_mirror_follows_bus_until_dropped() {
        let bus = EventBus::new();
        let mirror = StateMirror::attach(&bus);

        bus.publish(Event::NotifyMeter {
            channel_type: ChannelType::Input,
            amplitudes_db: vec![-60.0; 8],
        });
        bus.publish(Event::NotifyWsAddress("ws://10.1.1.1:3001".to_string()));

        let snapshot = mirror.snapshot();
        assert_eq!(snapshot.meters[&ChannelType::Input].len(), 8);
        assert_eq!(snapshot.address.as_deref(), Some("ws://10.1.1.1:3001"));

        drop(mirror);
        for topic in MIRRORED_TOPICS {
            assert_eq!(bus.subscriber_count(topic), 0);
        }
    }

    #[test]
    fn test_request_snapshot_covers_every_channel_and_edge() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(HashMap::<Topic, usize>::new()));
        for topic in [
            Topic::GetGain,
            Topic::GetMute,
            Topic::GetMixer,
            Topic::GetWsAddress,
            Topic::GetWsState,
        ] {
            let count = count.clone();
            bus.subscribe(topic, move |event| {
                *count.lock().entry(event.topic()).or_default() += 1;
            });
        }

        request_snapshot(&bus);
        let count = count.lock();
        assert_eq!(count[&Topic::GetGain], 16);
        assert_eq!(count[&Topic::GetMute], 16);
        assert_eq!(count[&Topic::GetMixer], 64);
        assert_eq!(count[&Topic::GetWsAddress], 1);
        assert_eq!(count[&Topic::GetWsState], 1);
    }
}

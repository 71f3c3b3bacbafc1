// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An equalizer view attached to the bus for one channel.

use super::engine::{FrequencyResponseEngine, HandlePosition, ResponseCurve, ResponseSettings};
use crate::event_bus::{EventBus, SubscriptionId};
use crate::message::{Event, Topic};
use mixlink_ipc::{ChannelRef, FilterDescriptor, FilterKey, FILTER_COUNT};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keeps one channel's filter bank in sync with the processor and turns
/// drags into `set_filter` requests.
///
/// Opening the view asks for all 16 bands; dropping it unsubscribes.
pub struct EqualizerView {
    channel: ChannelRef,
    bus: EventBus,
    engine: Arc<RwLock<FrequencyResponseEngine>>,
    subscription: SubscriptionId,
}

impl EqualizerView {
    pub fn open(bus: &EventBus, channel: ChannelRef, settings: ResponseSettings) -> Self {
        let engine = Arc::new(RwLock::new(FrequencyResponseEngine::new(settings)));

        let sink = engine.clone();
        let subscription = bus.subscribe(Topic::NotifyFilter, move |event| {
            if let Event::NotifyFilter { key, filter } = event {
                if key.channel == channel {
                    sink.write().apply_notification(*key, *filter);
                }
            }
        });

        debug!("Opened equalizer for {}", channel);
        for filter_id in 1..=FILTER_COUNT {
            bus.publish(Event::GetFilter(FilterKey::new(channel, filter_id)));
        }

        Self {
            channel,
            bus: bus.clone(),
            engine,
            subscription,
        }
    }

    pub fn channel(&self) -> ChannelRef {
        self.channel
    }

    pub fn curve(&self) -> ResponseCurve {
        self.engine.read().response_curve(self.channel)
    }

    pub fn handles(&self) -> Vec<HandlePosition> {
        self.engine.read().handles(self.channel)
    }

    pub fn filter(&self, filter_id: u8) -> Option<FilterDescriptor> {
        self.engine
            .read()
            .filter(FilterKey::new(self.channel, filter_id))
            .copied()
    }

    /// Requests the parameters under the pointer for `filter_id`.
    ///
    /// Returns the requested descriptor, or `None` when the band has not
    /// been reported yet.
    pub fn drag(&self, filter_id: u8, x: f64, y: f64) -> Option<FilterDescriptor> {
        let key = FilterKey::new(self.channel, filter_id);
        let edited = self.engine.read().drag_edit(key, x, y);
        match edited {
            Some(filter) => {
                self.bus.publish(Event::SetFilter { key, filter });
                Some(filter)
            }
            None => {
                warn!("Drag on unknown band {}", key);
                None
            }
        }
    }

    /// Requests an arbitrary change to one band, e.g. toggling it or
    /// switching its type.
    pub fn edit(&self, filter_id: u8, update: impl FnOnce(&mut FilterDescriptor)) -> Option<FilterDescriptor> {
        let key = FilterKey::new(self.channel, filter_id);
        let mut filter = self.engine.read().filter(key).copied()?;
        update(&mut filter);
        self.bus.publish(Event::SetFilter { key, filter });
        Some(filter)
    }
}

impl Drop for EqualizerView {
    fn drop(&mut self) {
        self.bus.unsubscribe(Topic::NotifyFilter, self.subscription);
        debug!("Closed equalizer for {}", self.channel);
    }
}

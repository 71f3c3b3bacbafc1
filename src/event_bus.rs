// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! In-process publish/subscribe hub.
//!
//! Delivery is synchronous: `publish` calls every subscriber of the event's
//! topic, in subscription order, before it returns. The subscriber list is
//! snapshotted before delivery starts, so callbacks may publish, subscribe
//! or unsubscribe freely. A panicking subscriber is logged and skipped.

use crate::message::{Event, Topic};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, trace};

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Identity of one registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    topics: HashMap<Topic, Vec<(SubscriptionId, Callback)>>,
}

/// Cloneable handle to a shared bus. Clones publish to the same subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Subscribers>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `topic`. Registering the same closure twice
    /// yields two independent subscriptions.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner
            .topics
            .entry(topic)
            .or_default()
            .push((id, Arc::new(callback)));
        trace!("Subscribed {:?} to {}", id, topic.name());
        id
    }

    /// Removes one subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) {
        let mut inner = self.inner.lock();
        if let Some(subscribers) = inner.topics.get_mut(&topic) {
            subscribers.retain(|(sub_id, _)| *sub_id != id);
            if subscribers.is_empty() {
                inner.topics.remove(&topic);
            }
        }
    }

    /// Delivers `event` to every current subscriber of its topic.
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        let snapshot: Vec<Callback> = {
            let inner = self.inner.lock();
            match inner.topics.get(&topic) {
                Some(subscribers) => subscribers.iter().map(|(_, cb)| cb.clone()).collect(),
                None => return,
            }
        };

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                error!("Subscriber to {} panicked; continuing delivery", topic.name());
            }
        }
    }

    /// Drops all subscribers of `topic`, or of every topic when `None`.
    pub fn clear(&self, topic: Option<Topic>) {
        let mut inner = self.inner.lock();
        match topic {
            Some(topic) => {
                inner.topics.remove(&topic);
            }
            None => inner.topics.clear(),
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner
            .lock()
            .topics
            .get(&topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixlink_ipc::{ChannelRef, ConnectionState};

    fn recorder(bus: &EventBus, topic: Topic, label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> SubscriptionId {
        let log = log.clone();
        bus.subscribe(topic, move |_| log.lock().push(label.to_string()))
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, Topic::GetWsState, "a", &log);
        recorder(&bus, Topic::GetWsState, "b", &log);
        recorder(&bus, Topic::GetWsAddress, "other", &log);

        bus.publish(Event::GetWsState);
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[test]
    fn test_payload_is_delivered() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        bus.subscribe(Topic::NotifyGain, move |event| {
            if let Event::NotifyGain { gain_db, .. } = event {
                *sink.lock() = Some(*gain_db);
            }
        });

        bus.publish(Event::NotifyGain {
            channel: ChannelRef::input(2),
            gain_db: -12.0,
        });
        assert_eq!(*seen.lock(), Some(-12.0));
    }

    #[test]
    fn test_unsubscribe_by_identity() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = recorder(&bus, Topic::GetWsState, "a", &log);
        recorder(&bus, Topic::GetWsState, "b", &log);

        bus.unsubscribe(Topic::GetWsState, first);
        bus.unsubscribe(Topic::GetWsState, first);
        bus.publish(Event::GetWsState);
        assert_eq!(*log.lock(), vec!["b"]);
    }

    #[test]
    fn test_duplicate_registration_fires_twice() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        for _ in 0..2 {
            let count = count.clone();
            bus.subscribe(Topic::GetWsAddress, move |_| *count.lock() += 1);
        }
        bus.publish(Event::GetWsAddress);
        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn test_clear_one_topic_or_all() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, Topic::GetWsState, "state", &log);
        recorder(&bus, Topic::GetWsAddress, "address", &log);

        bus.clear(Some(Topic::GetWsState));
        assert_eq!(bus.subscriber_count(Topic::GetWsState), 0);
        assert_eq!(bus.subscriber_count(Topic::GetWsAddress), 1);

        bus.clear(None);
        bus.publish(Event::GetWsAddress);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Topic::GetWsState, |_| panic!("subscriber failure"));
        recorder(&bus, Topic::GetWsState, "after", &log);

        bus.publish(Event::GetWsState);
        assert_eq!(*log.lock(), vec!["after"]);
    }

    #[test]
    fn test_reentrant_publish() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        let inner_log = log.clone();
        bus.subscribe(Topic::GetWsState, move |_| {
            inner_log.lock().push("outer".to_string());
            inner_bus.publish(Event::NotifyWsState(ConnectionState::Connected));
        });
        recorder(&bus, Topic::NotifyWsState, "inner", &log);

        bus.publish(Event::GetWsState);
        assert_eq!(*log.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_subscribing_during_publish_uses_snapshot() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));

        let inner_bus = bus.clone();
        let inner_count = count.clone();
        bus.subscribe(Topic::GetWsState, move |_| {
            let count = inner_count.clone();
            inner_bus.subscribe(Topic::GetWsState, move |_| *count.lock() += 1);
        });

        bus.publish(Event::GetWsState);
        assert_eq!(*count.lock(), 0);
        bus.publish(Event::GetWsState);
        assert_eq!(*count.lock(), 1);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tick scheduling for the transport.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Period of the flush/reconnect tick. Retries never back off.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Arms and disarms the transport tick.
///
/// The transport disarms the tick while one is running and re-arms it when
/// done, so the next tick is always a full period after the last one ended.
pub trait Scheduler: Send {
    fn arm(&mut self, period: Duration);
    fn disarm(&mut self);
    fn is_armed(&self) -> bool;
}

#[derive(Default)]
struct TimerShared {
    deadline: Mutex<Option<Instant>>,
    changed: Notify,
}

/// Tokio-backed scheduler. The transport driver sleeps until [`deadline`].
///
/// [`deadline`]: TimerHandle::deadline
#[derive(Clone, Default)]
pub struct TimerHandle {
    shared: Arc<TimerShared>,
}

impl TimerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// When the next tick is due, `None` while disarmed.
    pub fn deadline(&self) -> Option<Instant> {
        *self.shared.deadline.lock()
    }

    /// Resolves after the deadline has been moved.
    pub async fn changed(&self) {
        self.shared.changed.notified().await
    }
}

impl Scheduler for TimerHandle {
    fn arm(&mut self, period: Duration) {
        *self.shared.deadline.lock() = Some(Instant::now() + period);
        self.shared.changed.notify_one();
    }

    fn disarm(&mut self) {
        *self.shared.deadline.lock() = None;
        self.shared.changed.notify_one();
    }

    fn is_armed(&self) -> bool {
        self.shared.deadline.lock().is_some()
    }
}

//! Handler bookkeeping
//!
//! Three ordered collections per channel. Firing always visits them in the
//! same order: persistent, one-time, catch-all.

use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Handler bound to one event name
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handler receiving every event on a channel as `(channel, event, data)`
pub type CatchAllHandler = Arc<dyn Fn(&str, &str, &Value) + Send + Sync>;

#[derive(Default)]
pub(crate) struct HandlerSet {
    persistent: Vec<(String, EventHandler)>,
    one_time: Vec<(String, EventHandler)>,
    catch_all: Vec<CatchAllHandler>,
}

impl HandlerSet {
    /// Append a persistent handler, dropping earlier ones for `event` if `replace`
    pub fn add(&mut self, event: String, handler: EventHandler, replace: bool) {
        if replace {
            self.persistent.retain(|(bound, _)| *bound != event);
        }
        self.persistent.push((event, handler));
    }

    pub fn add_once(&mut self, event: String, handler: EventHandler) {
        self.one_time.push((event, handler));
    }

    /// Remove persistent handlers for the given events, or all of them
    pub fn remove(&mut self, events: &[&str]) {
        if events.is_empty() {
            self.persistent.clear();
        } else {
            self.persistent
                .retain(|(bound, _)| !events.contains(&bound.as_str()));
        }
    }

    pub fn add_catch_all(&mut self, handler: CatchAllHandler) {
        self.catch_all.push(handler);
    }

    pub fn clear_catch_all(&mut self) {
        self.catch_all.clear();
    }

    /// Total number of bound handlers
    pub fn len(&self) -> usize {
        self.persistent.len() + self.one_time.len() + self.catch_all.len()
    }

    /// Snapshot the handlers matching `event`
    ///
    /// Matching one-time handlers leave the set here, so they are gone
    /// whatever happens while the plan runs.
    pub fn plan(&mut self, event: &str) -> FiringPlan {
        let persistent = self
            .persistent
            .iter()
            .filter(|(bound, _)| bound == event)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let mut one_time = Vec::new();
        self.one_time.retain(|(bound, handler)| {
            if bound == event {
                one_time.push(Arc::clone(handler));
                false
            } else {
                true
            }
        });

        FiringPlan {
            persistent,
            one_time,
            catch_all: self.catch_all.clone(),
        }
    }
}

/// Handlers selected for one event, fired without holding any lock
pub(crate) struct FiringPlan {
    persistent: Vec<EventHandler>,
    one_time: Vec<EventHandler>,
    catch_all: Vec<CatchAllHandler>,
}

impl FiringPlan {
    pub fn is_empty(&self) -> bool {
        self.persistent.is_empty() && self.one_time.is_empty() && self.catch_all.is_empty()
    }

    /// Run every handler in order. Returns whether any handler ran.
    pub fn fire(self, channel: &str, event: &str, data: &Value) -> bool {
        if self.is_empty() {
            return false;
        }

        for handler in self.persistent.iter().chain(self.one_time.iter()) {
            guarded(channel, event, || handler(data));
        }
        for handler in &self.catch_all {
            guarded(channel, event, || handler(channel, event, data));
        }

        true
    }
}

// A panicking handler must not take the event pump down with it
fn guarded(channel: &str, event: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(channel = %channel, event = %event, "Event handler panicked");
    }
}

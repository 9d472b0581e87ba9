//! Channel registry
//!
//! Channels of one connection by name, backed by `DashMap`.

use super::Channel;
use dashmap::DashMap;

#[derive(Default)]
pub(crate) struct ChannelRegistry {
    channels: DashMap<String, Channel>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Channel> {
        self.channels.get(name).map(|entry| entry.value().clone())
    }

    /// Get the channel registered under `name`, creating it if needed
    ///
    /// The flag is true when the channel was created by this call.
    pub fn get_or_insert_with(&self, name: &str, create: impl FnOnce() -> Channel) -> (Channel, bool) {
        if let Some(existing) = self.get(name) {
            return (existing, false);
        }

        let mut created = false;
        let channel = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| {
                created = true;
                create()
            })
            .value()
            .clone();

        (channel, created)
    }

    /// Clone out every registered channel
    pub fn snapshot(&self) -> Vec<Channel> {
        self.channels
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Remove and return every registered channel
    pub fn drain(&self) -> Vec<Channel> {
        let names: Vec<String> = self.channels.iter().map(|entry| entry.key().clone()).collect();
        names
            .into_iter()
            .filter_map(|name| self.channels.remove(&name).map(|(_, channel)| channel))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

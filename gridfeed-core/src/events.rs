//! Synchronous publish/subscribe dispatch.
//!
//! An [`EventManager`] keeps an ordered list of subscribers per named channel.
//! Publishing walks that list on the caller's thread. There is no queue and no
//! isolation: the first subscriber that fails stops the walk and its error is
//! returned to the publisher, so later subscribers are not notified.

use crate::domain::Record;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Channel every source adapter publishes its records on.
pub const DATA_EMIT: &str = "dataEmit";

/// Error type subscribers report back through [`EventManager::publish`].
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Receiver of published record batches (CSV sink, test recorders, ...).
pub trait Subscriber: Send + Sync {
    fn update(&self, records: &[Record]) -> Result<(), SubscriberError>;
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("subscriber #{position} on channel '{channel}' failed: {source}")]
    Subscriber {
        channel: String,
        position: usize,
        #[source]
        source: SubscriberError,
    },
}

/// Registry of channels and their subscribers.
#[derive(Default)]
pub struct EventManager {
    channels: HashMap<String, Vec<Arc<dyn Subscriber>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `subscriber` to `channel`. Registering the same subscriber twice
    /// means it is notified twice.
    pub fn subscribe(&mut self, channel: &str, subscriber: Arc<dyn Subscriber>) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push(subscriber);
    }

    /// Remove the first registration of `subscriber` from `channel`.
    ///
    /// Returns `false` when the channel or the subscriber is not registered.
    pub fn unsubscribe(&mut self, channel: &str, subscriber: &Arc<dyn Subscriber>) -> bool {
        let Some(list) = self.channels.get_mut(channel) else {
            return false;
        };
        match list.iter().position(|s| same_subscriber(s, subscriber)) {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Notify every subscriber on `channel`, in registration order.
    pub fn publish(&self, channel: &str, records: &[Record]) -> Result<(), EventError> {
        let Some(list) = self.channels.get(channel) else {
            tracing::debug!(channel, "publish on channel with no subscribers");
            return Ok(());
        };

        for (position, subscriber) in list.iter().enumerate() {
            tracing::debug!(channel, position, records = records.len(), "notifying subscriber");
            subscriber
                .update(records)
                .map_err(|source| EventError::Subscriber {
                    channel: channel.to_string(),
                    position,
                    source,
                })?;
        }
        Ok(())
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, Vec::len)
    }

    /// Names of channels that currently have at least one subscriber.
    pub fn channels(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .channels
            .iter()
            .filter(|(_, subs)| !subs.is_empty())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .channels
            .iter()
            .map(|(name, subs)| (name.as_str(), subs.len()))
            .collect();
        f.debug_struct("EventManager").field("channels", &counts).finish()
    }
}

// Compare data pointers only; vtable pointers for the same object may differ
// across codegen units.
fn same_subscriber(a: &Arc<dyn Subscriber>, b: &Arc<dyn Subscriber>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

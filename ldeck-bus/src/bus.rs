/// Publish/subscribe emulated over the key-value store.
///
/// There is no broker and no blocking subscription: consumers poll. A
/// publish performs two writes — a uniquely-keyed marker with a short TTL
/// for aggressive pollers, and a push onto a bounded per-channel log for
/// late arrivals. Delivery is at-least-once within the retention window;
/// once the TTLs lapse the message is gone. Order is preserved within one
/// channel's log only.
///
/// Publish failures are logged and swallowed. A mutation must never fail
/// because its change notification could not be written.

use crate::kv::KvStore;
use ldeck_core::config::BusConfig;
use ldeck_core::{Envelope, Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Channel carrying structural updates to a list (items added, edited,
/// reordered, swept).
pub fn channel_update(list_id: &str) -> String {
    format!("list:{}:update", list_id)
}

/// Channel carrying activity events on a list (clicks, sweep summaries).
pub fn channel_activity(list_id: &str) -> String {
    format!("list:{}:activity", list_id)
}

pub struct EventBus {
    store: Option<Arc<dyn KvStore>>,
    config: BusConfig,
}

impl EventBus {
    pub fn new(store: Arc<dyn KvStore>, config: BusConfig) -> Self {
        Self {
            store: Some(store),
            config,
        }
    }

    /// A bus without a backing store; every publish is a no-op.
    pub fn disabled() -> Self {
        Self {
            store: None,
            config: BusConfig::default(),
        }
    }

    /// Publish an envelope to a channel. Never fails the caller.
    pub fn publish(&self, channel: &str, envelope: &Envelope) {
        let Some(store) = &self.store else {
            warn!(channel, "event bus has no backing store, dropping publish");
            return;
        };
        if let Err(e) = self.publish_inner(store.as_ref(), channel, envelope) {
            warn!(channel, error = %e, "event publish failed, continuing");
        }
    }

    fn publish_inner(&self, store: &dyn KvStore, channel: &str, envelope: &Envelope) -> Result<()> {
        let payload = serde_json::to_string(envelope)?;

        // Write 1: uniquely-keyed "just happened" marker with a short TTL.
        let marker_key = format!("{}:{}", channel, Uuid::new_v4());
        store
            .set_with_expiry(&marker_key, &payload, self.config.message_ttl)
            .map_err(|e| Error::PublishFailure(format!("marker write: {}", e)))?;

        // Write 2: bounded, time-boxed per-channel log for slower pollers.
        let log_key = log_key(channel);
        store
            .list_push(&log_key, &payload)
            .map_err(|e| Error::PublishFailure(format!("log push: {}", e)))?;
        store
            .list_trim(&log_key, 0, self.config.log_cap as i64 - 1)
            .map_err(|e| Error::PublishFailure(format!("log trim: {}", e)))?;
        store
            .expire(&log_key, self.config.log_ttl)
            .map_err(|e| Error::PublishFailure(format!("log expire: {}", e)))?;

        debug!(channel, action = %envelope.action, "published event");
        Ok(())
    }

    /// Read the most recent messages on a channel, newest first.
    ///
    /// Reads only the bounded log; entries that fail to parse are skipped.
    pub fn fetch_recent(&self, channel: &str, limit: usize) -> Vec<Envelope> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        let stop = limit.min(self.config.log_cap) as i64 - 1;
        if stop < 0 {
            return Vec::new();
        }
        let raw = match store.list_range(&log_key(channel), 0, stop) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(channel, error = %e, "fetch_recent read failed");
                return Vec::new();
            }
        };
        raw.iter()
            .filter_map(|entry| match serde_json::from_str::<Envelope>(entry) {
                Ok(env) => Some(env),
                Err(e) => {
                    warn!(channel, error = %e, "skipping unparseable log entry");
                    None
                }
            })
            .collect()
    }
}

fn log_key(channel: &str) -> String {
    format!("log:{}", channel)
}

//! Persistent subscription settings.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a persistent subscription starts reading its stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartFrom {
    #[default]
    Start,
    Revision(u64),
}

/// How events are distributed to the consumers of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerStrategy {
    DispatchToSingle,
    #[default]
    RoundRobin,
    Pinned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberLimit {
    #[default]
    Unlimited,
    Limited(u32),
}

/// Settings for a persistent subscription group.
///
/// Missing fields in a serialized form take their defaults, so a partial
/// document is a set of overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentSubscriptionSettings {
    /// Deliver the events links point to.
    /// Default: false
    pub resolve_link_tos: bool,

    /// Default: start of the stream.
    pub from_revision: StartFrom,

    /// Track in-depth latency statistics.
    /// Default: false
    pub extra_stats: bool,

    /// After this long an unacknowledged message is retried.
    /// Default: 30s
    #[serde(with = "millis")]
    pub message_timeout: Duration,

    /// Retries before a message is parked.
    /// Default: 10
    pub max_retry_count: u32,

    /// Default: 2s
    #[serde(with = "millis")]
    pub checkpoint_after: Duration,

    /// Default: 10
    pub min_checkpoint_count: u32,

    /// Reaching this many messages forces a checkpoint.
    /// Default: 1000
    pub max_checkpoint_count: u32,

    pub max_subscriber_count: SubscriberLimit,

    /// Buffer for live messages.
    /// Default: 500
    pub live_buffer_size: u32,

    /// Events read per page of history.
    /// Default: 20
    pub read_batch_size: u32,

    /// Events cached while paging history.
    /// Default: 500
    pub history_buffer_size: u32,

    pub strategy: ConsumerStrategy,
}

impl Default for PersistentSubscriptionSettings {
    fn default() -> Self {
        Self {
            resolve_link_tos: false,
            from_revision: StartFrom::Start,
            extra_stats: false,
            message_timeout: Duration::from_secs(30),
            max_retry_count: 10,
            checkpoint_after: Duration::from_secs(2),
            min_checkpoint_count: 10,
            max_checkpoint_count: 1_000,
            max_subscriber_count: SubscriberLimit::Unlimited,
            live_buffer_size: 500,
            read_batch_size: 20,
            history_buffer_size: 500,
            strategy: ConsumerStrategy::RoundRobin,
        }
    }
}

impl PersistentSubscriptionSettings {
    /// Parse JSON overrides on top of the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_checkpoint_count > self.max_checkpoint_count {
            return Err(ClientError::InvalidSettings(format!(
                "min_checkpoint_count {} exceeds max_checkpoint_count {}",
                self.min_checkpoint_count, self.max_checkpoint_count
            )));
        }
        if self.read_batch_size == 0 {
            return Err(ClientError::InvalidSettings(
                "read_batch_size must be positive".into(),
            ));
        }
        if self.history_buffer_size < self.read_batch_size {
            return Err(ClientError::InvalidSettings(format!(
                "history_buffer_size {} is smaller than read_batch_size {}",
                self.history_buffer_size, self.read_batch_size
            )));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

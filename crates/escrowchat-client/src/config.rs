//! Messenger configuration.

use serde::{Deserialize, Serialize};

/// Default number of out-of-order envelopes buffered per peer
pub const DEFAULT_REORDER_CAPACITY: usize = 1000;

/// Default distance ahead of the watermark a sequence number may be
pub const DEFAULT_MAX_SEQUENCE_GAP: u64 = 1000;

/// How a receiver treats the first message from a peer it has never talked
/// to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstContactPolicy {
    /// Derive the receive chain from the certified peer identity and the
    /// sender ephemeral key in the header. The chain is committed only after
    /// the first in-order message authenticates.
    #[default]
    Authenticated,

    /// Reject messages from peers this client has not sent to yet.
    RequireSession,
}

/// Tunables for a [`Messenger`](crate::Messenger).
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Maximum buffered out-of-order envelopes per peer
    pub reorder_capacity: usize,
    /// Largest accepted `sequence_number - last_received_seq`
    pub max_sequence_gap: u64,
    /// First-contact behavior
    pub first_contact: FirstContactPolicy,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            reorder_capacity: DEFAULT_REORDER_CAPACITY,
            max_sequence_gap: DEFAULT_MAX_SEQUENCE_GAP,
            first_contact: FirstContactPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MessengerConfig::default();

        assert_eq!(config.reorder_capacity, 1000);
        assert_eq!(config.max_sequence_gap, 1000);
        assert_eq!(config.first_contact, FirstContactPolicy::Authenticated);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: MessengerConfig =
            serde_json::from_str(r#"{ "first_contact": "require_session" }"#).unwrap();

        assert_eq!(config.first_contact, FirstContactPolicy::RequireSession);
        assert_eq!(config.reorder_capacity, DEFAULT_REORDER_CAPACITY);
    }

    #[test]
    fn unknown_policy_rejected() {
        let result = serde_json::from_str::<MessengerConfig>(r#"{ "first_contact": "trust_all" }"#);
        assert!(result.is_err());
    }
}

//! Bounded buffer for envelopes that arrived ahead of the next expected
//! sequence number.
//!
//! Buffered envelopes are unauthenticated until they are drained in order,
//! so the buffer is capped and re-delivery of a buffered sequence number
//! replaces the earlier copy.

use std::collections::BTreeMap;

use escrowchat_proto::Envelope;

use crate::error::ProtocolError;

/// Out-of-order envelopes for one peer, keyed by sequence number.
///
/// # Invariants
///
/// - At most `capacity` entries
/// - Every key is strictly greater than the session's receive watermark
#[derive(Debug, Clone)]
pub(crate) struct ReorderBuffer {
    entries: BTreeMap<u64, Envelope>,
    capacity: usize,
}

impl ReorderBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { entries: BTreeMap::new(), capacity }
    }

    /// Buffer `envelope` under its sequence number.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::ReorderBufferFull` if the buffer is at capacity and
    ///   the sequence number is not already buffered
    pub(crate) fn insert(&mut self, envelope: Envelope) -> Result<(), ProtocolError> {
        let sequence_number = envelope.sequence_number();
        if !self.entries.contains_key(&sequence_number) && self.entries.len() >= self.capacity {
            return Err(ProtocolError::ReorderBufferFull { capacity: self.capacity });
        }

        self.entries.insert(sequence_number, envelope);
        Ok(())
    }

    /// Remove and return the envelope for `sequence_number`, if buffered.
    pub(crate) fn take(&mut self, sequence_number: u64) -> Option<Envelope> {
        self.entries.remove(&sequence_number)
    }

    /// Buffered sequence numbers in ascending order.
    pub(crate) fn sequence_numbers(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

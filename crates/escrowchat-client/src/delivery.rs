//! Values returned to the application.

/// One decrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Sequence number from the authenticated header
    pub sequence_number: u64,
    /// Decrypted payload
    pub plaintext: Vec<u8>,
}

/// Result of an in-order receive.
///
/// `message` is the envelope passed to
/// [`Messenger::receive_message`](crate::Messenger::receive_message).
/// `released` holds previously buffered messages that became deliverable
/// because of it, in ascending sequence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The message just received
    pub message: ReceivedMessage,
    /// Buffered messages released after it
    pub released: Vec<ReceivedMessage>,
}

impl Delivery {
    pub(crate) fn new(sequence_number: u64, plaintext: Vec<u8>) -> Self {
        Self { message: ReceivedMessage { sequence_number, plaintext }, released: Vec::new() }
    }

    /// Plaintext of the message just received.
    pub fn plaintext(&self) -> &[u8] {
        &self.message.plaintext
    }

    /// Number of messages delivered, including released ones.
    pub fn message_count(&self) -> usize {
        1 + self.released.len()
    }

    /// All delivered messages in sequence order.
    pub fn into_messages(self) -> Vec<ReceivedMessage> {
        let mut messages = Vec::with_capacity(self.message_count());
        messages.push(self.message);
        messages.extend(self.released);
        messages
    }
}

/// Snapshot of one peer's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Sequence number of the last message sent to the peer
    pub last_sent_seq: u64,
    /// Highest sequence number delivered from the peer
    pub last_received_seq: u64,
    /// Buffered out-of-order sequence numbers, ascending
    pub pending: Vec<u64>,
    /// Send chain derived
    pub send_established: bool,
    /// Receive chain derived and confirmed by an authenticated message
    pub recv_established: bool,
}

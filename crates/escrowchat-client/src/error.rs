//! Error types for the messenger.
//!
//! Certificate failures and messaging failures are kept apart: a rejected
//! certificate never touches session state, while a [`ProtocolError`] is
//! always scoped to one peer.

use escrowchat_crypto::{AuthError, CryptoError};
use escrowchat_proto::WireError;
use thiserror::Error;

/// Errors from certificate issuance and acceptance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// Authority signature does not verify over the certificate bytes
    #[error("certificate signature is invalid")]
    InvalidSignature,

    /// Certificate is structurally invalid
    #[error("malformed certificate: {0}")]
    Wire(#[from] WireError),
}

/// Errors from sending and receiving messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// No accepted certificate for this peer
    #[error("no certificate accepted for peer {peer:?}")]
    UnknownPeer {
        /// Requested peer
        peer: String,
    },

    /// `issue_certificate` has not been called yet
    #[error("identity keypair not initialized")]
    IdentityNotInitialized,

    /// First contact rejected by policy
    #[error("no session with peer {peer:?}")]
    NoSession {
        /// Requested peer
        peer: String,
    },

    /// Sequence number at or below the receive watermark
    #[error("duplicate or replayed message: sequence {sequence_number} <= {watermark}")]
    DuplicateOrReplay {
        /// Sequence number in the header
        sequence_number: u64,
        /// Highest sequence number already delivered
        watermark: u64,
    },

    /// Envelope cannot be buffered
    #[error("reorder buffer full (capacity {capacity})")]
    ReorderBufferFull {
        /// Configured buffer capacity
        capacity: usize,
    },

    /// Outgoing sequence space used up
    #[error("sequence numbers exhausted")]
    SequenceExhausted,

    /// Message failed authentication
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Key agreement or escrow failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ProtocolError {
    /// Returns true if the error concerns one message and the session is
    /// unaffected.
    ///
    /// The caller may drop the offending envelope and keep going. Other
    /// errors mean the peer or the local client is not set up to talk.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateOrReplay { .. } | Self::ReorderBufferFull { .. } | Self::Auth(_)
        )
    }
}

//! Error types for cryptographic operations.

use thiserror::Error;

/// AEAD authentication failure.
///
/// Deliberately carries no detail: a wrong key, a tampered header and a
/// tampered ciphertext are indistinguishable to the receiver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Authentication tag did not verify
    #[error("message failed authentication")]
    Forged,
}

/// Errors from key agreement and escrow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Peer public key is low-order; the DH output would be predictable
    #[error("public key does not contribute to the shared secret")]
    WeakPublicKey,

    /// Provider produced an escrow ciphertext of the wrong length
    #[error("malformed escrow ciphertext: expected {expected} bytes, got {actual}")]
    MalformedEscrow {
        /// Length required by the wire format
        expected: usize,
        /// Length the provider produced
        actual: usize,
    },

    /// Escrow entry did not decrypt under the escrow key
    #[error("escrow entry failed authentication")]
    EscrowRejected,
}
